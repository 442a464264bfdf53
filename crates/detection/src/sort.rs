use crate::bbox::BoxInfo;

/// Below this many candidates the two partitions recurse sequentially;
/// forking a rayon task costs more than sorting the slice.
const PARALLEL_CUTOFF: usize = 512;

/// Sort candidates by score, highest first.
///
/// Hoare partition around the middle element with strict `>` / `<`
/// scans, so equal scores do not keep their relative order (not
/// stable). The two partitions share no state after the swap pass and
/// are processed as independent rayon tasks when large enough; the
/// fork is a throughput optimization only.
pub fn sort_by_score(boxes: &mut [BoxInfo]) {
    if boxes.is_empty() {
        return;
    }
    qsort_descent(boxes);
}

fn qsort_descent(boxes: &mut [BoxInfo]) {
    if boxes.len() <= 1 {
        return;
    }

    let pivot = boxes[boxes.len() / 2].score;
    let mut i: isize = 0;
    let mut j: isize = boxes.len() as isize - 1;

    while i <= j {
        while boxes[i as usize].score > pivot {
            i += 1;
        }
        while boxes[j as usize].score < pivot {
            j -= 1;
        }
        if i <= j {
            boxes.swap(i as usize, j as usize);
            i += 1;
            j -= 1;
        }
    }

    // Elements at [0, j] are >= pivot, [i, len) are <= pivot.
    let (head, tail) = boxes.split_at_mut(i as usize);
    let left = &mut head[..(j + 1).max(0) as usize];

    if left.len().max(tail.len()) >= PARALLEL_CUTOFF {
        rayon::join(|| qsort_descent(left), || qsort_descent(tail));
    } else {
        qsort_descent(left);
        qsort_descent(tail);
    }
}
