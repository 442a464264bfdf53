use crate::bbox::{BoxInfo, intersection_area};

/// Greedy non-maximum suppression over a score-descending candidate
/// list.
///
/// Returns the indices of the kept boxes in input order, so the result
/// is a stable filter of an already-sorted list. When `agnostic` is
/// false, candidates with differing labels never suppress each other.
/// Suppression is strict: a candidate is dropped only when its IoU
/// with a kept box exceeds `nms_threshold`. A zero-area pair produces
/// a NaN IoU, which fails that comparison and therefore never
/// suppresses.
pub fn nms_sorted(boxes: &[BoxInfo], nms_threshold: f32, agnostic: bool) -> Vec<usize> {
    let mut picked: Vec<usize> = Vec::new();

    let areas: Vec<f32> = boxes.iter().map(BoxInfo::area).collect();

    for (i, candidate) in boxes.iter().enumerate() {
        let mut keep = true;
        for &j in &picked {
            let kept = &boxes[j];

            if !agnostic && candidate.label != kept.label {
                continue;
            }

            let inter_area = intersection_area(candidate, kept);
            let union_area = areas[i] + areas[j] - inter_area;
            if inter_area / union_area > nms_threshold {
                keep = false;
                break;
            }
        }

        if keep {
            picked.push(i);
        }
    }

    picked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_box(x1: f32, y1: f32, w: f32, h: f32, label: usize, score: f32) -> BoxInfo {
        BoxInfo {
            x1,
            y1,
            w,
            h,
            label,
            score,
        }
    }

    fn select(boxes: &[BoxInfo], picked: &[usize]) -> Vec<BoxInfo> {
        picked.iter().map(|&i| boxes[i].clone()).collect()
    }

    #[test]
    fn empty_input_returns_empty() {
        assert!(nms_sorted(&[], 0.5, false).is_empty());
    }

    #[test]
    fn non_overlapping_boxes_all_kept() {
        let boxes = vec![
            make_box(0.0, 0.0, 10.0, 10.0, 0, 0.9),
            make_box(100.0, 100.0, 10.0, 10.0, 0, 0.8),
            make_box(200.0, 200.0, 10.0, 10.0, 0, 0.7),
        ];
        assert_eq!(nms_sorted(&boxes, 0.5, false), vec![0, 1, 2]);
    }

    #[test]
    fn overlapping_same_class_suppressed() {
        let boxes = vec![
            make_box(0.0, 0.0, 10.0, 10.0, 3, 0.9),
            make_box(1.0, 1.0, 10.0, 10.0, 3, 0.8),
        ];
        assert_eq!(nms_sorted(&boxes, 0.5, false), vec![0]);
    }

    #[test]
    fn class_aware_keeps_cross_class_overlap() {
        // Heavy overlap, different labels
        let boxes = vec![
            make_box(0.0, 0.0, 10.0, 10.0, 0, 0.9),
            make_box(1.0, 1.0, 10.0, 10.0, 1, 0.8),
        ];

        let class_aware = nms_sorted(&boxes, 0.5, false);
        assert_eq!(class_aware, vec![0, 1], "class-aware NMS keeps both");

        let agnostic = nms_sorted(&boxes, 0.5, true);
        assert_eq!(agnostic, vec![0], "class-agnostic NMS keeps the winner");
    }

    #[test]
    fn output_preserves_input_order() {
        let boxes = vec![
            make_box(0.0, 0.0, 10.0, 10.0, 0, 0.9),
            make_box(50.0, 50.0, 10.0, 10.0, 1, 0.8),
            make_box(0.5, 0.5, 10.0, 10.0, 0, 0.7),
            make_box(100.0, 0.0, 10.0, 10.0, 2, 0.6),
        ];
        let picked = nms_sorted(&boxes, 0.5, false);
        assert_eq!(picked, vec![0, 1, 3]);
        for pair in picked.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn idempotent_on_its_own_output() {
        let boxes = vec![
            make_box(0.0, 0.0, 10.0, 10.0, 0, 0.9),
            make_box(2.0, 2.0, 10.0, 10.0, 0, 0.85),
            make_box(5.0, 5.0, 10.0, 10.0, 0, 0.8),
            make_box(40.0, 40.0, 10.0, 10.0, 0, 0.7),
            make_box(41.0, 41.0, 10.0, 10.0, 0, 0.6),
        ];
        let kept = select(&boxes, &nms_sorted(&boxes, 0.5, false));
        let again = select(&kept, &nms_sorted(&kept, 0.5, false));
        assert_eq!(kept, again);
    }

    #[test]
    fn threshold_monotonicity() {
        let boxes = vec![
            make_box(0.0, 0.0, 10.0, 10.0, 0, 0.9),
            make_box(2.0, 2.0, 10.0, 10.0, 0, 0.85),
            make_box(4.0, 4.0, 10.0, 10.0, 0, 0.8),
            make_box(8.0, 8.0, 10.0, 10.0, 0, 0.75),
            make_box(50.0, 50.0, 10.0, 10.0, 0, 0.7),
        ];
        let strict = nms_sorted(&boxes, 0.3, false);
        let loose = nms_sorted(&boxes, 0.7, false);
        for i in &strict {
            assert!(
                loose.contains(i),
                "box {i} kept at t=0.3 but dropped at t=0.7"
            );
        }
    }

    #[test]
    fn zero_area_boxes_never_suppress() {
        let boxes = vec![
            make_box(5.0, 5.0, 0.0, 0.0, 0, 0.9),
            make_box(5.0, 5.0, 0.0, 0.0, 0, 0.8),
        ];
        // 0/0 union gives NaN IoU, which must not count as overlap
        assert_eq!(nms_sorted(&boxes, 0.5, false), vec![0, 1]);
    }
}
