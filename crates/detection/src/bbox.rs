/// A candidate or final detection box.
///
/// `x1`/`y1` is the top-left corner in whatever coordinate space was
/// active when the box was created: padded-tensor pixels out of the
/// decoders, original-image pixels after [`crate::rectify`].
#[derive(Debug, Clone, PartialEq)]
pub struct BoxInfo {
    pub x1: f32,
    pub y1: f32,
    pub w: f32,
    pub h: f32,
    /// Class index.
    pub label: usize,
    /// Confidence in [0, 1].
    pub score: f32,
}

impl BoxInfo {
    #[inline]
    pub fn area(&self) -> f32 {
        self.w * self.h
    }
}

/// Axis-aligned overlap area of two boxes, zero when they are disjoint
/// on either axis.
#[inline]
pub fn intersection_area(a: &BoxInfo, b: &BoxInfo) -> f32 {
    if a.x1 > b.x1 + b.w || a.x1 + a.w < b.x1 || a.y1 > b.y1 + b.h || a.y1 + a.h < b.y1 {
        return 0.0;
    }

    let inter_width = (a.x1 + a.w).min(b.x1 + b.w) - a.x1.max(b.x1);
    let inter_height = (a.y1 + a.h).min(b.y1 + b.h) - a.y1.max(b.y1);

    inter_width * inter_height
}

/// Intersection over union.
///
/// Two zero-area boxes divide 0 by 0 and yield NaN; every ordered
/// comparison against a threshold is then false, so degenerate pairs
/// never count as overlapping.
#[inline]
pub fn iou(a: &BoxInfo, b: &BoxInfo) -> f32 {
    let inter = intersection_area(a, b);
    inter / (a.area() + b.area() - inter)
}
