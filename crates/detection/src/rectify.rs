use crate::bbox::BoxInfo;

/// Letterbox geometry needed to map padded-tensor coordinates back to
/// the original image.
#[derive(Debug, Clone)]
pub struct TransformParams {
    /// Resize factor applied before padding.
    pub scale: f32,
    /// Total horizontal padding in padded-tensor pixels.
    pub wpad: u32,
    /// Total vertical padding in padded-tensor pixels.
    pub hpad: u32,
    pub orig_width: u32,
    pub orig_height: u32,
}

/// Map a kept box from padded-tensor pixels back to original-image
/// pixels, clipped to `[0, w-1] x [0, h-1]`.
///
/// The left/top padding is the integer half of the total pad, matching
/// how the letterbox splits it. Width and height are recomputed from
/// the clipped corners and are intentionally not floored at zero: a box
/// that clipping collapses keeps its negative extent, exactly as the
/// unguarded subtraction would produce.
pub fn rectify(bbox: &mut BoxInfo, transform: &TransformParams) {
    let dx = (transform.wpad / 2) as f32;
    let dy = (transform.hpad / 2) as f32;

    let x0 = (bbox.x1 - dx) / transform.scale;
    let y0 = (bbox.y1 - dy) / transform.scale;
    let x1 = (bbox.x1 + bbox.w - dx) / transform.scale;
    let y1 = (bbox.y1 + bbox.h - dy) / transform.scale;

    let max_x = (transform.orig_width - 1) as f32;
    let max_y = (transform.orig_height - 1) as f32;

    let x0 = x0.clamp(0.0, max_x);
    let y0 = y0.clamp(0.0, max_y);
    let x1 = x1.clamp(0.0, max_x);
    let y1 = y1.clamp(0.0, max_y);

    bbox.x1 = x0;
    bbox.y1 = y0;
    bbox.w = x1 - x0;
    bbox.h = y1 - y0;
}
