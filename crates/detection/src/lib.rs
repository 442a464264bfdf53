pub mod bbox;
pub mod decode;
pub mod nms;
pub mod rectify;
pub mod sort;
pub mod tensor;

// Re-export commonly used types for convenience
pub use bbox::BoxInfo;
pub use decode::{Anchor, AnchorDecoder, GridDecoder};
pub use nms::nms_sorted;
pub use rectify::{TransformParams, rectify};
pub use sort::sort_by_score;
pub use tensor::FeatureMap;

/// Sigmoid activation function
#[inline]
pub(crate) fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
