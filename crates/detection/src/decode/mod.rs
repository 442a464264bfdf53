//! Per-head proposal decoding.
//!
//! Both decoders read one raw detection-head tensor at a known stride
//! and append candidate boxes in padded-tensor pixel coordinates.

mod anchor;
mod grid;

pub use anchor::{Anchor, AnchorDecoder};
pub use grid::GridDecoder;
