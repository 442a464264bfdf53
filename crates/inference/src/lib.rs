pub mod backend;
pub mod config;
pub mod detector;
pub mod labels;

// Re-export commonly used types for convenience
pub use backend::InferenceBackend;
pub use config::{DetectorConfig, HeadKind, ModelFamily, ServiceConfig};
pub use detector::Detector;
