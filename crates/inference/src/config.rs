use detection::Anchor;
use preprocess::Normalization;
use std::env;

pub use common::Environment;

/// Decoding variant for a model's detection heads.
#[derive(Debug, Clone)]
pub enum HeadKind {
    /// Anchor-free grid head with distribution-based box regression.
    Grid { reg_bins: usize },
    /// Anchor-based head; one anchor list per stride.
    Anchored { anchors: Vec<Vec<Anchor>> },
}

/// Model-specific constants, fixed at construction.
///
/// Everything here must match the trained model exactly: there is no
/// runtime negotiation of tensor names, strides, or channel layouts.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub input_name: String,
    /// One output tensor name per stride, same order as `strides`.
    pub output_names: Vec<String>,
    pub strides: Vec<u32>,
    pub num_classes: usize,
    /// Long-side length the input is resized to.
    pub target_size: u32,
    /// Padded input dimensions are multiples of this.
    pub max_stride: u32,
    pub pad_value: u8,
    pub swap_rb: bool,
    pub normalization: Normalization,
    pub head: HeadKind,
    /// Ignore labels during NMS.
    pub agnostic_nms: bool,
}

impl DetectorConfig {
    /// NanoDet-Plus-m 320, as exported for the original mobile app.
    pub fn nanodet_plus() -> Self {
        Self {
            input_name: "in0".to_string(),
            output_names: vec![
                "231".to_string(),
                "228".to_string(),
                "225".to_string(),
                "222".to_string(),
            ],
            strides: vec![8, 16, 32, 64],
            num_classes: 80,
            target_size: 320,
            max_stride: 64,
            pad_value: 0,
            swap_rb: true,
            normalization: Normalization {
                mean: [103.53, 116.28, 123.675],
                scale: [0.017429, 0.017507, 0.017125],
            },
            head: HeadKind::Grid { reg_bins: 8 },
            agnostic_nms: false,
        }
    }

    /// YOLOv5s v6.1 640, anchors from yolov5s.yaml.
    pub fn yolov5s() -> Self {
        Self {
            input_name: "in0".to_string(),
            output_names: vec!["out0".to_string(), "out1".to_string(), "out2".to_string()],
            strides: vec![8, 16, 32],
            num_classes: 80,
            target_size: 640,
            max_stride: 64,
            pad_value: 114,
            swap_rb: false,
            normalization: Normalization {
                mean: [0.0, 0.0, 0.0],
                scale: [1.0 / 255.0, 1.0 / 255.0, 1.0 / 255.0],
            },
            head: HeadKind::Anchored {
                anchors: vec![
                    vec![
                        Anchor { w: 10.0, h: 13.0 },
                        Anchor { w: 16.0, h: 30.0 },
                        Anchor { w: 33.0, h: 23.0 },
                    ],
                    vec![
                        Anchor { w: 30.0, h: 61.0 },
                        Anchor { w: 62.0, h: 45.0 },
                        Anchor { w: 59.0, h: 119.0 },
                    ],
                    vec![
                        Anchor { w: 116.0, h: 90.0 },
                        Anchor { w: 156.0, h: 198.0 },
                        Anchor { w: 373.0, h: 326.0 },
                    ],
                ],
            },
            agnostic_nms: false,
        }
    }

    /// Check internal arity once, instead of trusting it at decode
    /// time.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.strides.is_empty(), "Config needs at least one stride");
        anyhow::ensure!(
            self.output_names.len() == self.strides.len(),
            "Config has {} output names for {} strides",
            self.output_names.len(),
            self.strides.len()
        );
        anyhow::ensure!(self.num_classes > 0, "Config needs at least one class");
        anyhow::ensure!(self.max_stride > 0, "Max stride must be positive");
        anyhow::ensure!(
            self.target_size > 0 && self.target_size % self.max_stride == 0,
            "Target size {} must be a positive multiple of max stride {}",
            self.target_size,
            self.max_stride
        );
        if let Some(&widest) = self.strides.iter().max() {
            anyhow::ensure!(
                widest <= self.max_stride,
                "Stride {} exceeds max stride {}",
                widest,
                self.max_stride
            );
        }

        match &self.head {
            HeadKind::Grid { reg_bins } => {
                anyhow::ensure!(*reg_bins > 0, "Grid head needs at least one regression bin");
            }
            HeadKind::Anchored { anchors } => {
                anyhow::ensure!(
                    anchors.len() == self.strides.len(),
                    "Config has anchor sets for {} strides, expected {}",
                    anchors.len(),
                    self.strides.len()
                );
                for (i, set) in anchors.iter().enumerate() {
                    anyhow::ensure!(
                        !set.is_empty(),
                        "Anchor set for stride {} is empty",
                        self.strides[i]
                    );
                }
            }
        }

        Ok(())
    }
}

/// Which preset a service instance runs.
#[derive(Debug, Clone)]
pub enum ModelFamily {
    NanodetPlus,
    Yolov5s,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub environment: Environment,
    pub model_path: String,
    pub model_family: ModelFamily,
    pub prob_threshold: f32,
    pub nms_threshold: f32,
}

impl ServiceConfig {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> anyhow::Result<Self> {
        let environment = Environment::from_env();

        let model_path =
            env::var("MODEL_PATH").unwrap_or_else(|_| "models/nanodet_plus.onnx".to_string());

        let model_family = match env::var("MODEL_FAMILY")
            .unwrap_or_else(|_| "nanodet".to_string())
            .to_lowercase()
            .as_str()
        {
            "nanodet" | "nanodet-plus" => ModelFamily::NanodetPlus,
            "yolov5" | "yolov5s" => ModelFamily::Yolov5s,
            other => anyhow::bail!("Unknown MODEL_FAMILY '{other}'"),
        };

        let prob_threshold = env::var("PROB_THRESHOLD")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.4);

        let nms_threshold = env::var("NMS_THRESHOLD")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.5);

        Ok(Self {
            environment,
            model_path,
            model_family,
            prob_threshold,
            nms_threshold,
        })
    }

    pub fn detector_config(&self) -> DetectorConfig {
        match self.model_family {
            ModelFamily::NanodetPlus => DetectorConfig::nanodet_plus(),
            ModelFamily::Yolov5s => DetectorConfig::yolov5s(),
        }
    }
}
