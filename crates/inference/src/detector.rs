use crate::backend::InferenceBackend;
use crate::config::{DetectorConfig, HeadKind};
use common::span;
use detection::{
    AnchorDecoder, BoxInfo, FeatureMap, GridDecoder, TransformParams, nms_sorted, rectify,
    sort_by_score,
};
use preprocess::Preprocessor;

/// Caller-owned detection pipeline: preprocess, run the network, decode
/// each head, suppress duplicates, and map boxes back to original-image
/// coordinates.
///
/// One instance serves one loaded model; it holds no global state and
/// is dropped like any other value.
pub struct Detector<B: InferenceBackend> {
    backend: B,
    config: DetectorConfig,
    preprocessor: Preprocessor,
}

impl<B: InferenceBackend> Detector<B> {
    pub fn new(backend: B, config: DetectorConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let preprocessor = Preprocessor::new(
            config.target_size,
            config.max_stride,
            config.pad_value,
            config.swap_rb,
            config.normalization.clone(),
        );
        Ok(Self {
            backend,
            config,
            preprocessor,
        })
    }

    /// Run one detection request on a tightly-packed RGB image.
    ///
    /// Thresholds are taken as-is; the expected range is [0, 1].
    /// Returns final boxes in original-image pixels, score-descending.
    pub fn detect(
        &mut self,
        rgb: &[u8],
        width: u32,
        height: u32,
        prob_threshold: f32,
        nms_threshold: f32,
    ) -> anyhow::Result<Vec<BoxInfo>> {
        let _s = span!("detect");

        let pre = self.preprocessor.run(rgb, width, height)?;

        let outputs = self
            .backend
            .run(&self.config.input_name, &pre.tensor, &self.config.output_names)?;
        anyhow::ensure!(
            outputs.len() == self.config.output_names.len(),
            "Backend returned {} outputs, expected {}",
            outputs.len(),
            self.config.output_names.len()
        );

        let mut proposals: Vec<BoxInfo> = Vec::new();
        for (idx, output) in outputs.iter().enumerate() {
            let stride = self.config.strides[idx];
            let head = FeatureMap::from_output(output)?;

            match &self.config.head {
                HeadKind::Grid { reg_bins } => {
                    let decoder = GridDecoder {
                        num_classes: self.config.num_classes,
                        reg_bins: *reg_bins,
                    };
                    decoder.decode(&head, stride, prob_threshold, &mut proposals)?;
                }
                HeadKind::Anchored { anchors } => {
                    let decoder = AnchorDecoder {
                        num_classes: self.config.num_classes,
                    };
                    decoder.decode(&head, stride, &anchors[idx], prob_threshold, &mut proposals)?;
                }
            }
        }

        tracing::debug!(proposals = proposals.len(), "Decoded proposals");

        sort_by_score(&mut proposals);
        let picked = nms_sorted(&proposals, nms_threshold, self.config.agnostic_nms);

        let transform = TransformParams {
            scale: pre.scale,
            wpad: pre.wpad,
            hpad: pre.hpad,
            orig_width: width,
            orig_height: height,
        };

        let mut results = Vec::with_capacity(picked.len());
        for idx in picked {
            let mut bbox = proposals[idx].clone();
            rectify(&mut bbox, &transform);
            results.push(bbox);
        }

        tracing::debug!(detections = results.len(), "Detection complete");
        Ok(results)
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use detection::Anchor;
    use ndarray::{Array, ArrayD, IxDyn};
    use preprocess::Normalization;

    /// Backend stub returning canned tensors.
    struct FakeBackend {
        outputs: Vec<ArrayD<f32>>,
    }

    impl FakeBackend {
        fn new(outputs: Vec<ArrayD<f32>>) -> Self {
            Self { outputs }
        }
    }

    impl InferenceBackend for FakeBackend {
        fn load_model(_path: &str) -> anyhow::Result<Self> {
            Ok(Self::new(Vec::new()))
        }

        fn run(
            &mut self,
            _input_name: &str,
            input: &Array<f32, IxDyn>,
            _output_names: &[String],
        ) -> anyhow::Result<Vec<ArrayD<f32>>> {
            // The detector always hands over an NCHW batch-1 tensor.
            anyhow::ensure!(input.ndim() == 4 && input.shape()[0] == 1);
            Ok(self.outputs.clone())
        }
    }

    /// Two-stride anchor-based test config over a 64px input.
    fn test_config() -> DetectorConfig {
        DetectorConfig {
            input_name: "in0".to_string(),
            output_names: vec!["out0".to_string(), "out1".to_string()],
            strides: vec![8, 16],
            num_classes: 2,
            target_size: 64,
            max_stride: 32,
            pad_value: 0,
            swap_rb: false,
            normalization: Normalization {
                mean: [0.0; 3],
                scale: [1.0 / 255.0; 3],
            },
            head: HeadKind::Anchored {
                anchors: vec![vec![Anchor { w: 16.0, h: 16.0 }], vec![Anchor { w: 32.0, h: 32.0 }]],
            },
            agnostic_nms: false,
        }
    }

    /// One-anchor head tensor, all logits far negative.
    fn quiet_head(num_classes: usize, rows: usize, cols: usize) -> ArrayD<f32> {
        Array::from_elem(IxDyn(&[num_classes + 5, rows, cols]), -10.0f32)
    }

    #[test]
    fn full_pipeline_produces_boxes_in_image_space() {
        let num_classes = 2;
        // 64x64 input: stride-8 head is 8x8, stride-16 head is 4x4.
        let mut head0 = quiet_head(num_classes, 8, 8);
        // Confident class-1 object at cell (4, 4), centered.
        for c in 0..4 {
            head0[[c, 4, 4]] = 0.0;
        }
        head0[[4, 4, 4]] = 10.0;
        head0[[5 + 1, 4, 4]] = 10.0;

        let head1 = quiet_head(num_classes, 4, 4);

        let backend = FakeBackend::new(vec![head0, head1]);
        let mut detector = Detector::new(backend, test_config()).unwrap();

        // 64x64 image needs no resize or padding.
        let rgb = vec![50u8; 64 * 64 * 3];
        let boxes = detector.detect(&rgb, 64, 64, 0.3, 0.5).unwrap();

        assert_eq!(boxes.len(), 1);
        let b = &boxes[0];
        assert_eq!(b.label, 1);
        assert!(b.score > 0.999);

        // Cell (4, 4) at stride 8 with dx/dy sigmoid 0.5: center
        // (4.5 * 8, 4.5 * 8) = (36, 36), size = anchor 16x16.
        assert!((b.x1 - 28.0).abs() < 1e-3);
        assert!((b.y1 - 28.0).abs() < 1e-3);
        assert!((b.w - 16.0).abs() < 1e-3);
        assert!((b.h - 16.0).abs() < 1e-3);
    }

    #[test]
    fn no_confident_cells_yields_empty_result() {
        let backend = FakeBackend::new(vec![quiet_head(2, 8, 8), quiet_head(2, 4, 4)]);
        let mut detector = Detector::new(backend, test_config()).unwrap();

        let rgb = vec![0u8; 64 * 64 * 3];
        let boxes = detector.detect(&rgb, 64, 64, 0.3, 0.5).unwrap();
        assert!(boxes.is_empty());
    }

    #[test]
    fn missing_backend_output_is_fatal() {
        // Backend returns one tensor where the config expects two.
        let backend = FakeBackend::new(vec![quiet_head(2, 8, 8)]);
        let mut detector = Detector::new(backend, test_config()).unwrap();

        let rgb = vec![0u8; 64 * 64 * 3];
        let err = detector.detect(&rgb, 64, 64, 0.3, 0.5).unwrap_err();
        assert!(err.to_string().contains("expected 2"));
    }

    #[test]
    fn malformed_head_shape_is_fatal() {
        // Wrong channel count for the configured anchor layout.
        let bad = Array::from_elem(IxDyn(&[3, 8, 8]), -10.0f32);
        let backend = FakeBackend::new(vec![bad, quiet_head(2, 4, 4)]);
        let mut detector = Detector::new(backend, test_config()).unwrap();

        let rgb = vec![0u8; 64 * 64 * 3];
        assert!(detector.detect(&rgb, 64, 64, 0.3, 0.5).is_err());
    }

    #[test]
    fn invalid_config_rejected_at_construction() {
        let mut config = test_config();
        config.output_names.pop();
        let backend = FakeBackend::new(Vec::new());
        assert!(Detector::new(backend, config).is_err());
    }

    #[test]
    fn results_are_score_descending() {
        let num_classes = 2;
        let mut head0 = quiet_head(num_classes, 8, 8);
        // Two well-separated objects with different confidences,
        // emitted in ascending-score grid order.
        for (cell, obj) in [((1usize, 1usize), 3.0f32), ((6, 6), 8.0)] {
            for c in 0..4 {
                head0[[c, cell.0, cell.1]] = 0.0;
            }
            head0[[4, cell.0, cell.1]] = obj;
            head0[[5, cell.0, cell.1]] = 6.0;
        }
        let head1 = quiet_head(num_classes, 4, 4);

        let backend = FakeBackend::new(vec![head0, head1]);
        let mut detector = Detector::new(backend, test_config()).unwrap();

        let rgb = vec![0u8; 64 * 64 * 3];
        let boxes = detector.detect(&rgb, 64, 64, 0.3, 0.5).unwrap();

        assert_eq!(boxes.len(), 2);
        assert!(boxes[0].score > boxes[1].score);
        // The stronger detection came from cell (6, 6).
        assert!(boxes[0].x1 > boxes[1].x1);
    }
}
