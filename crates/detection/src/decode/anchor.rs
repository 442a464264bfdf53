use crate::bbox::BoxInfo;
use crate::sigmoid;
use crate::tensor::FeatureMap;

/// Reference box shape for one anchor slot, in padded-tensor pixels.
#[derive(Debug, Clone, Copy)]
pub struct Anchor {
    pub w: f32,
    pub h: f32,
}

/// Anchor-based decoder using the YOLOv5 scale-and-shift sigmoid
/// parametrization.
///
/// Channel layout per anchor slot: `[dx, dy, dw, dh, objectness,
/// class_0..class_{n-1}]`. The decoding constants (2.0, 0.5, the
/// squared size term) are part of the trained model's contract and
/// must not be approximated.
#[derive(Debug, Clone)]
pub struct AnchorDecoder {
    pub num_classes: usize,
}

impl AnchorDecoder {
    #[tracing::instrument(skip(self, pred, anchors, proposals))]
    pub fn decode(
        &self,
        pred: &FeatureMap,
        stride: u32,
        anchors: &[Anchor],
        prob_threshold: f32,
        proposals: &mut Vec<BoxInfo>,
    ) -> anyhow::Result<()> {
        let per_anchor = self.num_classes + 5;
        let expected = anchors.len() * per_anchor;
        anyhow::ensure!(
            pred.channels() == expected,
            "Anchor head channel mismatch: got {}, expected {} ({} anchors x ({} classes + 5))",
            pred.channels(),
            expected,
            anchors.len(),
            self.num_classes
        );

        let stride_f = stride as f32;

        for (q, anchor) in anchors.iter().enumerate() {
            let base = q * per_anchor;

            for i in 0..pred.rows() {
                for j in 0..pred.cols() {
                    // Class with max raw score; ties go to the lowest index.
                    let mut class_index = 0usize;
                    let mut class_score = f32::NEG_INFINITY;
                    for k in 0..self.num_classes {
                        let score = pred.at(base + 5 + k, i, j);
                        if score > class_score {
                            class_index = k;
                            class_score = score;
                        }
                    }

                    let box_score = pred.at(base + 4, i, j);
                    let confidence = sigmoid(box_score) * sigmoid(class_score);
                    if confidence < prob_threshold {
                        continue;
                    }

                    let dx = sigmoid(pred.at(base, i, j));
                    let dy = sigmoid(pred.at(base + 1, i, j));
                    let dw = sigmoid(pred.at(base + 2, i, j));
                    let dh = sigmoid(pred.at(base + 3, i, j));

                    let pb_cx = (dx * 2.0 - 0.5 + j as f32) * stride_f;
                    let pb_cy = (dy * 2.0 - 0.5 + i as f32) * stride_f;

                    let pb_w = (dw * 2.0).powi(2) * anchor.w;
                    let pb_h = (dh * 2.0).powi(2) * anchor.h;

                    let x0 = pb_cx - pb_w * 0.5;
                    let y0 = pb_cy - pb_h * 0.5;
                    let x1 = pb_cx + pb_w * 0.5;
                    let y1 = pb_cy + pb_h * 0.5;

                    proposals.push(BoxInfo {
                        x1: x0,
                        y1: y0,
                        w: x1 - x0,
                        h: y1 - y0,
                        label: class_index,
                        score: confidence,
                    });
                }
            }
        }

        Ok(())
    }
}
