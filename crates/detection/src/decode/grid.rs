use crate::bbox::BoxInfo;
use crate::sigmoid;
use crate::tensor::FeatureMap;

/// Anchor-free decoder for grid heads with distribution-based box
/// regression.
///
/// Channel layout: `num_classes` raw class scores followed by four
/// independent `reg_bins`-wide distributions, one per box edge in
/// left/top/right/bottom order. Each distribution is softmaxed on its
/// own and collapsed to its expected bin index, which is the edge
/// distance from the cell center in stride units.
#[derive(Debug, Clone)]
pub struct GridDecoder {
    pub num_classes: usize,
    /// Bins per edge distribution.
    pub reg_bins: usize,
}

impl GridDecoder {
    #[tracing::instrument(skip(self, pred, proposals))]
    pub fn decode(
        &self,
        pred: &FeatureMap,
        stride: u32,
        prob_threshold: f32,
        proposals: &mut Vec<BoxInfo>,
    ) -> anyhow::Result<()> {
        let expected = self.num_classes + 4 * self.reg_bins;
        anyhow::ensure!(
            pred.channels() == expected,
            "Grid head channel mismatch: got {}, expected {} ({} classes + 4x{} bins)",
            pred.channels(),
            expected,
            self.num_classes,
            self.reg_bins
        );

        let stride_f = stride as f32;

        for i in 0..pred.rows() {
            for j in 0..pred.cols() {
                // Class with max raw score; ties go to the lowest index.
                let mut label = 0usize;
                let mut raw_score = f32::NEG_INFINITY;
                for k in 0..self.num_classes {
                    let s = pred.at(k, i, j);
                    if s > raw_score {
                        label = k;
                        raw_score = s;
                    }
                }

                let score = sigmoid(raw_score);
                if score < prob_threshold {
                    continue;
                }

                // Expected distance per edge, softmaxed per edge.
                let mut ltrb = [0.0f32; 4];
                for (edge, dist) in ltrb.iter_mut().enumerate() {
                    let base = self.num_classes + edge * self.reg_bins;

                    let mut max_logit = f32::NEG_INFINITY;
                    for b in 0..self.reg_bins {
                        max_logit = max_logit.max(pred.at(base + b, i, j));
                    }

                    let mut denom = 0.0f32;
                    let mut weighted = 0.0f32;
                    for b in 0..self.reg_bins {
                        let e = (pred.at(base + b, i, j) - max_logit).exp();
                        denom += e;
                        weighted += b as f32 * e;
                    }

                    *dist = weighted / denom * stride_f;
                }

                let cx = j as f32 * stride_f;
                let cy = i as f32 * stride_f;

                let x0 = cx - ltrb[0];
                let y0 = cy - ltrb[1];
                let x1 = cx + ltrb[2];
                let y1 = cy + ltrb[3];

                proposals.push(BoxInfo {
                    x1: x0,
                    y1: y0,
                    w: x1 - x0,
                    h: y1 - y0,
                    label,
                    score,
                });
            }
        }

        Ok(())
    }
}
