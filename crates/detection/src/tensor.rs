use ndarray::{ArrayD, ArrayView3, Axis, Ix3};

/// Read-only `(channel, row, col)` view over a raw detection-head
/// output.
///
/// Accepts `[c, h, w]` tensors or batch-1 `[1, c, h, w]` tensors;
/// anything else is a malformed inference output and fatal for the
/// request.
#[derive(Debug)]
pub struct FeatureMap<'a> {
    data: ArrayView3<'a, f32>,
}

impl<'a> FeatureMap<'a> {
    pub fn from_output(output: &'a ArrayD<f32>) -> anyhow::Result<Self> {
        let view = output.view();
        let data = match output.ndim() {
            3 => view.into_dimensionality::<Ix3>()?,
            4 if output.shape()[0] == 1 => {
                view.index_axis_move(Axis(0), 0).into_dimensionality::<Ix3>()?
            }
            _ => anyhow::bail!(
                "Unexpected output tensor shape {:?}: expected [c, h, w] or [1, c, h, w]",
                output.shape()
            ),
        };
        Ok(Self { data })
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.data.shape()[0]
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.data.shape()[1]
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.data.shape()[2]
    }

    #[inline]
    pub fn at(&self, c: usize, i: usize, j: usize) -> f32 {
        self.data[[c, i, j]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, IxDyn};

    #[test]
    fn accepts_chw_and_batched_chw() {
        let data: Vec<f32> = (0..24).map(|v| v as f32).collect();

        let chw = Array::from_shape_vec(IxDyn(&[2, 3, 4]), data.clone()).unwrap();
        let fm = FeatureMap::from_output(&chw).unwrap();
        assert_eq!((fm.channels(), fm.rows(), fm.cols()), (2, 3, 4));
        assert_eq!(fm.at(1, 2, 3), 23.0);

        let nchw = Array::from_shape_vec(IxDyn(&[1, 2, 3, 4]), data).unwrap();
        let fm = FeatureMap::from_output(&nchw).unwrap();
        assert_eq!((fm.channels(), fm.rows(), fm.cols()), (2, 3, 4));
        assert_eq!(fm.at(0, 0, 1), 1.0);
    }

    #[test]
    fn rejects_other_ranks() {
        let flat = Array::from_shape_vec(IxDyn(&[24]), vec![0.0f32; 24]).unwrap();
        assert!(FeatureMap::from_output(&flat).is_err());

        let batched = Array::from_shape_vec(IxDyn(&[2, 2, 3, 4]), vec![0.0f32; 48]).unwrap();
        let err = FeatureMap::from_output(&batched).unwrap_err();
        assert!(err.to_string().contains("shape"));
    }
}
