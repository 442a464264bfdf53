use ndarray::{Array, ArrayD, IxDyn};

#[cfg(feature = "ort-backend")]
pub mod ort;

/// Narrow contract toward the network runtime: feed one named input
/// tensor, get back one raw output tensor per requested name, in
/// request order.
///
/// The backend owns the loaded weights and execution buffers; a failed
/// run or a missing named output is fatal for that request.
pub trait InferenceBackend {
    fn load_model(path: &str) -> anyhow::Result<Self>
    where
        Self: Sized;

    fn run(
        &mut self,
        input_name: &str,
        input: &Array<f32, IxDyn>,
        output_names: &[String],
    ) -> anyhow::Result<Vec<ArrayD<f32>>>;
}
