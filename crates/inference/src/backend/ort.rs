use super::InferenceBackend;
use ndarray::{Array, ArrayD, IxDyn};
use ort::{
    session::{Session, builder::GraphOptimizationLevel},
    value::TensorRef,
};

#[derive(Debug, Clone, Copy)]
pub enum ExecutionProvider {
    Cpu,
    Cuda,
}

pub struct OrtBackend {
    session: Session,
}

impl OrtBackend {
    /// Load model with specified execution provider
    pub fn load_model_with_provider(
        path: &str,
        provider: ExecutionProvider,
    ) -> anyhow::Result<Self> {
        // Initialize ORT environment (idempotent)
        let _ = ort::init().commit();

        let mut builder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?;

        match provider {
            ExecutionProvider::Cuda => {
                tracing::info!("Initializing ONNX Runtime with CUDA execution provider");
                builder = builder.with_execution_providers([
                    ort::execution_providers::CUDAExecutionProvider::default()
                        .with_device_id(0)
                        .build()
                        .error_on_failure(),
                ])?;
            }
            ExecutionProvider::Cpu => {
                tracing::info!("Initializing ONNX Runtime with CPU execution provider");
            }
        }

        let session = builder.commit_from_file(path)?;

        tracing::info!("Model loaded from {}", path);
        Ok(Self { session })
    }
}

impl InferenceBackend for OrtBackend {
    fn load_model(path: &str) -> anyhow::Result<Self> {
        Self::load_model_with_provider(path, ExecutionProvider::Cpu)
    }

    fn run(
        &mut self,
        input_name: &str,
        input: &Array<f32, IxDyn>,
        output_names: &[String],
    ) -> anyhow::Result<Vec<ArrayD<f32>>> {
        let outputs = self.session.run(ort::inputs![
            input_name => TensorRef::from_array_view(input.view())?
        ])?;

        let mut tensors = Vec::with_capacity(output_names.len());
        for name in output_names {
            let value = outputs
                .get(name.as_str())
                .ok_or_else(|| anyhow::anyhow!("Missing output tensor '{name}' in session results"))?;
            tensors.push(value.try_extract_array::<f32>()?.into_owned());
        }

        Ok(tensors)
    }
}
