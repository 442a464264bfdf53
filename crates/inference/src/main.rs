use common::setup_logging;
use inference::{Detector, ServiceConfig, backend::InferenceBackend, labels::COCO_CLASSES};

#[cfg(feature = "ort-backend")]
use inference::backend::ort::OrtBackend as Backend;

#[cfg(not(feature = "ort-backend"))]
compile_error!("The 'ort-backend' feature must be enabled to build the demo binary");

fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env()?;
    setup_logging(config.environment.clone());

    tracing::info!(
        config = ?config,
        "Loaded configuration"
    );

    let image_path = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("Usage: inference <image-path>"))?;

    let image = image::open(&image_path)?.to_rgb8();
    let (width, height) = image.dimensions();
    tracing::info!(path = %image_path, width, height, "Image loaded");

    tracing::info!("Loading inference model");
    let backend = Backend::load_model(&config.model_path)?;
    tracing::info!("Model loaded successfully");

    let mut detector = Detector::new(backend, config.detector_config())?;

    let boxes = detector.detect(
        image.as_raw(),
        width,
        height,
        config.prob_threshold,
        config.nms_threshold,
    )?;

    tracing::info!(count = boxes.len(), "Detection complete");
    for bbox in &boxes {
        let label = COCO_CLASSES.get(bbox.label).copied().unwrap_or("unknown");
        tracing::info!(
            label,
            score = bbox.score,
            x = bbox.x1,
            y = bbox.y1,
            w = bbox.w,
            h = bbox.h,
            "Detected object"
        );
    }

    Ok(())
}
