//! Local folio detector backed by ONNX Runtime.

use std::sync::Mutex;

use image::RgbImage;
use ndarray::Array;
use ort::session::Session;
use ort::value::TensorRef;
use tracing::{debug, info};

use super::yolo::{decode, non_max_suppression, DecodeParams};
use super::{BoundingBox, Detection, DetectionEngine, DetectionError};
use crate::config::LocalDetectorConfig;

/// YOLOv8-style ONNX export run in-process.
pub struct OnnxDetector {
    // `Session::run` takes `&mut self`.
    session: Mutex<Session>,
    config: LocalDetectorConfig,
}

impl OnnxDetector {
    /// Load the model file named in `config`.
    pub fn load(config: LocalDetectorConfig) -> Result<Self, DetectionError> {
        if !config.model_path.exists() {
            return Err(DetectionError::ModelLoad(format!(
                "model file not found: {}",
                config.model_path.display()
            )));
        }
        info!("Loading folio detector from {:?}", config.model_path);

        let session = Session::builder()
            .map_err(|e| DetectionError::ModelLoad(e.to_string()))?
            .commit_from_file(&config.model_path)
            .map_err(|e| DetectionError::ModelLoad(e.to_string()))?;

        Ok(Self {
            session: Mutex::new(session),
            config,
        })
    }

    fn class_label(&self, class_id: usize) -> String {
        self.config
            .class_names
            .get(class_id)
            .cloned()
            .unwrap_or_else(|| class_id.to_string())
    }

    /// Resize to a square input and convert to normalized CHW.
    fn prepare_input(image: &RgbImage, input_size: u32) -> Array<f32, ndarray::Dim<[usize; 4]>> {
        let resized = image::imageops::resize(
            image,
            input_size,
            input_size,
            image::imageops::FilterType::Triangle,
        );

        let size = input_size as usize;
        let mut input = Array::zeros((1, 3, size, size));
        for (x, y, pixel) in resized.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            input[[0, 0, y, x]] = f32::from(pixel[0]) / 255.0;
            input[[0, 1, y, x]] = f32::from(pixel[1]) / 255.0;
            input[[0, 2, y, x]] = f32::from(pixel[2]) / 255.0;
        }
        input
    }
}

impl DetectionEngine for OnnxDetector {
    fn name(&self) -> &'static str {
        "onnx"
    }

    fn detect(
        &self,
        image: &RgbImage,
        target_size: u32,
        min_confidence: f64,
    ) -> Result<Vec<Detection>, DetectionError> {
        let input = Self::prepare_input(image, target_size);
        let tensor = TensorRef::from_array_view(input.view())
            .map_err(|e| DetectionError::Inference(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| DetectionError::Inference("detector session poisoned".to_string()))?;
        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| DetectionError::Inference(e.to_string()))?;

        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectionError::Inference(format!("Failed to extract tensor: {e}")))?;
        let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
        debug!("Detector output shape: {:?}", dims);

        let params = DecodeParams {
            input_size: target_size,
            image_width: image.width(),
            image_height: image.height(),
            min_score: min_confidence as f32,
        };
        let candidates = decode(&dims, data, &params).map_err(DetectionError::Inference)?;
        let kept = non_max_suppression(
            candidates,
            self.config.iou_threshold,
            self.config.max_detections,
        );

        Ok(kept
            .into_iter()
            .map(|c| {
                Detection::new(
                    BoundingBox::new(c.cx as f64, c.cy as f64, c.width as f64, c.height as f64),
                    c.score as f64,
                    self.class_label(c.class_id),
                    c.class_id as i64,
                )
            })
            .collect())
    }
}
