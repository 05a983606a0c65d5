//! OCRS digit engine.
//!
//! Uses the ocrs crate for pure-Rust OCR without external binaries.
//! ocrs has no character allowlist, so its text goes through glyph
//! correction instead.
//!
//! Models are downloaded on first use from:
//! https://ocrs-models.s3-accelerate.amazonaws.com/

use std::path::PathBuf;
use std::sync::OnceLock;

use image::{DynamicImage, GrayImage};
use tracing::info;

use super::backend::{DigitEngineKind, DigitOcrEngine, OcrError};
use super::model_utils::{ModelFile, ModelStore};
use super::normalize::normalize_digits;

const DETECTION_MODEL: &str = "text-detection.rten";
const RECOGNITION_MODEL: &str = "text-recognition.rten";

const MODELS: ModelStore = ModelStore {
    subdir: "ocrs",
    files: &[
        ModelFile {
            url: "https://ocrs-models.s3-accelerate.amazonaws.com/text-detection.rten",
            filename: DETECTION_MODEL,
        },
        ModelFile {
            url: "https://ocrs-models.s3-accelerate.amazonaws.com/text-recognition.rten",
            filename: RECOGNITION_MODEL,
        },
    ],
};

/// OCRS digit engine (pure Rust).
pub struct OcrsBackend {
    model_dir: Option<PathBuf>,
    /// Loaded on first use. `OcrEngine` methods take `&self`.
    engine: OnceLock<ocrs::OcrEngine>,
}

impl OcrsBackend {
    pub fn new(model_dir: Option<PathBuf>) -> Self {
        Self {
            model_dir,
            engine: OnceLock::new(),
        }
    }

    fn find_model_dir(&self) -> Option<PathBuf> {
        MODELS.locate(self.model_dir.as_deref())
    }

    fn engine(&self) -> Result<&ocrs::OcrEngine, OcrError> {
        if let Some(engine) = self.engine.get() {
            return Ok(engine);
        }

        let model_dir = MODELS.ensure(self.model_dir.as_deref())?;
        info!("Loading OCRS models from {:?}", model_dir);

        let detection_model = rten::Model::load_file(model_dir.join(DETECTION_MODEL))
            .map_err(|e| OcrError::ModelNotFound(format!("Failed to load detection model: {}", e)))?;
        let recognition_model = rten::Model::load_file(model_dir.join(RECOGNITION_MODEL))
            .map_err(|e| OcrError::ModelNotFound(format!("Failed to load recognition model: {}", e)))?;

        let engine = ocrs::OcrEngine::new(ocrs::OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|e| OcrError::OcrFailed(format!("Failed to create OCR engine: {}", e)))?;

        // Another thread may have won the race; either engine is fine.
        let _ = self.engine.set(engine);
        self.engine
            .get()
            .ok_or_else(|| OcrError::OcrFailed("Failed to cache OCR engine".to_string()))
    }
}

impl Default for OcrsBackend {
    fn default() -> Self {
        Self::new(None)
    }
}

impl DigitOcrEngine for OcrsBackend {
    fn kind(&self) -> DigitEngineKind {
        DigitEngineKind::Ocrs
    }

    fn is_available(&self) -> bool {
        // Models are downloaded on first use.
        true
    }

    fn availability_hint(&self) -> String {
        match self.find_model_dir() {
            Some(path) => format!("OCRS models found at {:?}", path),
            None => format!(
                "OCRS models will be downloaded on first use (~12 MB) to {:?}",
                self.model_dir.clone().unwrap_or_else(|| MODELS.default_dir())
            ),
        }
    }

    fn recognize(&self, crop: &GrayImage) -> Result<String, OcrError> {
        let engine = self.engine()?;

        let rgb = DynamicImage::ImageLuma8(crop.clone()).to_rgb8();
        let (width, height) = rgb.dimensions();
        let source = ocrs::ImageSource::from_bytes(rgb.as_raw(), (width, height))
            .map_err(|e| OcrError::ImageError(format!("Failed to convert image: {}", e)))?;

        let input = engine
            .prepare_input(source)
            .map_err(|e| OcrError::OcrFailed(format!("Failed to prepare input: {}", e)))?;

        engine
            .get_text(&input)
            .map_err(|e| OcrError::OcrFailed(format!("Failed to extract text: {}", e)))
    }

    fn digits_from_text(&self, text: &str) -> String {
        normalize_digits(text)
    }
}
