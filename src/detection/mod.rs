//! Folio region detection.
//!
//! Two backends sit behind [`DetectionEngine`]: a local ONNX model
//! (feature `detect-onnx`) and a hosted inference API.

#[cfg(feature = "detect-onnx")]
mod onnx;
mod remote;
pub mod yolo;

use std::sync::Arc;

use image::RgbImage;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::config::DetectorConfig;
use crate::error::FoliationError;
use crate::foliation::FoliationCheck;
use crate::ocr::OcrView;

#[cfg(feature = "detect-onnx")]
pub use onnx::OnnxDetector;
pub use remote::{parse_predictions, RemoteDetector};

/// Errors raised while running detection on a page.
#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("Model load failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Axis-aligned box in page pixels, stored center-first like YOLO output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    /// Center x.
    pub x: f64,
    /// Center y.
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Corner form `(x1, y1, x2, y2)`.
    pub fn to_xyxy(&self) -> (f64, f64, f64, f64) {
        (
            self.x - self.width / 2.0,
            self.y - self.height / 2.0,
            self.x + self.width / 2.0,
            self.y + self.height / 2.0,
        )
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Whether a point lies inside the box, edges included.
    pub fn contains(&self, px: f64, py: f64) -> bool {
        let (x1, y1, x2, y2) = self.to_xyxy();
        x1 <= px && px <= x2 && y1 <= py && py <= y2
    }

    /// Intersection over union.
    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let (ax1, ay1, ax2, ay2) = self.to_xyxy();
        let (bx1, by1, bx2, by2) = other.to_xyxy();

        let inter_w = (ax2.min(bx2) - ax1.max(bx1)).max(0.0);
        let inter_h = (ay2.min(by2) - ay1.max(by1)).max(0.0);
        let intersection = inter_w * inter_h;
        let union = self.area() + other.area() - intersection;

        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

/// One detected folio region plus the annotations the pipeline attaches.
#[derive(Debug, Clone, Serialize)]
pub struct Detection {
    #[serde(flatten)]
    pub bbox: BoundingBox,
    /// Rounded to three decimals at creation and never changed afterwards.
    pub confidence: f64,
    #[serde(rename = "class")]
    pub class_label: String,
    pub class_id: i64,
    pub detection_id: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub low_confidence: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    #[serde(flatten)]
    pub ocr: Option<OcrView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foliation: Option<FoliationCheck>,
}

impl Detection {
    /// Create a detection with a fresh id.
    pub fn new(bbox: BoundingBox, confidence: f64, class_label: String, class_id: i64) -> Self {
        Self {
            bbox,
            confidence: round_confidence(confidence),
            class_label,
            class_id,
            detection_id: uuid::Uuid::new_v4().to_string(),
            low_confidence: false,
            skip_reason: None,
            ocr: None,
            foliation: None,
        }
    }

    /// Whether OCR has been attached.
    pub fn was_read(&self) -> bool {
        self.ocr.is_some()
    }
}

fn round_confidence(confidence: f64) -> f64 {
    (confidence * 1000.0).round() / 1000.0
}

/// Locates folio regions on a page image.
pub trait DetectionEngine: Send + Sync {
    /// Short backend name for logs and the `engines` listing.
    fn name(&self) -> &'static str;

    /// Detect regions at or above `min_confidence`, with the model input
    /// resized to `target_size`.
    fn detect(
        &self,
        image: &RgbImage,
        target_size: u32,
        min_confidence: f64,
    ) -> Result<Vec<Detection>, DetectionError>;
}

/// Build the configured detection backend.
pub fn build_detector(config: &DetectorConfig) -> Result<Arc<dyn DetectionEngine>, FoliationError> {
    match config {
        DetectorConfig::Local(local) => build_local(local),
        DetectorConfig::Remote(remote) => {
            let detector = RemoteDetector::new(remote.clone())?;
            info!(
                "Using remote detector {} at {}",
                remote.model_id, remote.api_url
            );
            Ok(Arc::new(detector))
        }
    }
}

#[cfg(feature = "detect-onnx")]
fn build_local(
    local: &crate::config::LocalDetectorConfig,
) -> Result<Arc<dyn DetectionEngine>, FoliationError> {
    let detector = OnnxDetector::load(local.clone())
        .map_err(|e| FoliationError::Configuration(e.to_string()))?;
    Ok(Arc::new(detector))
}

#[cfg(not(feature = "detect-onnx"))]
fn build_local(
    local: &crate::config::LocalDetectorConfig,
) -> Result<Arc<dyn DetectionEngine>, FoliationError> {
    Err(FoliationError::Configuration(format!(
        "local model {} requested but foliacheck was built without the detect-onnx feature",
        local.model_path.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_iou() {
        let a = BoundingBox::new(50.0, 50.0, 100.0, 100.0);
        assert!((a.iou(&a) - 1.0).abs() < 1e-9);

        let b = BoundingBox::new(100.0, 50.0, 100.0, 100.0);
        let iou = a.iou(&b);
        assert!((iou - 1.0 / 3.0).abs() < 1e-9);

        let far = BoundingBox::new(500.0, 500.0, 10.0, 10.0);
        assert_eq!(a.iou(&far), 0.0);
    }

    #[test]
    fn test_bbox_contains_edges() {
        let b = BoundingBox::new(10.0, 10.0, 4.0, 4.0);
        assert!(b.contains(8.0, 8.0));
        assert!(b.contains(12.0, 12.0));
        assert!(!b.contains(12.5, 10.0));
    }

    #[test]
    fn test_detection_rounds_confidence_and_ids_are_unique() {
        let bbox = BoundingBox::new(1.0, 1.0, 1.0, 1.0);
        let a = Detection::new(bbox, 0.91266, "folio".to_string(), 0);
        let b = Detection::new(bbox, 0.5, "folio".to_string(), 0);
        assert_eq!(a.confidence, 0.913);
        assert_ne!(a.detection_id, b.detection_id);
    }

    #[test]
    fn test_detection_serializes_original_field_names() {
        let d = Detection::new(
            BoundingBox::new(10.0, 20.0, 30.0, 40.0),
            0.9,
            "folio".to_string(),
            2,
        );
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["x"], 10.0);
        assert_eq!(json["y"], 20.0);
        assert_eq!(json["width"], 30.0);
        assert_eq!(json["height"], 40.0);
        assert_eq!(json["class"], "folio");
        assert_eq!(json["class_id"], 2);
        assert!(json.get("low_confidence").is_none());
        assert!(json.get("foliation").is_none());
    }

    #[cfg(not(feature = "detect-onnx"))]
    #[test]
    fn test_local_without_feature_is_configuration_error() {
        let config = DetectorConfig::Local(crate::config::LocalDetectorConfig::new(
            "/models/folio.onnx".into(),
        ));
        let err = build_detector(&config).err().unwrap();
        assert!(matches!(err, FoliationError::Configuration(_)));
    }
}
