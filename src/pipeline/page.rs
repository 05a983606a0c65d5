//! Per-page orchestration: detect, gate, read, score.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::config::PipelineParams;
use crate::detection::{BoundingBox, Detection, DetectionEngine};
use crate::error::PageError;
use crate::foliation::compare_foliation;
use crate::ocr::{CropSettings, OcrCascade};
use crate::raster::PageImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

/// Everything found on one page.
#[derive(Debug, Clone, Serialize)]
pub struct PageResult {
    pub page_number: u32,
    pub detections: Vec<Detection>,
    /// Engine failures that did not stop the page.
    pub errors: Vec<String>,
    /// Set when the page could not be processed at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_dimensions: Option<ImageDimensions>,
}

impl PageResult {
    /// A page that failed outright: no detections, just the error.
    pub fn failed(page_number: u32, error: &PageError, image_dimensions: Option<ImageDimensions>) -> Self {
        Self {
            page_number,
            detections: Vec::new(),
            errors: Vec::new(),
            error: Some(error.to_string()),
            image_dimensions,
        }
    }
}

/// Flag detections below `min_confidence` so OCR skips them.
pub fn apply_confidence_gate(detections: &mut [Detection], min_confidence: f64) {
    for detection in detections.iter_mut() {
        if detection.confidence < min_confidence {
            detection.low_confidence = true;
            detection.skip_reason = Some(format!(
                "confidence {:.3} below min_confidence {}",
                detection.confidence, min_confidence
            ));
        }
    }
}

/// Runs one page through detection, the confidence gate and the OCR cascade.
#[derive(Clone)]
pub struct PageProcessor {
    detector: Arc<dyn DetectionEngine>,
    cascade: Arc<OcrCascade>,
}

impl PageProcessor {
    pub fn new(detector: Arc<dyn DetectionEngine>, cascade: Arc<OcrCascade>) -> Self {
        Self { detector, cascade }
    }

    pub fn detector(&self) -> &Arc<dyn DetectionEngine> {
        &self.detector
    }

    pub fn cascade(&self) -> &Arc<OcrCascade> {
        &self.cascade
    }

    /// Process a page. Failures end up in the result, never in the caller.
    pub fn process(&self, page: &PageImage, params: &PipelineParams) -> PageResult {
        let dimensions = ImageDimensions {
            width: page.width(),
            height: page.height(),
        };
        match self.try_process(page, params, dimensions) {
            Ok(result) => result,
            Err(e) => PageResult::failed(page.page_number, &e, Some(dimensions)),
        }
    }

    fn try_process(
        &self,
        page: &PageImage,
        params: &PipelineParams,
        dimensions: ImageDimensions,
    ) -> Result<PageResult, PageError> {
        let mut detections = self.detector.detect(&page.pixels, params.imgsz, params.conf)?;
        apply_confidence_gate(&mut detections, params.min_confidence);

        let mut errors = Vec::new();
        if params.ocr {
            let trusted: Vec<usize> = detections
                .iter()
                .enumerate()
                .filter(|(_, d)| !d.low_confidence)
                .map(|(i, _)| i)
                .collect();

            if !trusted.is_empty() {
                let regions: Vec<BoundingBox> = trusted.iter().map(|&i| detections[i].bbox).collect();
                let crop = CropSettings {
                    pad_ratio: params.pad_ratio,
                    mode: params.preprocess_mode(),
                };
                let output = self
                    .cascade
                    .extract_digits(&page.pixels, &regions, crop, &params.digits_engine);
                errors = output.errors;

                for (&i, outcome) in trusted.iter().zip(output.outcomes) {
                    let detection = &mut detections[i];
                    if !outcome.digits.is_empty() {
                        detection.foliation = Some(compare_foliation(&outcome.digits, page.page_number));
                    }
                    detection.ocr = Some(outcome.view(params.digits_only));
                }
            }
        }

        debug!(
            "Page {}: {} detections, {} engine errors",
            page.page_number,
            detections.len(),
            errors.len()
        );

        Ok(PageResult {
            page_number: page.page_number,
            detections,
            errors,
            error: None,
            image_dimensions: Some(dimensions),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::BoundingBox;

    #[test]
    fn test_confidence_gate() {
        let bbox = BoundingBox::new(10.0, 10.0, 5.0, 5.0);
        let mut detections = vec![
            Detection::new(bbox, 0.3, "folio".to_string(), 0),
            Detection::new(bbox, 0.5, "folio".to_string(), 0),
            Detection::new(bbox, 0.9, "folio".to_string(), 0),
        ];
        apply_confidence_gate(&mut detections, 0.5);

        assert!(detections[0].low_confidence);
        assert!(detections[0].skip_reason.as_deref().unwrap().contains("0.300"));
        assert!(!detections[1].low_confidence);
        assert!(detections[1].skip_reason.is_none());
        assert!(!detections[2].low_confidence);
        // The gate never touches confidence.
        assert_eq!(detections[0].confidence, 0.3);
    }

    #[test]
    fn test_failed_page_has_no_detections() {
        let err = PageError::Detection(crate::detection::DetectionError::Inference("boom".to_string()));
        let result = PageResult::failed(4, &err, None);
        assert!(result.detections.is_empty());
        assert_eq!(result.error.as_deref(), Some("detection failed: Inference failed: boom"));

        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("image_dimensions").is_none());
        assert_eq!(json["page_number"], 4);
    }
}
