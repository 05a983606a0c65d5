//! Per-run pipeline parameters.

use serde::{Deserialize, Serialize};

use crate::imaging::PreprocessMode;

/// Knobs for a single run. Every field has a default so any subset may be
/// supplied by a config file, CLI flags, or HTTP query parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineParams {
    /// Rasterization resolution.
    pub dpi: u32,
    /// Detection model input size.
    pub imgsz: u32,
    /// Minimum detection confidence to keep a region at all.
    pub conf: f64,
    /// Minimum detection confidence to run OCR on a region.
    pub min_confidence: f64,
    pub ocr: bool,
    pub digits_only: bool,
    /// Preferred first digit engine, or `auto`.
    pub digits_engine: String,
    /// `strong`, `light` or `none`.
    pub digits_preprocess: String,
    pub pad_ratio: f64,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            dpi: 300,
            imgsz: 512,
            conf: 0.25,
            min_confidence: 0.5,
            ocr: true,
            digits_only: true,
            digits_engine: "auto".to_string(),
            digits_preprocess: "strong".to_string(),
            pad_ratio: 0.15,
        }
    }
}

impl PipelineParams {
    pub fn preprocess_mode(&self) -> PreprocessMode {
        PreprocessMode::from_name(&self.digits_preprocess)
    }

    /// Overlay any values present in `overrides`.
    pub fn merged(&self, overrides: &ParamOverrides) -> Self {
        let mut params = self.clone();
        if let Some(dpi) = overrides.dpi {
            params.dpi = dpi;
        }
        if let Some(imgsz) = overrides.imgsz {
            params.imgsz = imgsz;
        }
        if let Some(conf) = overrides.conf {
            params.conf = conf;
        }
        if let Some(min_confidence) = overrides.min_confidence {
            params.min_confidence = min_confidence;
        }
        if let Some(ocr) = overrides.ocr {
            params.ocr = ocr;
        }
        if let Some(digits_only) = overrides.digits_only {
            params.digits_only = digits_only;
        }
        if let Some(ref engine) = overrides.digits_engine {
            params.digits_engine = engine.clone();
        }
        if let Some(ref preprocess) = overrides.digits_preprocess {
            params.digits_preprocess = preprocess.clone();
        }
        if let Some(pad_ratio) = overrides.pad_ratio {
            params.pad_ratio = pad_ratio;
        }
        params
    }
}

/// Partial parameters, as received from a request or the command line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamOverrides {
    pub dpi: Option<u32>,
    pub imgsz: Option<u32>,
    pub conf: Option<f64>,
    pub min_confidence: Option<f64>,
    pub ocr: Option<bool>,
    pub digits_only: Option<bool>,
    pub digits_engine: Option<String>,
    pub digits_preprocess: Option<String>,
    pub pad_ratio: Option<f64>,
}
