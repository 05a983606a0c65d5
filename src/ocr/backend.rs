//! OCR engine abstraction.
//!
//! Digit engines read a single preprocessed crop. The general engine reads
//! a whole page and returns positioned words.

use std::fmt;

use image::{GrayImage, RgbImage};
use serde::Serialize;
use thiserror::Error;

use super::normalize::strip_non_digits;

/// Errors from OCR engines.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    ImageError(String),
}

/// Digit engines the cascade knows how to order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigitEngineKind {
    /// Pure Rust neural OCR (ocrs crate).
    Ocrs,
    /// Tesseract via command line.
    Tesseract,
}

impl DigitEngineKind {
    /// Order used when no engine is preferred.
    pub const DEFAULT_ORDER: [DigitEngineKind; 2] = [DigitEngineKind::Ocrs, DigitEngineKind::Tesseract];

    pub fn as_str(&self) -> &'static str {
        match self {
            DigitEngineKind::Ocrs => "ocrs",
            DigitEngineKind::Tesseract => "tesseract",
        }
    }

    /// Parse an engine name. `easyocr` names the neural engine slot.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "ocrs" | "easyocr" => Some(DigitEngineKind::Ocrs),
            "tesseract" => Some(DigitEngineKind::Tesseract),
            _ => None,
        }
    }
}

impl fmt::Display for DigitEngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which engine produced a detection's digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrEngineUsed {
    Ocrs,
    Tesseract,
    /// Digits salvaged from the whole-page fallback.
    General,
    #[default]
    None,
}

impl OcrEngineUsed {
    pub fn as_str(&self) -> &'static str {
        match self {
            OcrEngineUsed::Ocrs => "ocrs",
            OcrEngineUsed::Tesseract => "tesseract",
            OcrEngineUsed::General => "general",
            OcrEngineUsed::None => "none",
        }
    }
}

impl From<DigitEngineKind> for OcrEngineUsed {
    fn from(kind: DigitEngineKind) -> Self {
        match kind {
            DigitEngineKind::Ocrs => OcrEngineUsed::Ocrs,
            DigitEngineKind::Tesseract => OcrEngineUsed::Tesseract,
        }
    }
}

impl fmt::Display for OcrEngineUsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Engine that reads the digits in one preprocessed crop.
pub trait DigitOcrEngine: Send + Sync {
    fn kind(&self) -> DigitEngineKind;

    /// Check if this engine can run (binaries installed, models present).
    fn is_available(&self) -> bool;

    /// What's needed to make this engine available.
    fn availability_hint(&self) -> String;

    /// Recognize text in a crop. Returns the engine's raw text.
    fn recognize(&self, crop: &GrayImage) -> Result<String, OcrError>;

    /// Reduce raw text to digits. Engines without a hard digit allowlist
    /// override this with glyph correction.
    fn digits_from_text(&self, text: &str) -> String {
        strip_non_digits(text)
    }
}

/// One word from a whole-page read, with its box in page pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrWord {
    pub text: String,
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl OcrWord {
    pub fn center(&self) -> (f64, f64) {
        (
            f64::from(self.left) + f64::from(self.width) / 2.0,
            f64::from(self.top) + f64::from(self.height) / 2.0,
        )
    }
}

/// Engine that reads every word on a page.
pub trait GeneralOcrEngine: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_available(&self) -> bool;

    fn read_words(&self, page: &RgbImage) -> Result<Vec<OcrWord>, OcrError>;
}
