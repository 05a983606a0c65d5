//! Folio digit OCR.
//!
//! ## Engines
//!
//! - **ocrs**: pure Rust neural OCR (feature: ocr-ocrs), first in the default order
//! - **Tesseract**: command-line OCR restricted to digits, and the whole-page
//!   general fallback
//!
//! [`OcrCascade`] runs the digit engines in order, each one only over the
//! regions that still lack digits.

mod backend;
mod cascade;
pub mod model_utils;
mod normalize;
mod tesseract;

#[cfg(feature = "ocr-ocrs")]
mod ocrs_backend;

pub use backend::{
    DigitEngineKind, DigitOcrEngine, GeneralOcrEngine, OcrEngineUsed, OcrError, OcrWord,
};
pub use cascade::{words_inside, CascadeOutput, CropSettings, OcrCascade, OcrOutcome, OcrView};
pub use normalize::{normalize_digits, strip_non_digits};
pub use tesseract::{parse_tsv, TesseractBackend};

#[cfg(feature = "ocr-ocrs")]
pub use ocrs_backend::OcrsBackend;
