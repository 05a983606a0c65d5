//! Ordered digit OCR with work narrowing and a whole-page fallback.

use std::cmp::Ordering;
use std::sync::Arc;

use image::{GrayImage, RgbImage};
use serde::Serialize;
use tracing::{debug, warn};

use super::backend::{DigitEngineKind, DigitOcrEngine, GeneralOcrEngine, OcrEngineUsed, OcrError, OcrWord};
use super::normalize::normalize_digits;
use super::tesseract::TesseractBackend;
use crate::config::OcrSettings;
use crate::detection::BoundingBox;
use crate::imaging::{crop_with_pad, preprocess, PreprocessMode};

/// Everything OCR learned about one detection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OcrOutcome {
    /// ASCII digits only; empty when nothing was read.
    pub digits: String,
    pub raw_text: String,
    pub words: Vec<String>,
    pub engine_used: OcrEngineUsed,
}

impl OcrOutcome {
    /// The fields exposed on a detection. Digits-only mode hides the text.
    pub fn view(&self, digits_only: bool) -> OcrView {
        OcrView {
            ocr_digits: self.digits.clone(),
            ocr_digits_engine: self.engine_used,
            ocr_words: (!digits_only).then(|| self.words.clone()),
            ocr_text: (!digits_only).then(|| self.raw_text.clone()),
        }
    }
}

/// Serialized OCR fields of a detection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OcrView {
    pub ocr_digits: String,
    pub ocr_digits_engine: OcrEngineUsed,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr_words: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr_text: Option<String>,
}

/// Result of one cascade run over a page's regions.
#[derive(Debug, Clone, Default)]
pub struct CascadeOutput {
    /// One outcome per input region, in input order.
    pub outcomes: Vec<OcrOutcome>,
    /// `"{engine}: {error}"` for every engine run that failed.
    pub errors: Vec<String>,
}

/// How to crop and prepare regions for the digit engines.
#[derive(Debug, Clone, Copy)]
pub struct CropSettings {
    pub pad_ratio: f64,
    pub mode: PreprocessMode,
}

/// Digit engines tried in order, each only on regions still lacking digits,
/// followed by one general OCR pass over the whole page.
#[derive(Clone, Default)]
pub struct OcrCascade {
    digit_engines: Vec<Arc<dyn DigitOcrEngine>>,
    general: Option<Arc<dyn GeneralOcrEngine>>,
}

impl OcrCascade {
    pub fn new(
        digit_engines: Vec<Arc<dyn DigitOcrEngine>>,
        general: Option<Arc<dyn GeneralOcrEngine>>,
    ) -> Self {
        Self {
            digit_engines,
            general,
        }
    }

    /// Build the engines compiled into this binary from settings.
    pub fn from_settings(settings: &OcrSettings) -> Self {
        let tesseract = Arc::new(TesseractBackend::with_command(
            settings.tesseract_cmd.clone(),
            settings.language.clone(),
        ));

        let mut digit_engines: Vec<Arc<dyn DigitOcrEngine>> = Vec::new();
        #[cfg(feature = "ocr-ocrs")]
        digit_engines.push(Arc::new(super::OcrsBackend::new(settings.ocrs_model_dir.clone())));
        digit_engines.push(tesseract.clone());

        let general: Option<Arc<dyn GeneralOcrEngine>> = if settings.general_fallback {
            Some(tesseract)
        } else {
            None
        };

        Self::new(digit_engines, general)
    }

    pub fn digit_engines(&self) -> &[Arc<dyn DigitOcrEngine>] {
        &self.digit_engines
    }

    pub fn general_engine(&self) -> Option<&Arc<dyn GeneralOcrEngine>> {
        self.general.as_ref()
    }

    fn engine(&self, kind: DigitEngineKind) -> Option<&Arc<dyn DigitOcrEngine>> {
        self.digit_engines.iter().find(|e| e.kind() == kind)
    }

    /// Preferred engine first, then the rest of the default order.
    /// `auto` and unknown names give the default order.
    pub fn engine_order(preferred: &str) -> Vec<DigitEngineKind> {
        match DigitEngineKind::from_str(preferred) {
            Some(first) => std::iter::once(first)
                .chain(
                    DigitEngineKind::DEFAULT_ORDER
                        .into_iter()
                        .filter(|k| *k != first),
                )
                .collect(),
            None => DigitEngineKind::DEFAULT_ORDER.to_vec(),
        }
    }

    /// Read digits for every region of `page`.
    pub fn extract_digits(
        &self,
        page: &RgbImage,
        regions: &[BoundingBox],
        crop: CropSettings,
        preferred_engine: &str,
    ) -> CascadeOutput {
        let crops: Vec<GrayImage> = regions
            .iter()
            .map(|region| preprocess(&crop_with_pad(page, region, crop.pad_ratio), crop.mode))
            .collect();
        let mut outcomes = vec![OcrOutcome::default(); regions.len()];
        let mut errors = Vec::new();

        for kind in Self::engine_order(preferred_engine) {
            let pending = pending_indices(&outcomes);
            if pending.is_empty() {
                break;
            }
            let Some(engine) = self.engine(kind) else {
                debug!("Digit engine {} not compiled in, skipping", kind);
                continue;
            };
            if !engine.is_available() {
                errors.push(format!("{}: {}", kind, engine.availability_hint()));
                continue;
            }
            if let Err(e) = run_digit_engine(engine.as_ref(), &crops, &pending, &mut outcomes) {
                warn!("Digit engine {} failed: {}", kind, e);
                errors.push(format!("{}: {}", kind, e));
            }
        }

        let pending = pending_indices(&outcomes);
        if !pending.is_empty() {
            if let Some(general) = &self.general {
                match general.read_words(page) {
                    Ok(words) => {
                        for i in pending {
                            salvage_from_words(&words, &regions[i], &mut outcomes[i]);
                        }
                    }
                    Err(e) => {
                        warn!("General OCR failed: {}", e);
                        errors.push(format!("general: {}", e));
                    }
                }
            }
        }

        CascadeOutput { outcomes, errors }
    }
}

fn pending_indices(outcomes: &[OcrOutcome]) -> Vec<usize> {
    outcomes
        .iter()
        .enumerate()
        .filter(|(_, o)| o.digits.is_empty())
        .map(|(i, _)| i)
        .collect()
}

/// Run one engine over the pending crops. Stops at the first failure; the
/// outcomes it already filled in are kept.
fn run_digit_engine(
    engine: &dyn DigitOcrEngine,
    crops: &[GrayImage],
    pending: &[usize],
    outcomes: &mut [OcrOutcome],
) -> Result<(), OcrError> {
    let kind = engine.kind();
    for &i in pending {
        let crop = &crops[i];
        let outcome = &mut outcomes[i];
        if crop.width() == 0 || crop.height() == 0 {
            outcome.words.clear();
            outcome.raw_text.clear();
            continue;
        }

        let text = engine.recognize(crop)?;
        let trimmed = text.trim();
        let digits = engine.digits_from_text(&text);
        outcome.words = if trimmed.is_empty() {
            Vec::new()
        } else {
            vec![trimmed.to_string()]
        };
        outcome.raw_text = trimmed.to_string();
        if !digits.is_empty() {
            outcome.engine_used = kind.into();
        }
        outcome.digits = digits;
    }
    Ok(())
}

/// Words whose centers fall inside `region`, top-to-bottom then left-to-right.
pub fn words_inside<'a>(words: &'a [OcrWord], region: &BoundingBox) -> Vec<&'a OcrWord> {
    let mut inside: Vec<&OcrWord> = words
        .iter()
        .filter(|w| {
            let (cx, cy) = w.center();
            region.contains(cx, cy)
        })
        .collect();
    inside.sort_by(|a, b| {
        let (ax, ay) = a.center();
        let (bx, by) = b.center();
        ay.partial_cmp(&by)
            .unwrap_or(Ordering::Equal)
            .then(ax.partial_cmp(&bx).unwrap_or(Ordering::Equal))
    });
    inside
}

fn salvage_from_words(words: &[OcrWord], region: &BoundingBox, outcome: &mut OcrOutcome) {
    let inside = words_inside(words, region);
    if inside.is_empty() {
        return;
    }
    outcome.words = inside.iter().map(|w| w.text.clone()).collect();
    outcome.raw_text = outcome.words.join(" ");
    let digits = normalize_digits(&outcome.raw_text);
    if !digits.is_empty() {
        outcome.digits = digits;
        outcome.engine_used = OcrEngineUsed::General;
    }
}
