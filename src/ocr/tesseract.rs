//! Tesseract OCR engine.
//!
//! Runs the `tesseract` command line tool on a scratch PNG. Crops are read
//! as a single text line restricted to digits; whole pages are read as
//! sparse text with TSV word boxes.

use std::path::Path;
use std::process::Command;

use image::{GrayImage, RgbImage};
use tempfile::TempDir;
use tracing::debug;

use super::backend::{DigitEngineKind, DigitOcrEngine, GeneralOcrEngine, OcrError, OcrWord};
use super::model_utils::check_binary;

const DIGIT_ARGS: [&str; 4] = ["--psm", "7", "-c", "tessedit_char_whitelist=0123456789"];
const PAGE_ARGS: [&str; 3] = ["--psm", "11", "tsv"];

/// Tesseract OCR engine.
#[derive(Debug, Clone)]
pub struct TesseractBackend {
    command: String,
    language: String,
}

impl TesseractBackend {
    pub fn new() -> Self {
        Self::with_command("tesseract", "eng")
    }

    /// Use a specific executable and language.
    pub fn with_command(command: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            language: language.into(),
        }
    }

    /// Run Tesseract on an image file.
    fn run_tesseract(&self, image_path: &Path, extra_args: &[&str]) -> Result<String, OcrError> {
        let output = Command::new(&self.command)
            .arg(image_path)
            .arg("stdout")
            .args(["-l", self.language.as_str()])
            .args(extra_args)
            .output();

        match output {
            Ok(output) => {
                if output.status.success() {
                    Ok(String::from_utf8_lossy(&output.stdout).to_string())
                } else {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    Err(OcrError::OcrFailed(format!("tesseract failed: {}", stderr.trim())))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(OcrError::BackendNotAvailable(
                format!("{} not found (install tesseract-ocr)", self.command),
            )),
            Err(e) => Err(OcrError::Io(e)),
        }
    }

    /// Write `save` output into a scratch dir and run Tesseract on it.
    fn run_on_image<F>(&self, save: F, extra_args: &[&str]) -> Result<String, OcrError>
    where
        F: FnOnce(&Path) -> image::ImageResult<()>,
    {
        let temp_dir = TempDir::new()?;
        let image_path = temp_dir.path().join("input.png");
        save(&image_path).map_err(|e| OcrError::ImageError(e.to_string()))?;
        self.run_tesseract(&image_path, extra_args)
    }
}

impl Default for TesseractBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse `tesseract ... tsv` output into word boxes.
///
/// Keeps word-level rows (level 5) with non-blank text.
pub fn parse_tsv(tsv: &str) -> Vec<OcrWord> {
    tsv.lines()
        .skip_while(|line| line.starts_with("level"))
        .filter_map(|line| {
            let cols: Vec<&str> = line.split('\t').collect();
            if cols.len() < 12 || cols[0] != "5" {
                return None;
            }
            let text = cols[11].trim();
            if text.is_empty() {
                return None;
            }
            Some(OcrWord {
                text: text.to_string(),
                left: cols[6].parse().ok()?,
                top: cols[7].parse().ok()?,
                width: cols[8].parse().ok()?,
                height: cols[9].parse().ok()?,
            })
        })
        .collect()
}

impl DigitOcrEngine for TesseractBackend {
    fn kind(&self) -> DigitEngineKind {
        DigitEngineKind::Tesseract
    }

    fn is_available(&self) -> bool {
        check_binary(&self.command)
    }

    fn availability_hint(&self) -> String {
        if check_binary(&self.command) {
            "Tesseract is available".to_string()
        } else {
            "Tesseract not installed. Install with: apt install tesseract-ocr (or set TESSERACT_EXE)"
                .to_string()
        }
    }

    fn recognize(&self, crop: &GrayImage) -> Result<String, OcrError> {
        let text = self.run_on_image(|path| crop.save(path), &DIGIT_ARGS)?;
        debug!("tesseract read {:?}", text.trim());
        Ok(text)
    }
}

impl GeneralOcrEngine for TesseractBackend {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn is_available(&self) -> bool {
        check_binary(&self.command)
    }

    fn read_words(&self, page: &RgbImage) -> Result<Vec<OcrWord>, OcrError> {
        let tsv = self.run_on_image(|path| page.save(path), &PAGE_ARGS)?;
        Ok(parse_tsv(&tsv))
    }
}
