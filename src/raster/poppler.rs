//! Poppler-backed rasterizer (`pdfinfo` + `pdftoppm`).

use std::io::ErrorKind;
use std::path::Path;
use std::process::Command;

use tempfile::TempDir;
use tracing::debug;

use super::{PageImage, RasterError, Rasterizer};
use crate::ocr::model_utils::check_binary;

const POPPLER_NOT_FOUND: &str = "poppler-utils not installed. Install with: apt install poppler-utils";

/// Rasterizer that renders pages with Poppler's command-line tools.
#[derive(Debug, Clone)]
pub struct PopplerRasterizer {
    pdfinfo_cmd: String,
    pdftoppm_cmd: String,
}

impl PopplerRasterizer {
    pub fn new() -> Self {
        Self {
            pdfinfo_cmd: "pdfinfo".to_string(),
            pdftoppm_cmd: "pdftoppm".to_string(),
        }
    }

    /// Use binaries from a specific Poppler installation directory.
    pub fn with_bin_dir(dir: &Path) -> Self {
        Self {
            pdfinfo_cmd: dir.join("pdfinfo").to_string_lossy().into_owned(),
            pdftoppm_cmd: dir.join("pdftoppm").to_string_lossy().into_owned(),
        }
    }
}

impl Default for PopplerRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

fn spawn_error(e: std::io::Error) -> RasterError {
    if e.kind() == ErrorKind::NotFound {
        RasterError::NotAvailable(POPPLER_NOT_FOUND.to_string())
    } else {
        RasterError::Io(e)
    }
}

/// Extract the page count from `pdfinfo` output.
pub fn parse_page_count(pdfinfo_output: &str) -> Option<u32> {
    pdfinfo_output
        .lines()
        .find(|line| line.starts_with("Pages:"))
        .and_then(|line| line.split(':').nth(1))
        .and_then(|count| count.trim().parse::<u32>().ok())
}

impl Rasterizer for PopplerRasterizer {
    fn page_count(&self, document: &Path) -> Result<u32, RasterError> {
        let output = Command::new(&self.pdfinfo_cmd)
            .arg(document)
            .output()
            .map_err(spawn_error)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RasterError::Failed(format!(
                "pdfinfo failed: {}",
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_page_count(&stdout)
            .ok_or_else(|| RasterError::Failed("pdfinfo reported no page count".to_string()))
    }

    fn render_page(&self, document: &Path, page: u32, dpi: u32) -> Result<PageImage, RasterError> {
        let temp_dir = TempDir::new()?;
        let output_prefix = temp_dir.path().join("page");
        let page_str = page.to_string();
        let dpi_str = dpi.to_string();

        // -singlefile drops the page-number suffix so the output path is fixed.
        let output = Command::new(&self.pdftoppm_cmd)
            .args(["-png", "-singlefile", "-r", dpi_str.as_str(), "-f", page_str.as_str(), "-l", page_str.as_str()])
            .arg(document)
            .arg(&output_prefix)
            .output()
            .map_err(spawn_error)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RasterError::Failed(format!(
                "pdftoppm failed on page {}: {}",
                page,
                stderr.trim()
            )));
        }

        let image_path = temp_dir.path().join("page.png");
        if !image_path.exists() {
            return Err(RasterError::Failed(format!(
                "No image generated for page {}",
                page
            )));
        }

        let pixels = image::open(&image_path)?.to_rgb8();
        debug!(
            "Rendered page {} at {} dpi ({}x{})",
            page,
            dpi,
            pixels.width(),
            pixels.height()
        );
        Ok(PageImage::new(page, pixels))
    }

    fn is_available(&self) -> bool {
        check_binary(&self.pdfinfo_cmd) && check_binary(&self.pdftoppm_cmd)
    }
}
