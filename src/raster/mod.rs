//! Page rasterization hand-off.
//!
//! The pipeline consumes rasterized pages; it never decodes PDF itself.
//! The production implementation shells out to Poppler.

mod poppler;

use std::path::Path;

use image::RgbImage;
use thiserror::Error;

pub use poppler::{parse_page_count, PopplerRasterizer};

/// Errors from rasterizers.
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("Rasterizer not available: {0}")]
    NotAvailable(String),

    #[error("Rasterization failed: {0}")]
    Failed(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One rendered page. Dropped once the page has been processed.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// 1-based position of the page in the document.
    pub page_number: u32,
    pub pixels: RgbImage,
}

impl PageImage {
    pub fn new(page_number: u32, pixels: RgbImage) -> Self {
        Self {
            page_number,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

/// Converts a document on disk into page images, one page at a time.
pub trait Rasterizer: Send + Sync {
    /// Number of pages in the document.
    fn page_count(&self, document: &Path) -> Result<u32, RasterError>;

    /// Render a single 1-based page at the given resolution.
    fn render_page(&self, document: &Path, page: u32, dpi: u32) -> Result<PageImage, RasterError>;

    /// Whether the external tools this rasterizer needs are installed.
    fn is_available(&self) -> bool {
        true
    }
}
