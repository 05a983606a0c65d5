//! Run-level errors.
//!
//! Only configuration and ingest failures abort a run. Everything that goes
//! wrong while handling a single page is folded into that page's result.

use thiserror::Error;

use crate::detection::DetectionError;
use crate::raster::RasterError;

/// Errors that prevent a run from producing any report.
#[derive(Debug, Error)]
pub enum FoliationError {
    /// An engine or model could not be constructed.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The document could not be opened or rasterized.
    #[error("Ingest error: {0}")]
    Ingest(String),
}

impl FoliationError {
    /// HTTP-ish classification used by the API layer.
    pub fn is_client_error(&self) -> bool {
        matches!(self, FoliationError::Ingest(_))
    }
}

/// Failure while processing one page. Never escapes the page processor.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("rasterization failed: {0}")]
    Raster(#[from] RasterError),

    #[error("detection failed: {0}")]
    Detection(#[from] DetectionError),
}
