//! foliacheck - folio stamp verification for scanned PDF documents.
//!
//! Every page of a PDF is rasterized, folio regions are located by a
//! detection model, the digits inside each region are read by a cascade of
//! OCR engines, and the reading is compared against the page's position in
//! the document.

pub mod config;
pub mod detection;
pub mod error;
pub mod foliation;
pub mod http_client;
pub mod imaging;
pub mod ocr;
pub mod pipeline;
pub mod raster;
pub mod server;

pub use config::{Config, ParamOverrides, PipelineParams};
pub use error::{FoliationError, PageError};
pub use foliation::{compare_foliation, FoliationCheck};
pub use pipeline::{FoliationPipeline, FoliationReport, PageResult, RunSummary};
