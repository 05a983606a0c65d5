//! Image operations on page rasters: region crops, OCR preprocessing and
//! review annotations.

pub mod annotate;
mod crop;
mod preprocess;

pub use crop::crop_with_pad;
pub use preprocess::{clahe, preprocess, PreprocessMode};
