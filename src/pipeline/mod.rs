//! Document-level pipeline: rasterize every page, process it, summarize.

mod page;
mod report;

pub use page::{apply_confidence_gate, ImageDimensions, PageProcessor, PageResult};
pub use report::{summarize, FoliationReport, RunSummary};

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{Config, PipelineParams};
use crate::detection::{build_detector, DetectionEngine};
use crate::error::{FoliationError, PageError};
use crate::ocr::OcrCascade;
use crate::raster::{PageImage, PopplerRasterizer, Rasterizer};

/// The assembled pipeline. Engines are built once and shared across runs.
#[derive(Clone)]
pub struct FoliationPipeline {
    rasterizer: Arc<dyn Rasterizer>,
    processor: PageProcessor,
}

impl FoliationPipeline {
    pub fn new(
        rasterizer: Arc<dyn Rasterizer>,
        detector: Arc<dyn DetectionEngine>,
        cascade: Arc<OcrCascade>,
    ) -> Self {
        Self {
            rasterizer,
            processor: PageProcessor::new(detector, cascade),
        }
    }

    /// Build the engines named by the configuration.
    pub fn from_config(config: &Config) -> Result<Self, FoliationError> {
        let rasterizer: Arc<dyn Rasterizer> = match &config.poppler_dir {
            Some(dir) => Arc::new(PopplerRasterizer::with_bin_dir(dir)),
            None => Arc::new(PopplerRasterizer::new()),
        };
        let detector = build_detector(&config.detector)?;
        let cascade = Arc::new(OcrCascade::from_settings(&config.ocr));
        Ok(Self::new(rasterizer, detector, cascade))
    }

    pub fn rasterizer(&self) -> &Arc<dyn Rasterizer> {
        &self.rasterizer
    }

    pub fn processor(&self) -> &PageProcessor {
        &self.processor
    }

    /// Run over an in-memory PDF.
    pub fn run(&self, pdf: &[u8], params: &PipelineParams) -> Result<FoliationReport, FoliationError> {
        if pdf.is_empty() {
            return Err(FoliationError::Ingest("document is empty".to_string()));
        }

        let mut file = tempfile::Builder::new()
            .prefix("foliacheck-")
            .suffix(".pdf")
            .tempfile()
            .map_err(|e| FoliationError::Ingest(format!("failed to stage document: {}", e)))?;
        file.write_all(pdf)
            .and_then(|_| file.flush())
            .map_err(|e| FoliationError::Ingest(format!("failed to stage document: {}", e)))?;

        self.run_path(file.path(), params)
    }

    /// Run over a PDF on disk.
    pub fn run_path(&self, path: &Path, params: &PipelineParams) -> Result<FoliationReport, FoliationError> {
        self.run_with_observer(path, params, |_, _| {})
    }

    /// Run over a PDF on disk, handing every rendered page and its result
    /// to `observer` before the raster is dropped.
    pub fn run_with_observer<F>(
        &self,
        path: &Path,
        params: &PipelineParams,
        mut observer: F,
    ) -> Result<FoliationReport, FoliationError>
    where
        F: FnMut(&PageImage, &PageResult),
    {
        if !path.is_file() {
            return Err(FoliationError::Ingest(format!(
                "{} is not a readable file",
                path.display()
            )));
        }

        let page_count = self
            .rasterizer
            .page_count(path)
            .map_err(|e| FoliationError::Ingest(e.to_string()))?;
        info!("Processing {} ({} pages)", path.display(), page_count);

        let mut pages = Vec::with_capacity(page_count as usize);
        for page_number in 1..=page_count {
            let result = match self.rasterizer.render_page(path, page_number, params.dpi) {
                Ok(page) => {
                    let result = self.processor.process(&page, params);
                    observer(&page, &result);
                    result
                }
                Err(e) => PageResult::failed(page_number, &PageError::from(e), None),
            };
            if let Some(error) = &result.error {
                warn!("Page {} failed: {}", page_number, error);
            }
            pages.push(result);
        }

        let report = FoliationReport::new(pages);
        info!(
            "Finished {}: {} detections, {} exact matches",
            path.display(),
            report.summary.total_detections,
            report.summary.exact_matches
        );
        Ok(report)
    }
}
