//! Document check command.

use std::path::Path;
use std::time::Duration;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use foliacheck::imaging::annotate::save_annotated;
use foliacheck::{Config, FoliationPipeline, FoliationReport, ParamOverrides};

/// Pipeline parameter flags. Anything not given falls back to the config.
#[derive(Args, Debug, Default)]
pub struct ParamArgs {
    /// Rasterization resolution
    #[arg(long)]
    dpi: Option<u32>,

    /// Detection model input size
    #[arg(long)]
    imgsz: Option<u32>,

    /// Minimum detection confidence to keep a region
    #[arg(long)]
    conf: Option<f64>,

    /// Minimum detection confidence to run OCR on a region
    #[arg(long)]
    min_confidence: Option<f64>,

    /// Skip OCR entirely
    #[arg(long)]
    no_ocr: bool,

    /// Include raw OCR text and words in the report
    #[arg(long)]
    full_ocr: bool,

    /// Preferred first digit engine (ocrs, tesseract, auto)
    #[arg(long)]
    digits_engine: Option<String>,

    /// Crop preprocessing (strong, light, none)
    #[arg(long)]
    digits_preprocess: Option<String>,

    /// Crop padding as a fraction of the box size
    #[arg(long)]
    pad_ratio: Option<f64>,
}

impl ParamArgs {
    pub fn overrides(&self) -> ParamOverrides {
        ParamOverrides {
            dpi: self.dpi,
            imgsz: self.imgsz,
            conf: self.conf,
            min_confidence: self.min_confidence,
            ocr: self.no_ocr.then_some(false),
            digits_only: self.full_ocr.then_some(false),
            digits_engine: self.digits_engine.clone(),
            digits_preprocess: self.digits_preprocess.clone(),
            pad_ratio: self.pad_ratio,
        }
    }
}

/// Run the pipeline over one PDF and emit the report.
pub async fn cmd_check(
    config: &Config,
    pdf: &Path,
    overrides: ParamOverrides,
    output: Option<&Path>,
    annotate: Option<&Path>,
) -> anyhow::Result<()> {
    let pipeline = FoliationPipeline::from_config(config)?;
    let params = config.pipeline.merged(&overrides);

    if let Some(dir) = annotate {
        tokio::fs::create_dir_all(dir).await?;
    }

    let stem = pdf
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("page")
        .to_string();
    let pdf = pdf.to_path_buf();
    let annotate = annotate.map(Path::to_path_buf);

    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    progress.set_message(format!("Checking {}", pdf.display()));
    progress.enable_steady_tick(Duration::from_millis(120));

    let bar = progress.clone();
    let report = tokio::task::spawn_blocking(move || -> anyhow::Result<FoliationReport> {
        let report = pipeline.run_with_observer(&pdf, &params, |page, result| {
            bar.set_message(format!(
                "Page {}: {} detections",
                page.page_number,
                result.detections.len()
            ));
            if let Some(dir) = &annotate {
                if let Err(e) =
                    save_annotated(dir, &stem, page.page_number, &page.pixels, &result.detections)
                {
                    warn!("Failed to write annotation for page {}: {}", page.page_number, e);
                }
            }
        })?;
        Ok(report)
    })
    .await??;
    progress.finish_and_clear();

    let json = serde_json::to_string_pretty(&report)?;
    match output {
        Some(path) => {
            tokio::fs::write(path, json).await?;
            eprintln!("{} Report written to {}", style("✓").green(), path.display());
        }
        None => println!("{}", json),
    }

    print_summary(&report);
    Ok(())
}

fn print_summary(report: &FoliationReport) {
    let summary = &report.summary;
    eprintln!(
        "{} {} pages, {} detections, {} exact matches, {} pages without a match, average confidence {:.3}",
        style("→").cyan(),
        summary.total_pages,
        summary.total_detections,
        summary.exact_matches,
        summary.pages_without_match,
        summary.average_confidence
    );

    let failed: Vec<_> = report.pages.iter().filter(|p| p.error.is_some()).collect();
    for page in failed {
        eprintln!(
            "  {} page {}: {}",
            style("✗").red(),
            page.page_number,
            page.error.as_deref().unwrap_or_default()
        );
    }
}
