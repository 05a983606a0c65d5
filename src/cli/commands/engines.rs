//! Engine availability report.

use console::style;

use foliacheck::config::DetectorConfig;
use foliacheck::detection::build_detector;
use foliacheck::ocr::{OcrCascade, OcrEngineUsed};
use foliacheck::raster::{PopplerRasterizer, Rasterizer};
use foliacheck::Config;

fn status(available: bool) -> console::StyledObject<&'static str> {
    if available {
        style("✓ available").green()
    } else {
        style("✗ not available").red()
    }
}

/// Print what the current configuration would run with.
pub fn cmd_engines(config: &Config) -> anyhow::Result<()> {
    println!("\n{}", style("Detector").bold());
    println!("{}", "-".repeat(50));
    match &config.detector {
        DetectorConfig::Local(local) => {
            println!("  {:<15} {}", "backend", "local (ONNX)");
            println!("  {:<15} {}", "model", local.model_path.display());
        }
        DetectorConfig::Remote(remote) => {
            println!("  {:<15} {}", "backend", "remote");
            println!("  {:<15} {}/{}", "endpoint", remote.api_url, remote.model_id);
        }
    }
    match build_detector(&config.detector) {
        Ok(detector) => println!("  {:<15} {}", detector.name(), status(true)),
        Err(e) => {
            println!("  {:<15} {}", config.detector.backend_name(), status(false));
            println!("                  {}", style(e).dim());
        }
    }

    println!("\n{}", style("Digit engines (cascade order)").bold());
    println!("{}", "-".repeat(50));
    let cascade = OcrCascade::from_settings(&config.ocr);
    for engine in cascade.digit_engines() {
        println!("  {:<15} {}", engine.kind().as_str(), status(engine.is_available()));
        println!("                  {}", style(engine.availability_hint()).dim());
    }

    println!("\n{}", style("General fallback").bold());
    println!("{}", "-".repeat(50));
    match cascade.general_engine() {
        Some(engine) => println!(
            "  {:<15} {} ({})",
            engine.name(),
            status(engine.is_available()),
            OcrEngineUsed::General
        ),
        None => println!("  {}", style("disabled").dim()),
    }

    println!("\n{}", style("Rasterizer").bold());
    println!("{}", "-".repeat(50));
    let poppler = match &config.poppler_dir {
        Some(dir) => PopplerRasterizer::with_bin_dir(dir),
        None => PopplerRasterizer::new(),
    };
    println!("  {:<15} {}", "poppler", status(poppler.is_available()));
    if !poppler.is_available() {
        println!(
            "                  {}",
            style("Install poppler-utils (pdfinfo, pdftoppm)").dim()
        );
    }

    if let Some(path) = &config.source_path {
        println!("\n{} {}", style("Config:").dim(), path.display());
    }
    println!();

    Ok(())
}
