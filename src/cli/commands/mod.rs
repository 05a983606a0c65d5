//! CLI parser and dispatch to command-specific modules.

mod check;
mod engines;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use foliacheck::Config;

pub use check::ParamArgs;

#[derive(Parser)]
#[command(name = "foliacheck")]
#[command(about = "Verify folio stamps in scanned PDF documents")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Check every page of a PDF and print the foliation report as JSON
    Check {
        /// PDF document to check
        pdf: PathBuf,

        #[command(flatten)]
        params: ParamArgs,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write annotated page images into this directory
        #[arg(long)]
        annotate: Option<PathBuf>,
    },

    /// Start the HTTP API
    Serve {
        /// Address to bind (default from config, 127.0.0.1)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (default from config, 8080)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show the configured detector and OCR engine availability
    Engines,
}

/// Parse arguments and run the selected command.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Check {
            pdf,
            params,
            output,
            annotate,
        } => {
            check::cmd_check(
                &config,
                &pdf,
                params.overrides(),
                output.as_deref(),
                annotate.as_deref(),
            )
            .await
        }
        Commands::Serve { host, port } => serve::cmd_serve(&config, host, port).await,
        Commands::Engines => engines::cmd_engines(&config),
    }
}
