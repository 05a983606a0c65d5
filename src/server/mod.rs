//! HTTP API for folio verification.
//!
//! - `GET /health` for liveness checks
//! - `POST /api/foliation` with a PDF body, returning the full report

mod handlers;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::{Config, PipelineParams};
use crate::error::FoliationError;
use crate::pipeline::FoliationPipeline;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<FoliationPipeline>,
    /// Parameters used when a request does not override them.
    pub defaults: PipelineParams,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(pipeline: FoliationPipeline, defaults: PipelineParams, max_upload_bytes: usize) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            defaults,
            max_upload_bytes,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, FoliationError> {
        let pipeline = FoliationPipeline::from_config(config)?;
        Ok(Self::new(
            pipeline,
            config.pipeline.clone(),
            config.server.max_upload_bytes(),
        ))
    }
}

/// Start the web server.
pub async fn serve(config: &Config, host: &str, port: u16) -> anyhow::Result<()> {
    let state = AppState::from_config(config)?;
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
