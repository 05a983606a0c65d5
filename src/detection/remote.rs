//! Hosted inference API detector.

use std::io::Cursor;
use std::time::Duration;

use base64::Engine;
use image::RgbImage;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{BoundingBox, Detection, DetectionEngine, DetectionError};
use crate::config::RemoteDetectorConfig;
use crate::error::FoliationError;
use crate::http_client::{backoff_delay, block_on_async, build_client};

const RETRY_BASE_MS: u64 = 1000;

#[derive(Debug, Deserialize)]
struct PredictionResponse {
    #[serde(default)]
    predictions: Option<Vec<RemotePrediction>>,
}

#[derive(Debug, Deserialize)]
struct RemotePrediction {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    confidence: f64,
    #[serde(default)]
    class: Option<String>,
    #[serde(default)]
    class_id: Option<i64>,
}

/// Parse an inference API response body into detections.
///
/// A missing, null or empty `predictions` list yields no detections.
/// Predictions below `min_confidence` are dropped.
pub fn parse_predictions(body: &str, min_confidence: f64) -> Result<Vec<Detection>, DetectionError> {
    let response: PredictionResponse = serde_json::from_str(body)
        .map_err(|e| DetectionError::InvalidResponse(e.to_string()))?;

    Ok(response
        .predictions
        .unwrap_or_default()
        .into_iter()
        .filter(|p| p.confidence >= min_confidence)
        .map(|p| {
            let label = p
                .class
                .or_else(|| p.class_id.map(|id| id.to_string()))
                .unwrap_or_else(|| "unknown".to_string());
            Detection::new(
                BoundingBox::new(p.x, p.y, p.width, p.height),
                p.confidence,
                label,
                p.class_id.unwrap_or(0),
            )
        })
        .collect())
}

/// Detector that posts each page to a hosted model endpoint.
pub struct RemoteDetector {
    config: RemoteDetectorConfig,
    client: reqwest::Client,
}

impl RemoteDetector {
    pub fn new(config: RemoteDetectorConfig) -> Result<Self, FoliationError> {
        if config.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            return Err(FoliationError::Configuration(
                "remote detector needs an API key (set ROBOFLOW_API_KEY or detector.api_key)"
                    .to_string(),
            ));
        }
        let client = build_client(Duration::from_secs(config.timeout_secs))
            .map_err(|e| FoliationError::Configuration(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}",
            self.config.api_url.trim_end_matches('/'),
            self.config.model_id
        )
    }

    fn encode_page(image: &RgbImage) -> Result<String, DetectionError> {
        let mut jpeg = Vec::new();
        image.write_to(&mut Cursor::new(&mut jpeg), image::ImageFormat::Jpeg)?;
        Ok(base64::engine::general_purpose::STANDARD.encode(&jpeg))
    }

    async fn post_once(&self, payload: &str, confidence_pct: u32) -> Result<String, (bool, DetectionError)> {
        let api_key = self.config.api_key.as_deref().unwrap_or_default();
        let confidence = confidence_pct.to_string();
        let response = self
            .client
            .post(self.endpoint())
            .query(&[("api_key", api_key), ("confidence", confidence.as_str())])
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(payload.to_string())
            .send()
            .await
            .map_err(|e| (true, DetectionError::Request(e.to_string())))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| (true, DetectionError::Request(e.to_string())))?;

        if status.is_success() {
            Ok(body)
        } else {
            let retryable = status.is_server_error() || status.as_u16() == 429;
            Err((
                retryable,
                DetectionError::Request(format!("HTTP {}: {}", status.as_u16(), body.trim())),
            ))
        }
    }

    async fn post_with_retries(&self, payload: String, confidence_pct: u32) -> Result<String, DetectionError> {
        let mut attempt = 0;
        loop {
            match self.post_once(&payload, confidence_pct).await {
                Ok(body) => return Ok(body),
                Err((retryable, err)) => {
                    if !retryable || attempt >= self.config.max_retries {
                        return Err(err);
                    }
                    let wait = backoff_delay(attempt, RETRY_BASE_MS);
                    warn!(
                        "Detection request failed (attempt {}): {}, retrying in {:?}",
                        attempt + 1,
                        err,
                        wait
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl DetectionEngine for RemoteDetector {
    fn name(&self) -> &'static str {
        "remote"
    }

    // The hosted model resizes on its side, so `target_size` is not sent.
    fn detect(
        &self,
        image: &RgbImage,
        _target_size: u32,
        min_confidence: f64,
    ) -> Result<Vec<Detection>, DetectionError> {
        let payload = Self::encode_page(image)?;
        let confidence_pct = (min_confidence.clamp(0.0, 1.0) * 100.0).round() as u32;
        debug!(
            "Posting {}x{} page to {}",
            image.width(),
            image.height(),
            self.endpoint()
        );

        let body = block_on_async(self.post_with_retries(payload, confidence_pct), || {
            DetectionError::Request("No tokio runtime available for remote detection".to_string())
        })?;
        parse_predictions(&body, min_confidence)
    }
}
