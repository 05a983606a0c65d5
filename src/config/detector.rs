//! Detection backend selection.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const DEFAULT_API_URL: &str = "https://detect.roboflow.com";
pub const DEFAULT_MODEL_ID: &str = "foliacionpdf-u6br4/2";

/// Which detection backend to build, resolved once when the pipeline is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum DetectorConfig {
    /// YOLO-style ONNX export run in-process.
    Local(LocalDetectorConfig),
    /// Hosted inference API.
    Remote(RemoteDetectorConfig),
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig::Remote(RemoteDetectorConfig::default())
    }
}

impl DetectorConfig {
    pub fn backend_name(&self) -> &'static str {
        match self {
            DetectorConfig::Local(_) => "local",
            DetectorConfig::Remote(_) => "remote",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalDetectorConfig {
    pub model_path: PathBuf,
    /// Labels indexed by class id. Ids without a name are reported as numbers.
    #[serde(default)]
    pub class_names: Vec<String>,
    #[serde(default = "default_iou_threshold")]
    pub iou_threshold: f32,
    #[serde(default = "default_max_detections")]
    pub max_detections: usize,
}

impl LocalDetectorConfig {
    pub fn new(model_path: PathBuf) -> Self {
        Self {
            model_path,
            class_names: Vec::new(),
            iou_threshold: default_iou_threshold(),
            max_detections: default_max_detections(),
        }
    }
}

fn default_iou_threshold() -> f32 {
    0.7
}

fn default_max_detections() -> usize {
    300
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteDetectorConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model_id")]
    pub model_id: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub max_retries: u32,
}

impl Default for RemoteDetectorConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: None,
            model_id: default_model_id(),
            timeout_secs: default_timeout_secs(),
            max_retries: 0,
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_model_id() -> String {
    DEFAULT_MODEL_ID.to_string()
}

fn default_timeout_secs() -> u64 {
    60
}
