//! Configuration loading.
//!
//! A config file is optional. It is discovered with `prefer` (or passed via
//! `--config`), parsed according to its extension, and then overlaid with
//! environment variables. Environment variables are read only here.

mod detector;
mod params;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub use detector::{
    DetectorConfig, LocalDetectorConfig, RemoteDetectorConfig, DEFAULT_API_URL, DEFAULT_MODEL_ID,
};
pub use params::{ParamOverrides, PipelineParams};

/// Name used for config file discovery (`foliacheck.toml`, `foliacheck.yaml`, ...).
pub const CONFIG_NAME: &str = "foliacheck";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {format} config: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },
}

/// OCR engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    /// Tesseract executable name or path.
    pub tesseract_cmd: String,
    pub language: String,
    /// Directory holding the ocrs `.rten` models. Searched for when unset.
    pub ocrs_model_dir: Option<PathBuf>,
    /// Run the whole-page fallback for regions the digit engines missed.
    pub general_fallback: bool,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            tesseract_cmd: "tesseract".to_string(),
            language: "eng".to_string(),
            ocrs_model_dir: None,
            general_fallback: true,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_mb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            max_upload_mb: 50,
        }
    }
}

impl ServerConfig {
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub detector: DetectorConfig,
    pub ocr: OcrSettings,
    /// Defaults for every run; callers override per request.
    pub pipeline: PipelineParams,
    pub server: ServerConfig,
    /// Directory containing `pdfinfo` and `pdftoppm`, if not on PATH.
    pub poppler_dir: Option<PathBuf>,
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load the explicit config file if given, otherwise discover one.
    /// Falls back to defaults when nothing is found.
    pub async fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => Self::load_from_path(path).await?,
            None => Self::discover().await,
        };
        config.apply_env_overrides();
        Ok(config)
    }

    async fn discover() -> Self {
        match prefer::load(CONFIG_NAME).await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => match Self::load_from_path(path).await {
                    Ok(config) => config,
                    Err(e) => {
                        warn!("Ignoring config file {}: {}", path.display(), e);
                        Self::default()
                    }
                },
                None => Self::default(),
            },
            Err(_) => {
                debug!("No {} config file found, using defaults", CONFIG_NAME);
                Self::default()
            }
        }
    }

    /// Load configuration from a specific file path.
    /// The format is chosen by extension: TOML, YAML, otherwise JSON.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let mut config = Self::parse(&contents, ext)?;
        config.source_path = Some(path.to_path_buf());
        if let Some(base_dir) = config.base_dir() {
            config.resolve_paths(&base_dir);
        }
        Ok(config)
    }

    /// Parse config text in the format named by `ext`.
    pub fn parse(contents: &str, ext: &str) -> Result<Self, ConfigError> {
        match ext {
            "toml" => toml::from_str(contents).map_err(|e| ConfigError::Parse {
                format: "TOML",
                message: e.to_string(),
            }),
            "yaml" | "yml" => serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse {
                format: "YAML",
                message: e.to_string(),
            }),
            _ => serde_json::from_str(contents).map_err(|e| ConfigError::Parse {
                format: "JSON",
                message: e.to_string(),
            }),
        }
    }

    /// The config file's directory, used for resolving relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    fn resolve_paths(&mut self, base_dir: &Path) {
        if let DetectorConfig::Local(ref mut local) = self.detector {
            local.model_path = resolve_path(&local.model_path, base_dir);
        }
        if let Some(ref dir) = self.ocr.ocrs_model_dir {
            self.ocr.ocrs_model_dir = Some(resolve_path(dir, base_dir));
        }
        if let Some(ref dir) = self.poppler_dir {
            self.poppler_dir = Some(resolve_path(dir, base_dir));
        }
    }

    /// Overlay process environment variables.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Overlay values from `lookup`, ignoring empty strings.
    ///
    /// `MODEL_PATH` switches the detector to the local backend; the remote
    /// variables only apply while the remote backend is selected.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(model_path) = get("MODEL_PATH") {
            let model_path = PathBuf::from(shellexpand::tilde(&model_path).as_ref());
            match self.detector {
                DetectorConfig::Local(ref mut local) => local.model_path = model_path,
                DetectorConfig::Remote(_) => {
                    self.detector = DetectorConfig::Local(LocalDetectorConfig::new(model_path))
                }
            }
        }

        if let DetectorConfig::Remote(ref mut remote) = self.detector {
            if let Some(model_id) = get("MODEL_ID") {
                remote.model_id = model_id;
            }
            if let Some(api_key) = get("ROBOFLOW_API_KEY") {
                remote.api_key = Some(api_key);
            }
            if let Some(api_url) = get("ROBOFLOW_API_URL") {
                remote.api_url = api_url;
            }
        }

        if let Some(cmd) = get("TESSERACT_EXE") {
            self.ocr.tesseract_cmd = cmd;
        }
        if let Some(dir) = get("OCRS_MODEL_DIR") {
            self.ocr.ocrs_model_dir = Some(PathBuf::from(shellexpand::tilde(&dir).as_ref()));
        }
    }
}

/// Resolve a path that may be relative to the config file.
/// Absolute paths are kept, `~` is expanded, relative paths join `base_dir`.
pub fn resolve_path(path: &Path, base_dir: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    let expanded = shellexpand::tilde(raw.as_ref());
    let path = Path::new(expanded.as_ref());

    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}
