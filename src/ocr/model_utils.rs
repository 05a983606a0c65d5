//! Binary discovery and on-disk model files for OCR engines.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::info;

use super::backend::OcrError;

/// Check if a binary is available, either on PATH or as a direct path.
pub fn check_binary(name: &str) -> bool {
    which::which(name).is_ok()
}

/// One model file and the URL it is fetched from.
pub struct ModelFile {
    pub url: &'static str,
    pub filename: &'static str,
}

/// The set of files an engine needs, kept together in one directory.
pub struct ModelStore {
    /// Directory name under the data dir, e.g. `ocrs`.
    pub subdir: &'static str,
    pub files: &'static [ModelFile],
}

/// Download commands tried in order, each followed by the destination and URL.
const DOWNLOADERS: [(&str, &[&str]); 2] = [("curl", &["-fsSL", "-o"]), ("wget", &["-q", "-O"])];

impl ModelStore {
    /// `<data dir>/foliacheck/<subdir>`.
    pub fn default_dir(&self) -> PathBuf {
        dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("foliacheck")
            .join(self.subdir)
    }

    /// Whether `dir` holds every file of the store.
    pub fn is_complete(&self, dir: &Path) -> bool {
        self.files.iter().all(|f| dir.join(f.filename).is_file())
    }

    /// First complete directory among `preferred`, the default dir and
    /// `./models/<subdir>`.
    pub fn locate(&self, preferred: Option<&Path>) -> Option<PathBuf> {
        preferred
            .map(Path::to_path_buf)
            .into_iter()
            .chain([self.default_dir(), Path::new("models").join(self.subdir)])
            .find(|dir| self.is_complete(dir))
    }

    /// Locate the models, downloading missing files into `preferred` (or the
    /// default dir) when no complete directory exists.
    pub fn ensure(&self, preferred: Option<&Path>) -> Result<PathBuf, OcrError> {
        if let Some(dir) = self.locate(preferred) {
            return Ok(dir);
        }

        let dir = preferred.map(Path::to_path_buf).unwrap_or_else(|| self.default_dir());
        std::fs::create_dir_all(&dir)?;
        for file in self.files {
            let dest = dir.join(file.filename);
            if !dest.is_file() {
                info!("Downloading {} into {:?}", file.filename, dir);
                fetch(file.url, &dest)?;
            }
        }
        Ok(dir)
    }
}

fn fetch(url: &str, dest: &Path) -> Result<(), OcrError> {
    for (bin, args) in DOWNLOADERS {
        if !check_binary(bin) {
            continue;
        }
        let status = Command::new(bin).args(args).arg(dest).arg(url).status()?;
        if status.success() {
            return Ok(());
        }
        let _ = std::fs::remove_file(dest);
        return Err(OcrError::OcrFailed(format!("{} could not download {}", bin, url)));
    }
    Err(OcrError::BackendNotAvailable(
        "curl or wget is needed to download OCR models".to_string(),
    ))
}
