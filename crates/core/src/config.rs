use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File looked up in the working directory when no explicit config is given.
pub const DEFAULT_CONFIG_FILE: &str = "tallyscan.toml";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub ocr: OcrSettings,
    pub pdf: PdfSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OcrSettings {
    /// Tesseract language code, e.g. `eng` or `eng+chi_sim`.
    pub language: String,
    /// Directory holding `*.traineddata`; the engine default when absent.
    pub tessdata_dir: Option<PathBuf>,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self { language: "eng".to_string(), tessdata_dir: None }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PdfSettings {
    /// Output file name; `<directory name>.pdf` when absent.
    pub output: Option<String>,
}

impl Settings {
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, SettingsError> {
        toml::from_str(content)
            .map_err(|source| SettingsError::Parse { path: path.to_path_buf(), source })
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| SettingsError::Read { path: path.to_path_buf(), source })?;
        Self::from_toml(&content, path)
    }

    /// Load `explicit` if given, else `tallyscan.toml` in `dir` if present,
    /// else defaults.
    pub fn resolve(explicit: Option<&Path>, dir: &Path) -> Result<Self, SettingsError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let candidate = dir.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            tracing::debug!("Using config {}", candidate.display());
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }
}
