//! Run configuration: JSON file plus defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::capture::CaptureConfig;
use crate::compare::CompareConfig;

pub const DEFAULT_URL: &str = "https://cdsofcdr.github.io/AITesting/";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("pass threshold {0} is outside [-1, 1]")]
    InvalidThreshold(f64),

    #[error("{0} must not be empty")]
    Empty(&'static str),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Page under test.
    pub url: String,
    pub screenshot_dir: PathBuf,
    pub initial_name: String,
    pub final_name: String,
    /// Where review images and the report are written.
    pub output_dir: PathBuf,
    pub capture: CaptureConfig,
    pub compare: CompareConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            screenshot_dir: PathBuf::from("screenshots"),
            initial_name: "initial_screenshot.png".to_string(),
            final_name: "final_screenshot.png".to_string(),
            output_dir: PathBuf::from("output"),
            capture: CaptureConfig::default(),
            compare: CompareConfig::default(),
        }
    }
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_compare(&self.compare)?;
        if self.url.trim().is_empty() {
            return Err(ConfigError::Empty("url"));
        }
        if self.initial_name.is_empty() {
            return Err(ConfigError::Empty("initial_name"));
        }
        if self.final_name.is_empty() {
            return Err(ConfigError::Empty("final_name"));
        }
        if self.capture.program.is_empty() {
            return Err(ConfigError::Empty("capture.program"));
        }
        Ok(())
    }
}

pub fn validate_compare(config: &CompareConfig) -> Result<(), ConfigError> {
    let threshold = config.pass_threshold;
    if !(-1.0..=1.0).contains(&threshold) {
        return Err(ConfigError::InvalidThreshold(threshold));
    }
    Ok(())
}
