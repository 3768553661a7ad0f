//! Screenshot acquisition through an external headless browser.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tokio::time::{sleep, timeout};
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("screenshot command timed out after {0:?}")]
    Timeout(Duration),

    #[error("screenshot command failed (exit code {code:?}): {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    #[error("screenshot command succeeded but wrote nothing to {}", .0.display())]
    NoOutput(PathBuf),
}

/// Writes a screenshot of the page under test to `dest`.
pub trait Capture {
    fn capture(&self, dest: &Path) -> impl Future<Output = Result<(), CaptureError>> + Send;
}

/// Command line used to take a screenshot.
///
/// `{url}` and `{output}` in `args` are replaced per capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub program: String,
    pub args: Vec<String>,
    pub timeout_ms: u64,
    /// Wait after the command exits before the output file is checked.
    pub settle_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            program: "chromium".to_string(),
            args: [
                "--headless",
                "--no-sandbox",
                "--disable-dev-shm-usage",
                "--hide-scrollbars",
                "--window-size=1280,800",
                // let the page settle before the shot is taken
                "--virtual-time-budget=5000",
                "--screenshot={output}",
                "{url}",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            timeout_ms: 60_000,
            settle_ms: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommandCapture {
    url: String,
    config: CaptureConfig,
}

impl CommandCapture {
    pub fn new(url: impl Into<String>, config: CaptureConfig) -> Self {
        Self {
            url: url.into(),
            config,
        }
    }

    fn args_for(&self, dest: &Path) -> Vec<String> {
        let output = dest.display().to_string();
        self.config
            .args
            .iter()
            .map(|arg| arg.replace("{url}", &self.url).replace("{output}", &output))
            .collect()
    }
}

impl Capture for CommandCapture {
    async fn capture(&self, dest: &Path) -> Result<(), CaptureError> {
        let args = self.args_for(dest);
        debug!(program = %self.config.program, ?args, "running screenshot command");

        let mut cmd = Command::new(&self.config.program);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let duration = Duration::from_millis(self.config.timeout_ms);
        let output = timeout(duration, cmd.output())
            .await
            .map_err(|_| CaptureError::Timeout(duration))?
            .map_err(|source| CaptureError::Spawn {
                program: self.config.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(CaptureError::Failed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        if self.config.settle_ms > 0 {
            debug!(settle_ms = self.config.settle_ms, "waiting for screenshot to settle");
            sleep(Duration::from_millis(self.config.settle_ms)).await;
        }
        if !dest.is_file() {
            return Err(CaptureError::NoOutput(dest.to_path_buf()));
        }

        info!(url = %self.url, path = %dest.display(), "screenshot captured");
        Ok(())
    }
}
