//! One CI run: stage, capture, compare, present.

use std::process::ExitCode;

use tracing::{info, warn};

use crate::capture::{Capture, CaptureError};
use crate::compare::{CompareError, Outcome, Verdict, evaluate};
use crate::config::{ConfigError, RunConfig};
use crate::present::ArtifactWriter;
use crate::source::{SourceError, load_pair};
use crate::staging::{Staging, StagingError, Transition};

pub const EXIT_FAIL: u8 = 1;
pub const EXIT_ERROR: u8 = 2;

/// Anything that stops a run from producing a verdict.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Staging(#[from] StagingError),
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Compare(#[from] CompareError),
}

#[derive(Debug)]
pub enum GateOutcome {
    /// A slot was filled; nothing to compare yet.
    Bootstrapped(Transition),
    Compared(Verdict),
}

impl GateOutcome {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            GateOutcome::Bootstrapped(_) => ExitCode::SUCCESS,
            GateOutcome::Compared(verdict) => verdict_exit_code(verdict),
        }
    }
}

pub fn verdict_exit_code(verdict: &Verdict) -> ExitCode {
    match verdict.outcome() {
        Outcome::Pass => ExitCode::SUCCESS,
        Outcome::Fail => ExitCode::from(EXIT_FAIL),
    }
}

/// Runs one step of the staging cycle with `capture` as the screenshot source.
///
/// Review images are written when `write_artifacts` is set. A failure to write
/// them is logged and does not change the verdict.
pub async fn run<C: Capture>(
    config: &RunConfig,
    capture: &C,
    write_artifacts: bool,
) -> Result<GateOutcome, RunError> {
    config.validate()?;

    let staging = Staging::new(&config.screenshot_dir, &config.initial_name, &config.final_name);
    let staged = staging.prepare()?;
    capture.capture(&staged.capture_to).await?;

    let Some((initial, final_)) = staged.compare else {
        return Ok(GateOutcome::Bootstrapped(staged.transition));
    };

    let (before, after) = load_pair(&initial, &final_)?;
    let verdict = evaluate(&before, &after, &config.compare)?;
    match verdict.outcome() {
        Outcome::Pass => info!(score = verdict.score(), "test passed"),
        Outcome::Fail => warn!(
            score = verdict.score(),
            regions = verdict.regions().len(),
            "test failed"
        ),
    }

    if write_artifacts {
        let writer = ArtifactWriter::new(&config.output_dir);
        if let Err(e) = writer.write(&before, &after, &verdict, &config.compare) {
            warn!("could not write review artifacts: {e}");
        }
    }

    Ok(GateOutcome::Compared(verdict))
}
