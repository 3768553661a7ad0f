//! Pass/fail policy over the comparison pipeline.

use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::fuse::{count_changed, fuse};
use super::regions::{DEFAULT_MIN_AREA, Region, extract};
use super::render::{annotate, fill_mask, fill_regions};
use super::similarity::analyze;
use super::CompareError;

pub const DEFAULT_PASS_THRESHOLD: f64 = 0.95;

/// Thresholds for one comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    /// Scores at or above this pass.
    pub pass_threshold: f64,
    /// Regions must have strictly more changed pixels than this.
    pub min_area: u32,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            pass_threshold: DEFAULT_PASS_THRESHOLD,
            min_area: DEFAULT_MIN_AREA,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Pass,
    Fail,
}

/// Images produced for review when a comparison fails.
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub structural_map: GrayImage,
    pub absolute_diff: RgbImage,
    pub change_mask: GrayImage,
    pub before_highlighted: RgbImage,
    pub after_highlighted: RgbImage,
    /// Regions filled green on black.
    pub mask: RgbImage,
    /// `after` with regions filled green.
    pub after_filled: RgbImage,
}

#[derive(Debug, Clone)]
pub enum Verdict {
    Pass {
        score: f64,
    },
    Fail {
        score: f64,
        regions: Vec<Region>,
        artifacts: Box<Artifacts>,
    },
}

impl Verdict {
    pub fn outcome(&self) -> Outcome {
        match self {
            Verdict::Pass { .. } => Outcome::Pass,
            Verdict::Fail { .. } => Outcome::Fail,
        }
    }

    pub fn score(&self) -> f64 {
        match self {
            Verdict::Pass { score } | Verdict::Fail { score, .. } => *score,
        }
    }

    pub fn is_pass(&self) -> bool {
        self.outcome() == Outcome::Pass
    }

    pub fn regions(&self) -> &[Region] {
        match self {
            Verdict::Pass { .. } => &[],
            Verdict::Fail { regions, .. } => regions,
        }
    }

    pub fn artifacts(&self) -> Option<&Artifacts> {
        match self {
            Verdict::Pass { .. } => None,
            Verdict::Fail { artifacts, .. } => Some(&**artifacts),
        }
    }
}

/// Inclusive threshold: a score equal to `pass_threshold` passes.
pub fn decide(score: f64, pass_threshold: f64) -> Outcome {
    if score >= pass_threshold {
        Outcome::Pass
    } else {
        Outcome::Fail
    }
}

/// Compares `before` with `after`.
///
/// The verdict depends only on the global similarity score. Regions and
/// review images are computed on failure and never change the outcome.
pub fn evaluate(
    before: &RgbImage,
    after: &RgbImage,
    config: &CompareConfig,
) -> Result<Verdict, CompareError> {
    let similarity = analyze(before, after)?;
    let score = similarity.score;

    if decide(score, config.pass_threshold) == Outcome::Pass {
        info!(score, threshold = config.pass_threshold, "no significant visual differences");
        return Ok(Verdict::Pass { score });
    }

    let fused = fuse(before, after, &similarity.structural_map)?;
    let regions = extract(&fused.mask, config.min_area);
    info!(
        score,
        threshold = config.pass_threshold,
        changed_pixels = count_changed(&fused.mask),
        regions = regions.len(),
        "significant visual differences"
    );

    let (width, height) = before.dimensions();
    let artifacts = Artifacts {
        before_highlighted: annotate(before, &regions),
        after_highlighted: annotate(after, &regions),
        mask: fill_mask(width, height, &regions),
        after_filled: fill_regions(after, &regions),
        structural_map: similarity.structural_map,
        absolute_diff: fused.absolute,
        change_mask: fused.mask,
    };

    Ok(Verdict::Fail {
        score,
        regions,
        artifacts: Box::new(artifacts),
    })
}
