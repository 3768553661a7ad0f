//! Writes comparison results for human review.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, RgbImage, imageops};
use serde::Serialize;
use tracing::{debug, info};

use crate::compare::{CompareConfig, Outcome, Region, Verdict};

pub const REPORT_FILE: &str = "report.json";
pub const CONTACT_SHEET_FILE: &str = "contact_sheet.png";

/// Review images in the order they are written and tiled.
pub const PANEL_FILES: [&str; 8] = [
    "before.png",
    "after.png",
    "ssim_diff.png",
    "abs_diff.png",
    "before_highlighted.png",
    "after_highlighted.png",
    "mask.png",
    "after_filled.png",
];

const SHEET_COLUMNS: u32 = 4;
const SHEET_ROWS: u32 = 2;

#[derive(Debug, thiserror::Error)]
pub enum PresentError {
    #[error("failed to create output directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Report {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove stale {}: {source}", .path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("rerun: {0}")]
    Rerun(String),
}

/// Summary written next to the images.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub outcome: Outcome,
    pub score: f64,
    pub pass_threshold: f64,
    pub min_area: u32,
    pub width: u32,
    pub height: u32,
    pub regions: &'a [Region],
}

impl<'a> Report<'a> {
    pub fn new(verdict: &'a Verdict, config: &CompareConfig, dimensions: (u32, u32)) -> Self {
        Self {
            outcome: verdict.outcome(),
            score: verdict.score(),
            pass_threshold: config.pass_threshold,
            min_area: config.min_area,
            width: dimensions.0,
            height: dimensions.1,
            regions: verdict.regions(),
        }
    }
}

/// Saves review images and `report.json` into one directory.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the paths written. A passing verdict only gets a report, and
    /// review images left over from an earlier failure are removed.
    pub fn write(
        &self,
        before: &RgbImage,
        after: &RgbImage,
        verdict: &Verdict,
        config: &CompareConfig,
    ) -> Result<Vec<PathBuf>, PresentError> {
        fs::create_dir_all(&self.dir).map_err(|source| PresentError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;

        let mut written = Vec::new();
        if let Some(artifacts) = verdict.artifacts() {
            let structural = gray_to_rgb(&artifacts.structural_map);
            let panels: [&RgbImage; 8] = [
                before,
                after,
                &structural,
                &artifacts.absolute_diff,
                &artifacts.before_highlighted,
                &artifacts.after_highlighted,
                &artifacts.mask,
                &artifacts.after_filled,
            ];
            for (name, image) in PANEL_FILES.iter().zip(panels) {
                written.push(self.save(name, image)?);
            }
            written.push(self.save(CONTACT_SHEET_FILE, &contact_sheet(&panels[..7]))?);
        } else {
            self.remove_stale()?;
        }

        let report = Report::new(verdict, config, before.dimensions());
        let report_path = self.dir.join(REPORT_FILE);
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(&report_path, json).map_err(|source| PresentError::Report {
            path: report_path.clone(),
            source,
        })?;
        written.push(report_path);

        info!(dir = %self.dir.display(), files = written.len(), "artifacts written");
        Ok(written)
    }

    fn remove_stale(&self) -> Result<(), PresentError> {
        for name in PANEL_FILES.iter().chain([&CONTACT_SHEET_FILE]) {
            let path = self.dir.join(name);
            match fs::remove_file(&path) {
                Ok(()) => debug!(path = %path.display(), "removed stale review image"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(source) => return Err(PresentError::Remove { path, source }),
            }
        }
        Ok(())
    }

    fn save(&self, name: &str, image: &RgbImage) -> Result<PathBuf, PresentError> {
        let path = self.dir.join(name);
        image.save(&path).map_err(|source| PresentError::Image {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

fn gray_to_rgb(image: &GrayImage) -> RgbImage {
    DynamicImage::ImageLuma8(image.clone()).to_rgb8()
}

/// Tiles equally sized panels into a 2x4 overview, row by row.
pub fn contact_sheet(panels: &[&RgbImage]) -> RgbImage {
    let Some(first) = panels.first() else {
        return RgbImage::new(0, 0);
    };
    let (width, height) = first.dimensions();
    let mut sheet = RgbImage::new(width * SHEET_COLUMNS, height * SHEET_ROWS);
    for (i, panel) in panels.iter().take((SHEET_COLUMNS * SHEET_ROWS) as usize).enumerate() {
        let col = i as u32 % SHEET_COLUMNS;
        let row = i as u32 / SHEET_COLUMNS;
        imageops::replace(&mut sheet, *panel, (col * width) as i64, (row * height) as i64);
    }
    sheet
}

/// Streams the review images to a spawned Rerun viewer.
#[cfg(feature = "rerun")]
pub fn log_to_rerun(before: &RgbImage, after: &RgbImage, verdict: &Verdict) -> Result<(), PresentError> {
    let rec = rerun::RecordingStreamBuilder::new("page_diff")
        .spawn()
        .map_err(|e| PresentError::Rerun(e.to_string()))?;

    let log_rgb = |path: &str, image: &RgbImage| {
        rec.log(
            path,
            &rerun::Image::from_elements(
                image.as_raw().as_slice(),
                [image.width(), image.height()],
                rerun::ColorModel::RGB,
            ),
        )
        .map_err(|e| PresentError::Rerun(e.to_string()))
    };

    log_rgb("before", before)?;
    log_rgb("after", after)?;
    if let Some(artifacts) = verdict.artifacts() {
        rec.log(
            "ssim_diff",
            &rerun::Image::from_elements(
                artifacts.structural_map.as_raw().as_slice(),
                [artifacts.structural_map.width(), artifacts.structural_map.height()],
                rerun::ColorModel::L,
            ),
        )
        .map_err(|e| PresentError::Rerun(e.to_string()))?;
        log_rgb("abs_diff", &artifacts.absolute_diff)?;
        log_rgb("before_highlighted", &artifacts.before_highlighted)?;
        log_rgb("after_highlighted", &artifacts.after_highlighted)?;
        log_rgb("mask", &artifacts.mask)?;
    }
    Ok(())
}
