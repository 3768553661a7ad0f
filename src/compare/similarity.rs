//! Windowed structural similarity (SSIM) between two screenshots.
//!
//! Local statistics come from a 7x7 uniform window with mirrored borders and
//! sample covariance, so scores line up with the common reference
//! implementations for 8-bit images.

use image::{GrayImage, RgbImage};
use tracing::debug;

use super::{CompareError, ensure_same_dimensions, to_grayscale};

/// Side of the square window used for local statistics.
pub const WINDOW_SIZE: u32 = 7;

const K1: f64 = 0.01;
const K2: f64 = 0.03;
const DATA_RANGE: f64 = 255.0;

/// Global score plus the per-pixel structural map.
#[derive(Debug, Clone)]
pub struct Similarity {
    /// Mean local SSIM over every window that fits inside the image.
    pub score: f64,
    /// Local SSIM clamped to `[0, 1]` and scaled to `[0, 255]`.
    /// Dark pixels are structurally different.
    pub structural_map: GrayImage,
}

/// Scores `before` against `after`.
pub fn analyze(before: &RgbImage, after: &RgbImage) -> Result<Similarity, CompareError> {
    ensure_same_dimensions(before.dimensions(), after.dimensions())?;
    let (width, height) = before.dimensions();
    if width < WINDOW_SIZE || height < WINDOW_SIZE {
        return Err(CompareError::ImageTooSmall {
            width,
            height,
            window: WINDOW_SIZE,
        });
    }

    let gray_before = to_grayscale(before)?;
    let gray_after = to_grayscale(after)?;

    let local = ssim_map(&gray_before, &gray_after);
    let score = interior_mean(&local, width as usize, height as usize);
    debug!(score, width, height, "structural similarity");

    let encoded = local.iter().map(|&s| encode(s)).collect();
    let structural_map = GrayImage::from_raw(width, height, encoded).ok_or(CompareError::Buffer {
        width,
        height,
        len: local.len(),
    })?;

    Ok(Similarity {
        score,
        structural_map,
    })
}

fn encode(local: f64) -> u8 {
    (local.clamp(0.0, 1.0) * 255.0) as u8
}

fn ssim_map(x: &GrayImage, y: &GrayImage) -> Vec<f64> {
    let width = x.width() as usize;
    let height = x.height() as usize;

    let xs: Vec<f64> = x.as_raw().iter().map(|&v| v as f64).collect();
    let ys: Vec<f64> = y.as_raw().iter().map(|&v| v as f64).collect();
    let xx: Vec<f64> = xs.iter().map(|v| v * v).collect();
    let yy: Vec<f64> = ys.iter().map(|v| v * v).collect();
    let xy: Vec<f64> = xs.iter().zip(&ys).map(|(a, b)| a * b).collect();

    let mean_x = box_mean(&xs, width, height);
    let mean_y = box_mean(&ys, width, height);
    let mean_xx = box_mean(&xx, width, height);
    let mean_yy = box_mean(&yy, width, height);
    let mean_xy = box_mean(&xy, width, height);

    let n = (WINDOW_SIZE * WINDOW_SIZE) as f64;
    let cov_norm = n / (n - 1.0);
    let c1 = (K1 * DATA_RANGE).powi(2);
    let c2 = (K2 * DATA_RANGE).powi(2);

    (0..width * height)
        .map(|i| {
            let (ux, uy) = (mean_x[i], mean_y[i]);
            let vx = cov_norm * (mean_xx[i] - ux * ux);
            let vy = cov_norm * (mean_yy[i] - uy * uy);
            let vxy = cov_norm * (mean_xy[i] - ux * uy);

            let numerator = (2.0 * ux * uy + c1) * (2.0 * vxy + c2);
            let denominator = (ux * ux + uy * uy + c1) * (vx + vy + c2);
            numerator / denominator
        })
        .collect()
}

/// Separable box filter; out-of-range taps mirror about the edge pixel.
fn box_mean(values: &[f64], width: usize, height: usize) -> Vec<f64> {
    let radius = (WINDOW_SIZE / 2) as isize;
    let area = (WINDOW_SIZE * WINDOW_SIZE) as f64;

    let mut rows = vec![0.0; values.len()];
    for y in 0..height {
        let row = &values[y * width..(y + 1) * width];
        for x in 0..width {
            rows[y * width + x] = (-radius..=radius)
                .map(|dx| row[reflect(x as isize + dx, width)])
                .sum();
        }
    }

    let mut out = vec![0.0; values.len()];
    for y in 0..height {
        for x in 0..width {
            let sum: f64 = (-radius..=radius)
                .map(|dy| rows[reflect(y as isize + dy, height) * width + x])
                .sum();
            out[y * width + x] = sum / area;
        }
    }
    out
}

fn reflect(index: isize, len: usize) -> usize {
    let len = len as isize;
    let mirrored = if index < 0 {
        -index - 1
    } else if index >= len {
        2 * len - index - 1
    } else {
        index
    };
    mirrored as usize
}

// Windows centred closer than the radius to an edge read mirrored pixels and
// are left out of the global score.
fn interior_mean(local: &[f64], width: usize, height: usize) -> f64 {
    let pad = (WINDOW_SIZE / 2) as usize;
    let mut sum = 0.0;
    let mut count = 0usize;
    for y in pad..height - pad {
        for x in pad..width - pad {
            sum += local[y * width + x];
            count += 1;
        }
    }
    sum / count as f64
}
