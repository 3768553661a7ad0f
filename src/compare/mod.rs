//! Screenshot comparison pipeline.
//!
//! `similarity` scores the pair, `fuse` turns two difference signals into a
//! binary change mask, `regions` pulls connected changes out of that mask,
//! `render` draws them and `verdict` ties the stages together.

pub mod fuse;
pub mod regions;
pub mod render;
pub mod similarity;
pub mod verdict;

pub use fuse::{FusedDiff, absolute_difference, fuse};
pub use regions::{BoundingBox, DEFAULT_MIN_AREA, Region, extract};
pub use similarity::{Similarity, WINDOW_SIZE, analyze};
pub use verdict::{Artifacts, CompareConfig, DEFAULT_PASS_THRESHOLD, Outcome, Verdict, decide, evaluate};

use image::{GrayImage, RgbImage};
use kornia::{
    image::{Image, ImageError, ImageSize, allocator::CpuAllocator},
    imgproc,
};

pub(crate) type CpuImage<T, const C: usize> = Image<T, C, CpuAllocator>;

/// Errors raised while comparing two screenshots.
#[derive(Debug, thiserror::Error)]
pub enum CompareError {
    #[error(
        "image dimensions differ: {}x{} vs {}x{}",
        .left.0, .left.1, .right.0, .right.1
    )]
    DimensionMismatch { left: (u32, u32), right: (u32, u32) },

    #[error("image is {width}x{height}, smaller than the {window}x{window} similarity window")]
    ImageTooSmall { width: u32, height: u32, window: u32 },

    #[error("kornia image error: {0}")]
    Kornia(#[from] ImageError),

    #[error("pixel buffer of {len} bytes does not fit a {width}x{height} image")]
    Buffer { width: u32, height: u32, len: usize },
}

pub(crate) fn ensure_same_dimensions(
    left: (u32, u32),
    right: (u32, u32),
) -> Result<(), CompareError> {
    if left != right {
        return Err(CompareError::DimensionMismatch { left, right });
    }
    Ok(())
}

fn image_size(width: u32, height: u32) -> ImageSize {
    ImageSize {
        width: width as usize,
        height: height as usize,
    }
}

/// Luminance of an RGB image (BT.601 weights via kornia).
pub(crate) fn to_grayscale(source: &RgbImage) -> Result<GrayImage, CompareError> {
    let gray = kornia_grayscale(source)?;
    from_kornia_gray(&gray, source.width(), source.height())
}

pub(crate) fn kornia_grayscale(source: &RgbImage) -> Result<CpuImage<u8, 1>, CompareError> {
    let (width, height) = source.dimensions();
    let image = CpuImage::<u8, 3>::new(
        image_size(width, height),
        source.as_raw().clone(),
        CpuAllocator,
    )?;
    let mut gray = CpuImage::<u8, 1>::from_size_val(image.size(), 0u8, CpuAllocator)?;
    imgproc::color::gray_from_rgb_u8(&image, &mut gray)?;
    Ok(gray)
}

pub(crate) fn to_kornia_gray(source: &GrayImage) -> Result<CpuImage<u8, 1>, CompareError> {
    let (width, height) = source.dimensions();
    Ok(CpuImage::<u8, 1>::new(
        image_size(width, height),
        source.as_raw().clone(),
        CpuAllocator,
    )?)
}

pub(crate) fn from_kornia_gray(
    image: &CpuImage<u8, 1>,
    width: u32,
    height: u32,
) -> Result<GrayImage, CompareError> {
    let raw = image.as_slice().to_vec();
    let len = raw.len();
    GrayImage::from_raw(width, height, raw).ok_or(CompareError::Buffer { width, height, len })
}
