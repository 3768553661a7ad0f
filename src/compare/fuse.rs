//! Dual-signal change mask.
//!
//! The structural map catches layout shifts and missing elements, the absolute
//! colour difference catches small recolours and anti-aliasing changes. A pixel
//! is changed when either signal says so.

use image::{GrayImage, Luma, RgbImage};
use kornia::{image::allocator::CpuAllocator, imgproc};
use tracing::debug;

use super::{
    CompareError, CpuImage, ensure_same_dimensions, from_kornia_gray, kornia_grayscale,
    to_kornia_gray,
};

/// Structural map values strictly below this are changed.
pub const STRUCTURAL_CUTOFF: u8 = 128;
/// Grayscale absolute differences at or above this are changed.
pub const ABSOLUTE_CUTOFF: u8 = 25;

pub const CHANGED: u8 = 255;

#[derive(Debug, Clone)]
pub struct FusedDiff {
    /// Per-channel `|before - after|`.
    pub absolute: RgbImage,
    /// Binary mask, `CHANGED` or 0.
    pub mask: GrayImage,
}

pub fn absolute_difference(before: &RgbImage, after: &RgbImage) -> Result<RgbImage, CompareError> {
    ensure_same_dimensions(before.dimensions(), after.dimensions())?;
    let (width, height) = before.dimensions();
    let raw: Vec<u8> = before
        .as_raw()
        .iter()
        .zip(after.as_raw())
        .map(|(&a, &b)| a.abs_diff(b))
        .collect();
    let len = raw.len();
    RgbImage::from_raw(width, height, raw).ok_or(CompareError::Buffer { width, height, len })
}

/// Builds the change mask from both images and the structural map.
pub fn fuse(
    before: &RgbImage,
    after: &RgbImage,
    structural_map: &GrayImage,
) -> Result<FusedDiff, CompareError> {
    ensure_same_dimensions(before.dimensions(), structural_map.dimensions())?;
    let absolute = absolute_difference(before, after)?;
    let (width, height) = before.dimensions();

    let structural = to_kornia_gray(structural_map)?;
    let mut structural_changed =
        CpuImage::<u8, 1>::from_size_val(structural.size(), 0u8, CpuAllocator)?;
    imgproc::threshold::threshold_binary_inverse(
        &structural,
        &mut structural_changed,
        STRUCTURAL_CUTOFF - 1,
        CHANGED,
    )?;

    let absolute_gray = kornia_grayscale(&absolute)?;
    let mut absolute_changed =
        CpuImage::<u8, 1>::from_size_val(absolute_gray.size(), 0u8, CpuAllocator)?;
    imgproc::threshold::threshold_binary(
        &absolute_gray,
        &mut absolute_changed,
        ABSOLUTE_CUTOFF - 1,
        CHANGED,
    )?;

    let structural_changed = from_kornia_gray(&structural_changed, width, height)?;
    let absolute_changed = from_kornia_gray(&absolute_changed, width, height)?;

    let mut mask = GrayImage::new(width, height);
    for ((out, s), a) in mask
        .pixels_mut()
        .zip(structural_changed.pixels())
        .zip(absolute_changed.pixels())
    {
        *out = Luma([s[0] | a[0]]);
    }

    debug!(
        structural = count_changed(&structural_changed),
        absolute = count_changed(&absolute_changed),
        fused = count_changed(&mask),
        "change mask fused"
    );

    Ok(FusedDiff { absolute, mask })
}

pub(crate) fn count_changed(mask: &GrayImage) -> usize {
    mask.pixels().filter(|p| p[0] != 0).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn similar_everywhere(width: u32, height: u32) -> GrayImage {
        GrayImage::from_pixel(width, height, Luma([255]))
    }

    #[test]
    fn absolute_difference_is_per_channel() {
        let a = RgbImage::from_pixel(2, 1, Rgb([10, 200, 30]));
        let b = RgbImage::from_pixel(2, 1, Rgb([40, 100, 30]));
        let diff = absolute_difference(&a, &b).unwrap();
        assert_eq!(diff.get_pixel(1, 0), &Rgb([30, 100, 0]));
    }

    #[test]
    fn structural_signal_alone_marks_pixels() {
        let img = RgbImage::from_pixel(8, 8, Rgb([90, 90, 90]));
        let mut map = similar_everywhere(8, 8);
        map.put_pixel(2, 3, Luma([127]));
        map.put_pixel(5, 5, Luma([128]));

        let fused = fuse(&img, &img, &map).unwrap();
        assert_eq!(fused.mask.get_pixel(2, 3)[0], CHANGED);
        assert_eq!(fused.mask.get_pixel(5, 5)[0], 0);
        assert_eq!(count_changed(&fused.mask), 1);
    }

    #[test]
    fn absolute_signal_alone_marks_pixels() {
        let before = RgbImage::from_pixel(8, 8, Rgb([100, 100, 100]));
        let mut after = before.clone();
        after.put_pixel(1, 1, Rgb([160, 160, 160]));
        after.put_pixel(6, 6, Rgb([110, 110, 110]));

        let fused = fuse(&before, &after, &similar_everywhere(8, 8)).unwrap();
        assert_eq!(fused.mask.get_pixel(1, 1)[0], CHANGED);
        assert_eq!(fused.mask.get_pixel(6, 6)[0], 0);
        assert_eq!(count_changed(&fused.mask), 1);
    }

    #[test]
    fn mask_is_binary() {
        let before = RgbImage::from_fn(16, 16, |x, y| Rgb([(x * 16) as u8, (y * 16) as u8, 7]));
        let after = RgbImage::from_fn(16, 16, |x, y| Rgb([(y * 16) as u8, (x * 16) as u8, 7]));
        let map = GrayImage::from_fn(16, 16, |x, _| Luma([(x * 16) as u8]));
        let fused = fuse(&before, &after, &map).unwrap();
        assert!(fused.mask.pixels().all(|p| p[0] == 0 || p[0] == CHANGED));
    }

    #[test]
    fn mismatched_map_is_rejected() {
        let img = RgbImage::new(8, 8);
        let err = fuse(&img, &img, &similar_everywhere(8, 9)).unwrap_err();
        assert!(matches!(err, CompareError::DimensionMismatch { .. }));
    }
}
