use image::{Rgb, RgbImage};
use page_diff::compare::{
    CompareConfig, CompareError, Outcome, analyze, decide, evaluate, extract, fuse,
};

const GRAY: Rgb<u8> = Rgb([128, 128, 128]);

fn solid(width: u32, height: u32, color: Rgb<u8>) -> RgbImage {
    RgbImage::from_pixel(width, height, color)
}

fn paint(image: &mut RgbImage, x0: u32, y0: u32, w: u32, h: u32, color: Rgb<u8>) {
    for y in y0..y0 + h {
        for x in x0..x0 + w {
            image.put_pixel(x, y, color);
        }
    }
}

/// Deterministic photo-like texture.
fn texture(width: u32, height: u32, seed: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let v = x.wrapping_mul(73).wrapping_add(y.wrapping_mul(151)).wrapping_add(seed);
        let v = v ^ (v >> 3);
        Rgb([
            (v % 200 + 20) as u8,
            ((v / 7) % 180 + 30) as u8,
            ((x + y) * 2 % 256) as u8,
        ])
    })
}

#[test]
fn identical_images_pass_with_empty_mask() {
    let img = solid(100, 100, GRAY);
    let sim = analyze(&img, &img).expect("analyze");
    assert_eq!(sim.score, 1.0);

    let fused = fuse(&img, &img, &sim.structural_map).expect("fuse");
    assert!(fused.mask.pixels().all(|p| p[0] == 0));
    assert!(extract(&fused.mask, 40).is_empty());

    let verdict = evaluate(&img, &img, &CompareConfig::default()).expect("evaluate");
    assert_eq!(verdict.outcome(), Outcome::Pass);
    assert_eq!(verdict.score(), 1.0);
    assert!(verdict.regions().is_empty());
    assert!(verdict.artifacts().is_none());
}

#[test]
fn identical_textured_images_score_one() {
    let img = texture(64, 48, 11);
    let sim = analyze(&img, &img).expect("analyze");
    assert_eq!(sim.score, 1.0);
    assert!(sim.structural_map.pixels().all(|p| p[0] == 255));
}

#[test]
fn mismatched_dimensions_are_an_error() {
    let a = solid(100, 100, GRAY);
    let b = solid(100, 99, GRAY);
    let err = evaluate(&a, &b, &CompareConfig::default()).unwrap_err();
    match err {
        CompareError::DimensionMismatch { left, right } => {
            assert_eq!(left, (100, 100));
            assert_eq!(right, (100, 99));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn images_smaller_than_window_are_an_error() {
    let a = solid(6, 40, GRAY);
    let err = evaluate(&a, &a, &CompareConfig::default()).unwrap_err();
    assert!(matches!(err, CompareError::ImageTooSmall { width: 6, height: 40, window: 7 }));
}

#[test]
fn score_is_nearly_symmetric() {
    let a = texture(80, 60, 3);
    let b = texture(80, 60, 9);
    let ab = analyze(&a, &b).unwrap().score;
    let ba = analyze(&b, &a).unwrap().score;
    assert!((ab - ba).abs() < 1e-9, "{ab} vs {ba}");
    assert!((-1.0..=1.0).contains(&ab));
}

#[test]
fn score_equal_to_threshold_passes() {
    assert_eq!(decide(0.95, 0.95), Outcome::Pass);
    assert_eq!(decide(0.949_999, 0.95), Outcome::Fail);

    let img = texture(32, 32, 5);
    let config = CompareConfig {
        pass_threshold: 1.0,
        ..CompareConfig::default()
    };
    let verdict = evaluate(&img, &img, &config).unwrap();
    assert!(verdict.is_pass());
}

#[test]
fn corner_block_fails_with_one_region() {
    let before = solid(100, 100, GRAY);
    let mut after = before.clone();
    paint(&mut after, 0, 0, 10, 10, Rgb([255, 0, 0]));

    // With 7x7 windows a 10x10 block touches roughly 1% of the windows.
    let config = CompareConfig {
        pass_threshold: 0.999,
        min_area: 40,
    };
    let verdict = evaluate(&before, &after, &config).unwrap();
    assert!(verdict.score() < 0.999, "score {}", verdict.score());
    assert_eq!(verdict.outcome(), Outcome::Fail);

    let regions = verdict.regions();
    assert_eq!(regions.len(), 1);
    let b = regions[0].bounds;
    // Covers the block; the structural signal may bleed up to one window radius.
    assert_eq!((b.x, b.y), (0, 0));
    assert!(b.width >= 10 && b.width <= 13, "width {}", b.width);
    assert!(b.height >= 10 && b.height <= 13, "height {}", b.height);
    assert!(regions[0].area >= 100);

    let artifacts = verdict.artifacts().expect("artifacts on failure");
    assert_eq!(*artifacts.after_highlighted.get_pixel(0, 0), Rgb([255, 0, 0]));
    assert_eq!(*artifacts.after_filled.get_pixel(5, 5), Rgb([0, 255, 0]));
    assert_eq!(*artifacts.mask.get_pixel(5, 5), Rgb([0, 255, 0]));
    assert_eq!(*artifacts.mask.get_pixel(60, 60), Rgb([0, 0, 0]));
    assert_eq!(artifacts.change_mask.get_pixel(50, 50)[0], 0);

    // inputs stay untouched
    assert_eq!(*after.get_pixel(5, 5), Rgb([255, 0, 0]));
    assert_eq!(*before.get_pixel(0, 0), GRAY);
}

#[test]
fn large_change_fails_default_threshold() {
    let before = solid(100, 100, GRAY);
    let mut after = before.clone();
    paint(&mut after, 50, 0, 50, 100, Rgb([0, 0, 0]));

    let verdict = evaluate(&before, &after, &CompareConfig::default()).unwrap();
    assert!(verdict.score() < 0.95);
    assert_eq!(verdict.outcome(), Outcome::Fail);

    let regions = verdict.regions();
    assert_eq!(regions.len(), 1);
    let b = regions[0].bounds;
    assert!((47..=50).contains(&b.x), "x {}", b.x);
    assert_eq!(b.right(), 99);
    assert_eq!((b.y, b.height), (0, 100));
}

#[test]
fn whole_page_change_is_highlighted() {
    let before = solid(60, 40, GRAY);
    let after = solid(60, 40, Rgb([0, 0, 0]));

    let verdict = evaluate(&before, &after, &CompareConfig::default()).unwrap();
    assert_eq!(verdict.outcome(), Outcome::Fail);

    let regions = verdict.regions();
    assert_eq!(regions.len(), 1);
    let b = regions[0].bounds;
    assert_eq!((b.x, b.y, b.width, b.height), (0, 0, 60, 40));
    assert_eq!(regions[0].area, 60 * 40);

    let artifacts = verdict.artifacts().expect("artifacts on failure");
    assert_eq!(*artifacts.mask.get_pixel(30, 20), Rgb([0, 255, 0]));
    assert_eq!(*artifacts.before_highlighted.get_pixel(0, 0), Rgb([255, 0, 0]));
}

#[test]
fn verdict_ignores_region_survival() {
    let before = solid(100, 100, GRAY);
    let mut after = before.clone();
    // faint 3x3 speckle: below both per-pixel cutoffs, but not identical
    paint(&mut after, 40, 40, 3, 3, Rgb([140, 140, 140]));

    let strict = CompareConfig {
        pass_threshold: 0.9999,
        min_area: 40,
    };
    let verdict = evaluate(&before, &after, &strict).unwrap();
    assert!(verdict.score() < 0.9999);
    assert_eq!(verdict.outcome(), Outcome::Fail);
    assert!(verdict.regions().is_empty());

    let lenient = evaluate(&before, &after, &CompareConfig::default()).unwrap();
    assert_eq!(lenient.outcome(), Outcome::Pass);
    assert_eq!(lenient.score(), verdict.score());
}

#[test]
fn small_changed_patch_is_filtered_out() {
    let mut mask = image::GrayImage::new(100, 100);
    for y in 10..13 {
        for x in 10..13 {
            mask.put_pixel(x, y, image::Luma([255]));
        }
    }
    assert!(extract(&mask, 40).is_empty());
    assert_eq!(extract(&mask, 8).len(), 1);
}
