//! Draws extracted regions onto fresh copies of the inputs.

use image::{Rgb, RgbImage};
use imageproc::{
    drawing::{draw_hollow_rect_mut, draw_line_segment_mut, draw_polygon_mut},
    point::Point,
    rect::Rect,
};

use super::regions::{BoundingBox, Region};

pub const BOX_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
pub const FILL_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const BOX_THICKNESS: u32 = 2;

/// Copy of `image` with a red box around every region.
pub fn annotate(image: &RgbImage, regions: &[Region]) -> RgbImage {
    let mut canvas = image.clone();
    for region in regions {
        draw_box(&mut canvas, &region.bounds);
    }
    canvas
}

/// Black canvas with every region filled green.
pub fn fill_mask(width: u32, height: u32, regions: &[Region]) -> RgbImage {
    let mut canvas = RgbImage::new(width, height);
    for region in regions {
        fill_outline(&mut canvas, &region.outline);
    }
    canvas
}

/// Copy of `image` with every region filled green.
pub fn fill_regions(image: &RgbImage, regions: &[Region]) -> RgbImage {
    let mut canvas = image.clone();
    for region in regions {
        fill_outline(&mut canvas, &region.outline);
    }
    canvas
}

fn draw_box(canvas: &mut RgbImage, bounds: &BoundingBox) {
    for inset in 0..BOX_THICKNESS {
        let width = bounds.width.saturating_sub(2 * inset);
        let height = bounds.height.saturating_sub(2 * inset);
        if width == 0 || height == 0 {
            break;
        }
        let rect = Rect::at((bounds.x + inset) as i32, (bounds.y + inset) as i32).of_size(width, height);
        draw_hollow_rect_mut(canvas, rect, BOX_COLOR);
    }
}

fn fill_outline(canvas: &mut RgbImage, outline: &[Point<i32>]) {
    let mut polygon = outline.to_vec();
    // draw_polygon_mut rejects explicitly closed polygons
    while polygon.len() > 1 && polygon.first() == polygon.last() {
        polygon.pop();
    }

    match polygon.as_slice() {
        [] => {}
        [p] => {
            if p.x >= 0 && p.y >= 0 && (p.x as u32) < canvas.width() && (p.y as u32) < canvas.height() {
                canvas.put_pixel(p.x as u32, p.y as u32, FILL_COLOR);
            }
        }
        [a, b] => stroke(canvas, *a, *b),
        _ => {
            draw_polygon_mut(canvas, &polygon, FILL_COLOR);
            for (i, &a) in polygon.iter().enumerate() {
                stroke(canvas, a, polygon[(i + 1) % polygon.len()]);
            }
        }
    }
}

fn stroke(canvas: &mut RgbImage, a: Point<i32>, b: Point<i32>) {
    draw_line_segment_mut(
        canvas,
        (a.x as f32, a.y as f32),
        (b.x as f32, b.y as f32),
        FILL_COLOR,
    );
}
