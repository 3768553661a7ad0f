//! Connected change regions in a binary mask.

use image::{GrayImage, ImageBuffer, Luma, imageops};
use imageproc::{
    contours::{BorderType, Contour, find_contours},
    point::Point,
    region_labelling::{Connectivity, connected_components},
};
use serde::Serialize;
use tracing::{debug, trace};

/// Regions with this many pixels or fewer are treated as noise.
pub const DEFAULT_MIN_AREA: u32 = 40;

type Labels = ImageBuffer<Luma<u32>, Vec<u32>>;

/// Axis-aligned box in pixel coordinates, inclusive of both edge pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn right(&self) -> u32 {
        self.x + self.width - 1
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height - 1
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        (self.x..=self.right()).contains(&x) && (self.y..=self.bottom()).contains(&y)
    }
}

/// One external connected component of changed pixels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Region {
    pub bounds: BoundingBox,
    /// Changed pixels in the component.
    pub area: u32,
    /// Outer boundary with straight runs collapsed to their end points.
    #[serde(skip)]
    pub outline: Vec<Point<i32>>,
}

/// Finds the outermost 8-connected regions of `mask` larger than `min_area`.
///
/// A region's area is its filled extent: the changed pixels plus everything
/// they enclose. Regions come back in raster discovery order. Components
/// sitting inside a hole of another component are not reported.
pub fn extract(mask: &GrayImage, min_area: u32) -> Vec<Region> {
    let labels = connected_components(mask, Connectivity::Eight, Luma([0u8]));

    // contour tracing misreads components on the image edge without a background frame
    let (width, height) = mask.dimensions();
    let mut padded = GrayImage::new(width + 2, height + 2);
    imageops::replace(&mut padded, mask, 1, 1);
    let contours: Vec<Contour<i32>> = find_contours(&padded);

    let mut regions = Vec::new();
    let mut discarded = 0usize;

    for contour in contours
        .iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
    {
        let points: Vec<Point<i32>> = contour
            .points
            .iter()
            .map(|p| Point::new(p.x - 1, p.y - 1))
            .collect();
        let Some(start) = points.first() else {
            continue;
        };
        let label = labels.get_pixel(start.x as u32, start.y as u32)[0];
        let bounds = bounding_box(&points);
        let area = filled_area(&labels, label, &bounds);
        if area <= min_area {
            trace!(area, x = start.x, y = start.y, "discarding small region");
            discarded += 1;
            continue;
        }

        regions.push(Region {
            bounds,
            area,
            outline: simplify(&points),
        });
    }

    debug!(kept = regions.len(), discarded, min_area, "regions extracted");
    regions
}

/// Pixels of component `label` plus the pixels it encloses.
fn filled_area(labels: &Labels, label: u32, bounds: &BoundingBox) -> u32 {
    let mut crop = GrayImage::new(bounds.width + 2, bounds.height + 2);
    for y in 0..bounds.height {
        for x in 0..bounds.width {
            if labels.get_pixel(bounds.x + x, bounds.y + y)[0] == label {
                crop.put_pixel(x + 1, y + 1, Luma([255]));
            }
        }
    }

    // background around an 8-connected component is 4-connected
    let outside = connected_components(&crop, Connectivity::Four, Luma([255u8]));
    let outside_label = outside.get_pixel(0, 0)[0];
    let reachable = outside.pixels().filter(|p| p[0] == outside_label).count() as u32;
    crop.width() * crop.height() - reachable
}

fn bounding_box(points: &[Point<i32>]) -> BoundingBox {
    let min_x = points.iter().map(|p| p.x).min().unwrap_or(0);
    let max_x = points.iter().map(|p| p.x).max().unwrap_or(0);
    let min_y = points.iter().map(|p| p.y).min().unwrap_or(0);
    let max_y = points.iter().map(|p| p.y).max().unwrap_or(0);
    BoundingBox {
        x: min_x as u32,
        y: min_y as u32,
        width: (max_x - min_x + 1) as u32,
        height: (max_y - min_y + 1) as u32,
    }
}

// Contour steps are single 8-neighbour moves, so a point whose incoming and
// outgoing steps match lies in the middle of a straight run.
fn simplify(points: &[Point<i32>]) -> Vec<Point<i32>> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }
    let step = |a: Point<i32>, b: Point<i32>| ((b.x - a.x).signum(), (b.y - a.y).signum());

    let corners: Vec<Point<i32>> = (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let next = points[(i + 1) % n];
            step(prev, points[i]) != step(points[i], next)
        })
        .map(|i| points[i])
        .collect();

    if corners.is_empty() {
        vec![points[0]]
    } else {
        corners
    }
}
