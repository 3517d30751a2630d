// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Perspective rectification of a detected page quadrilateral.

use image::{GrayImage, Luma};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use lutrin_core::Point;
use tracing::{debug, warn};

/// Label four corners as `[top_left, top_right, bottom_right, bottom_left]`.
///
/// Top-left has the smallest `x + y` and bottom-right the largest.
/// Top-right has the smallest `y - x` and bottom-left the largest.
pub fn order_corners(points: &[Point; 4]) -> [Point; 4] {
    let sum = |p: &Point| p.x + p.y;
    let diff = |p: &Point| p.y - p.x;
    [
        extreme(points, sum, false),
        extreme(points, diff, false),
        extreme(points, sum, true),
        extreme(points, diff, true),
    ]
}

/// First point with the smallest (or largest) key.
fn extreme(points: &[Point; 4], key: impl Fn(&Point) -> f32, largest: bool) -> Point {
    let mut best = points[0];
    for p in &points[1..] {
        let better = if largest {
            key(p) > key(&best)
        } else {
            key(p) < key(&best)
        };
        if better {
            best = *p;
        }
    }
    best
}

/// Output size for an ordered quadrilateral: the longer of each pair of
/// opposite edges, truncated to whole pixels.
pub fn target_size(ordered: &[Point; 4]) -> (u32, u32) {
    let [tl, tr, br, bl] = ordered;
    let width = (br.distance(bl) as u32).max(tr.distance(tl) as u32);
    let height = (tr.distance(br) as u32).max(tl.distance(bl) as u32);
    (width, height)
}

/// Warp the quadrilateral bounded by `corners` onto an axis-aligned image
/// of [`target_size`].
///
/// Samples falling outside the source are white. Returns `None` when the
/// quadrilateral is degenerate (zero-sized or with collinear corners).
pub fn warp_to_rectangle(gray: &GrayImage, corners: &[Point; 4]) -> Option<GrayImage> {
    let ordered = order_corners(corners);
    let (width, height) = target_size(&ordered);
    if width == 0 || height == 0 {
        warn!(width, height, "Degenerate page quadrilateral");
        return None;
    }

    let (w, h) = ((width - 1) as f32, (height - 1) as f32);
    let src = ordered.map(|p| (p.x, p.y));
    let dest = [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)];

    let Some(projection) = Projection::from_control_points(src, dest) else {
        warn!(?ordered, "Failed to compute projective transform");
        return None;
    };

    let mut output = GrayImage::new(width, height);
    warp_into(gray, &projection, Interpolation::Bilinear, Luma([255u8]), &mut output);
    debug!(width, height, "Page warped to rectangle");
    Some(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(l: f32, t: f32, r: f32, b: f32) -> [Point; 4] {
        [
            Point::new(l, t),
            Point::new(r, t),
            Point::new(r, b),
            Point::new(l, b),
        ]
    }

    #[test]
    fn orders_shuffled_corners() {
        let shuffled = [
            Point::new(300.0, 410.0),
            Point::new(20.0, 15.0),
            Point::new(10.0, 400.0),
            Point::new(290.0, 5.0),
        ];
        let [tl, tr, br, bl] = order_corners(&shuffled);
        assert_eq!(tl, Point::new(20.0, 15.0));
        assert_eq!(tr, Point::new(290.0, 5.0));
        assert_eq!(br, Point::new(300.0, 410.0));
        assert_eq!(bl, Point::new(10.0, 400.0));
    }

    #[test]
    fn target_size_uses_longer_edges() {
        let quad = [
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(120.0, 50.0),
            Point::new(0.0, 50.0),
        ];
        // Bottom edge 120, top edge 100; left edge 50, right edge ~53.85.
        assert_eq!(target_size(&quad), (120, 53));
    }

    #[test]
    fn axis_aligned_page_maps_to_its_own_size() {
        let gray = GrayImage::from_fn(200, 150, |x, y| Luma([((x + y) % 256) as u8]));
        let out = warp_to_rectangle(&gray, &rect(20.0, 10.0, 180.0, 130.0)).expect("warp");
        assert_eq!(out.dimensions(), (160, 120));
        // Top-left of the output samples the top-left corner of the page.
        let (got, want) = (out.get_pixel(0, 0).0[0], gray.get_pixel(20, 10).0[0]);
        assert!(got.abs_diff(want) <= 1, "{got} vs {want}");
    }

    #[test]
    fn rectifying_twice_is_stable() {
        let gray = GrayImage::from_fn(120, 90, |x, _| Luma([(x * 2) as u8]));
        let once = warp_to_rectangle(&gray, &rect(10.0, 10.0, 110.0, 80.0)).expect("first warp");
        let (w, h) = once.dimensions();
        let full = rect(0.0, 0.0, (w - 1) as f32, (h - 1) as f32);
        let twice = warp_to_rectangle(&once, &full).expect("second warp");
        let (w2, h2) = twice.dimensions();
        assert!(w.abs_diff(w2) <= 1 && h.abs_diff(h2) <= 1);
    }

    #[test]
    fn collapsed_quad_is_rejected() {
        let gray = GrayImage::new(10, 10);
        let point = [Point::new(5.0, 5.0); 4];
        assert!(warp_to_rectangle(&gray, &point).is_none());
    }
}
