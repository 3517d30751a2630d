// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page boundary detection.
//
// The page is found as the largest contour in an edge map that simplifies
// to exactly four vertices. The edge map comes from a locally-thresholded,
// inverted copy of the frame so that the paper/background transition is a
// solid band regardless of lighting gradients across the spread.

use image::GrayImage;
use image::imageops;
use imageproc::contours::find_contours;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point as PixelPoint;
use lutrin_core::{NormalizerConfig, Point};
use tracing::{debug, instrument};

use crate::scan::threshold::adaptive_threshold;

/// Tuning for [`detect_page_boundary`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryParams {
    pub blur_sigma: f32,
    pub block_radius: u32,
    pub offset: i32,
    pub canny_low: f32,
    pub canny_high: f32,
    /// Largest contours examined, by enclosed area.
    pub max_candidates: usize,
    /// Simplification tolerance as a fraction of each contour's perimeter.
    pub epsilon_ratio: f64,
}

impl From<&NormalizerConfig> for BoundaryParams {
    fn from(config: &NormalizerConfig) -> Self {
        Self {
            blur_sigma: config.detect_blur_sigma,
            block_radius: config.detect_block_radius,
            offset: config.detect_offset,
            canny_low: config.canny_low,
            canny_high: config.canny_high,
            max_candidates: config.max_candidates,
            epsilon_ratio: config.approx_epsilon_ratio,
        }
    }
}

impl Default for BoundaryParams {
    fn default() -> Self {
        Self::from(&NormalizerConfig::default())
    }
}

/// Blur, threshold, invert, then trace edges.
pub fn edge_map(gray: &GrayImage, params: &BoundaryParams) -> GrayImage {
    let blurred = if params.blur_sigma > 0.0 {
        gaussian_blur_f32(gray, params.blur_sigma)
    } else {
        gray.clone()
    };
    let mut binary = adaptive_threshold(&blurred, params.block_radius, params.offset);
    imageops::invert(&mut binary);
    canny(&binary, params.canny_low, params.canny_high)
}

/// Corners of the page quadrilateral, in contour order, or `None` when no
/// candidate simplifies to four vertices.
#[instrument(skip_all, fields(width = gray.width(), height = gray.height()))]
pub fn detect_page_boundary(gray: &GrayImage, params: &BoundaryParams) -> Option<[Point; 4]> {
    let edges = edge_map(gray, params);
    let contours = find_contours::<i32>(&edges);
    debug!(contours = contours.len(), "Contours traced");

    let mut candidates: Vec<(f64, Vec<PixelPoint<i32>>)> = contours
        .into_iter()
        .filter(|c| c.points.len() >= 4)
        .map(|c| (contour_area(&c.points), c.points))
        .collect();
    candidates.sort_by(|a, b| b.0.total_cmp(&a.0));
    candidates.truncate(params.max_candidates);

    for (rank, (area, points)) in candidates.iter().enumerate() {
        let epsilon = params.epsilon_ratio * arc_length(points, true);
        if epsilon <= 0.0 {
            continue;
        }
        let approx = close_polygon(approximate_polygon_dp(points, epsilon, true));
        debug!(rank, area, vertices = approx.len(), "Candidate simplified");
        if let [a, b, c, d] = approx.as_slice() {
            return Some([to_point(a), to_point(b), to_point(c), to_point(d)]);
        }
    }

    debug!("No four-vertex contour among candidates");
    None
}

/// Drop a trailing vertex that repeats the first.
fn close_polygon(mut points: Vec<PixelPoint<i32>>) -> Vec<PixelPoint<i32>> {
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    points
}

fn to_point(p: &PixelPoint<i32>) -> Point {
    Point::new(p.x as f32, p.y as f32)
}

/// Area enclosed by a closed contour (shoelace formula).
fn contour_area(points: &[PixelPoint<i32>]) -> f64 {
    let n = points.len();
    let mut twice_area = 0.0f64;
    for i in 0..n {
        let j = (i + 1) % n;
        twice_area += points[i].x as f64 * points[j].y as f64;
        twice_area -= points[j].x as f64 * points[i].y as f64;
    }
    twice_area.abs() / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    /// Dark desk with a bright page from (left, top) to (right, bottom).
    fn page_on_desk(w: u32, h: u32, left: u32, top: u32, right: u32, bottom: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| {
            if (left..right).contains(&x) && (top..bottom).contains(&y) {
                Luma([235u8])
            } else {
                Luma([35u8])
            }
        })
    }

    #[test]
    fn finds_bright_page_on_dark_desk() {
        let gray = page_on_desk(400, 500, 60, 70, 340, 430);
        let corners = detect_page_boundary(&gray, &BoundaryParams::default()).expect("page found");

        let expected = [(60.0, 70.0), (340.0, 70.0), (340.0, 430.0), (60.0, 430.0)];
        for (ex, ey) in expected {
            let nearest = corners
                .iter()
                .map(|p| p.distance(&Point::new(ex, ey)))
                .fold(f32::INFINITY, f32::min);
            assert!(nearest < 15.0, "no corner near ({ex}, {ey}): {corners:?}");
        }
    }

    #[test]
    fn blank_frame_has_no_boundary() {
        let gray = GrayImage::from_pixel(200, 300, Luma([200u8]));
        assert_eq!(detect_page_boundary(&gray, &BoundaryParams::default()), None);
    }

    #[test]
    fn contour_area_of_square() {
        let square = [
            PixelPoint::new(0, 0),
            PixelPoint::new(10, 0),
            PixelPoint::new(10, 10),
            PixelPoint::new(0, 10),
        ];
        assert!((contour_area(&square) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn closing_duplicate_is_dropped() {
        let pts = vec![PixelPoint::new(1, 1), PixelPoint::new(5, 1), PixelPoint::new(1, 1)];
        assert_eq!(close_polygon(pts).len(), 2);
    }
}
