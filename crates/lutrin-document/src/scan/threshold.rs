// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Adaptive mean thresholding over a summed-area table.

use image::{GrayImage, Luma};
use tracing::{debug, instrument};

/// Binarise `gray` against a local mean threshold.
///
/// For each pixel the threshold is the mean intensity of the
/// `(2 * block_radius + 1)` square centred on it, minus `offset`. Pixels
/// darker than their threshold become black (0); others become white (255).
#[instrument(skip(gray), fields(width = gray.width(), height = gray.height()))]
pub fn adaptive_threshold(gray: &GrayImage, block_radius: u32, offset: i32) -> GrayImage {
    let sums = SummedArea::build(gray);

    let output = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let mean = sums.window_mean(x, y, block_radius).round() as i32;
        let threshold = (mean - offset).clamp(0, 255);
        let value = i32::from(gray.get_pixel(x, y).0[0]);
        Luma([if value < threshold { 0u8 } else { 255u8 }])
    });

    debug!(block_radius, offset, "Adaptive threshold complete");
    output
}

/// Summed-area table with one row and one column of zero padding, so cell
/// `(x, y)` covers every pixel strictly above and left of it.
struct SummedArea {
    width: usize,
    height: usize,
    cells: Vec<u64>,
}

impl SummedArea {
    fn build(gray: &GrayImage) -> Self {
        let width = gray.width() as usize;
        let height = gray.height() as usize;
        let stride = width + 1;
        let mut cells = vec![0u64; stride * (height + 1)];

        if width > 0 {
            for (y, row) in gray.as_raw().chunks_exact(width).enumerate() {
                let mut running = 0u64;
                for (x, &value) in row.iter().enumerate() {
                    running += u64::from(value);
                    cells[(y + 1) * stride + x + 1] = cells[y * stride + x + 1] + running;
                }
            }
        }

        Self {
            width,
            height,
            cells,
        }
    }

    fn at(&self, x: usize, y: usize) -> u64 {
        self.cells[y * (self.width + 1) + x]
    }

    /// Mean over the `(2 * radius + 1)` square centred on `(x, y)`, cut off
    /// at the image edges. An empty window reads as mid-gray.
    fn window_mean(&self, x: u32, y: u32, radius: u32) -> f64 {
        let (x, y, radius) = (x as usize, y as usize, radius as usize);
        let (left, top) = (x.saturating_sub(radius), y.saturating_sub(radius));
        let right = (x + radius + 1).min(self.width);
        let bottom = (y + radius + 1).min(self.height);
        if right <= left || bottom <= top {
            return 128.0;
        }

        let total = (self.at(right, bottom) + self.at(left, top))
            - (self.at(right, top) + self.at(left, bottom));
        total as f64 / ((right - left) * (bottom - top)) as f64
    }
}
