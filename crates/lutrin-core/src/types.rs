// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Lutrin page-reading pipeline.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A camera resolution in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width divided by height. Zero-height resolutions report 0.
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            return 0.0;
        }
        self.width as f64 / self.height as f64
    }

    /// The resolution with the given width and the same aspect ratio,
    /// rounding the height to the nearest pixel.
    pub fn scaled_to_width(&self, width: u32) -> Self {
        if self.width == 0 {
            return *self;
        }
        let w = self.width as u64;
        let height = (width as u64 * self.height as u64 + w / 2) / w;
        Self {
            width,
            height: height as u32,
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A resolution plus whether the device echoed it back exactly on readback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionProfile {
    pub resolution: Resolution,
    /// `true` when the device accepted and reported exactly this resolution.
    pub confirmed: bool,
}

impl ResolutionProfile {
    pub fn confirmed(resolution: Resolution) -> Self {
        Self {
            resolution,
            confirmed: true,
        }
    }

    pub fn unconfirmed(resolution: Resolution) -> Self {
        Self {
            resolution,
            confirmed: false,
        }
    }
}

/// Lifecycle of the shared camera as seen by operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraStatus {
    /// The device has not been touched yet (initialisation is lazy).
    Uninitialized,
    /// Open and configured for preview.
    Ready {
        maximum: ResolutionProfile,
        streaming: ResolutionProfile,
    },
    /// Opening failed or the manager was shut down. Never retried.
    Disabled { reason: String },
}

/// Result of a high-resolution capture request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// The still was written to this path.
    Saved(PathBuf),
    /// Human-readable reason the capture did not complete.
    Failed(String),
}

impl CaptureOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Saved(_))
    }

    /// Saved path, if any.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::Saved(path) => Some(path),
            Self::Failed(_) => None,
        }
    }
}

/// File name used for captures written into a directory.
pub fn capture_file_name(at: DateTime<Utc>) -> String {
    format!("capture_{}.jpg", at.timestamp())
}

/// Sampling density of a source image (dots per inch).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Density {
    Known(f32),
    /// No hint embedded, or the hint was zero.
    Unknown,
}

impl Density {
    /// Builds a density from an optional hint; absent or non-positive hints
    /// are unknown.
    pub fn from_hint(hint: Option<f32>) -> Self {
        match hint {
            Some(dpi) if dpi.is_finite() && dpi > 0.0 => Self::Known(dpi),
            _ => Self::Unknown,
        }
    }

    pub fn dpi(&self) -> Option<f32> {
        match self {
            Self::Known(dpi) => Some(*dpi),
            Self::Unknown => None,
        }
    }
}

/// A 2-D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// One unit of recognised text plus its bounding polygon.
///
/// Polygons are in the coordinate space of the image handed to the
/// recognition engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    pub text: String,
    pub polygon: Vec<Point>,
}

impl TextFragment {
    pub fn new(text: impl Into<String>, polygon: Vec<Point>) -> Self {
        Self {
            text: text.into(),
            polygon,
        }
    }

    /// Mean x of the polygon vertices.
    pub fn centroid_x(&self) -> Option<f32> {
        if self.polygon.is_empty() {
            return None;
        }
        let sum: f32 = self.polygon.iter().map(|p| p.x).sum();
        Some(sum / self.polygon.len() as f32)
    }

    /// Smallest y of the polygon vertices.
    pub fn top(&self) -> Option<f32> {
        self.polygon.iter().map(|p| p.y).reduce(f32::min)
    }

    /// Largest x of the polygon vertices.
    pub fn max_x(&self) -> Option<f32> {
        self.polygon.iter().map(|p| p.x).reduce(f32::max)
    }
}

/// Which half of a two-page spread a fragment belongs to.
///
/// Ordering is reading order: `Left < Right`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Page {
    Left,
    Right,
}

/// Per-fragment sort key derived during reconstruction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageAssignment {
    /// Index of the fragment in the input slice.
    pub index: usize,
    pub page: Page,
    /// Top coordinate of the fragment's polygon.
    pub top: f32,
}

/// Fragments in reading order and their joined text.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct OrderedTranscript {
    pub text: String,
    pub fragments: Vec<TextFragment>,
    pub word_count: usize,
}

impl OrderedTranscript {
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

impl std::fmt::Display for OrderedTranscript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}
