// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::types::Resolution;

/// Name of the persisted config file inside the data directory.
pub const CONFIG_FILE: &str = "config.json";

/// Persistent application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub camera: CameraConfig,
    pub normalizer: NormalizerConfig,
    /// Where captures and the config live. `None` uses the platform default.
    pub data_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Load `config.json` from `dir`, falling back to defaults when the file
    /// is missing or unreadable.
    pub fn load_or_default(dir: &Path) -> Self {
        let path = dir.join(CONFIG_FILE);
        let data = match std::fs::read_to_string(&path) {
            Ok(data) => data,
            Err(_) => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Self::default();
            }
        };
        match serde_json::from_str(&data) {
            Ok(config) => config,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "config unreadable, using defaults");
                Self::default()
            }
        }
    }

    /// Write this config as pretty JSON into `dir`.
    pub fn persist(&self, dir: &Path) -> Result<()> {
        let path = dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;
        Ok(())
    }
}

/// Camera negotiation and pacing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Fixed index of the physical device.
    pub device_index: u32,
    /// Probed from first to last; the first exact readback wins.
    pub candidate_resolutions: Vec<Resolution>,
    /// Maximum resolution assumed when no candidate is confirmed.
    pub fallback_resolution: Resolution,
    /// Width of the preview stream; height follows the maximum's aspect ratio.
    pub stream_width: u32,
    /// Pause between preview frames.
    pub frame_interval_ms: u64,
    /// Pause after the device is first opened.
    pub open_settle_ms: u64,
    /// Pause after each probe candidate is requested.
    pub probe_settle_ms: u64,
    /// Pause after switching to or from the capture resolution.
    pub capture_settle_ms: u64,
    /// JPEG quality for preview frames and captures (1-100).
    pub jpeg_quality: u8,
}

impl CameraConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn open_settle(&self) -> Duration {
        Duration::from_millis(self.open_settle_ms)
    }

    pub fn probe_settle(&self) -> Duration {
        Duration::from_millis(self.probe_settle_ms)
    }

    pub fn capture_settle(&self) -> Duration {
        Duration::from_millis(self.capture_settle_ms)
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device_index: 0,
            candidate_resolutions: vec![
                Resolution::new(3840, 2160),
                Resolution::new(2560, 1440),
                Resolution::new(1920, 1080),
                Resolution::new(1280, 720),
                Resolution::new(640, 480),
            ],
            fallback_resolution: Resolution::new(1280, 720),
            stream_width: 640,
            frame_interval_ms: 30,
            open_settle_ms: 1000,
            probe_settle_ms: 200,
            capture_settle_ms: 500,
            jpeg_quality: 80,
        }
    }
}

/// Page geometry normalisation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Density the recogniser expects; lower known densities are upscaled.
    pub target_dpi: f32,
    /// Largest upscale factor applied; a declared density needing more is
    /// treated as bogus and the resample is skipped.
    pub max_upscale_factor: f32,
    /// Pixel count the upscaled page may not exceed.
    pub max_output_pixels: u64,
    /// How many of the largest contours are tried as page boundary.
    pub max_candidates: usize,
    /// Polygon approximation tolerance as a fraction of contour perimeter.
    pub approx_epsilon_ratio: f64,
    pub detect_blur_sigma: f32,
    pub detect_block_radius: u32,
    pub detect_offset: i32,
    pub canny_low: f32,
    pub canny_high: f32,
    pub final_blur_sigma: f32,
    pub final_block_radius: u32,
    pub final_offset: i32,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            target_dpi: 300.0,
            max_upscale_factor: 8.0,
            max_output_pixels: 150_000_000,
            max_candidates: 10,
            approx_epsilon_ratio: 0.02,
            detect_blur_sigma: 1.1,
            detect_block_radius: 5,
            detect_offset: 2,
            canny_low: 50.0,
            canny_high: 200.0,
            final_blur_sigma: 0.8,
            final_block_radius: 7,
            final_offset: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_probe_list() {
        let config = CameraConfig::default();
        assert_eq!(config.candidate_resolutions.first(), Some(&Resolution::new(3840, 2160)));
        assert_eq!(config.candidate_resolutions.last(), Some(&Resolution::new(640, 480)));
        assert_eq!(config.stream_width, 640);
        assert_eq!(config.frame_interval(), Duration::from_millis(30));
    }

    #[test]
    fn persist_then_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = AppConfig::default();
        config.camera.stream_width = 800;
        config.normalizer.target_dpi = 400.0;
        config.persist(dir.path()).expect("persist");

        let loaded = AppConfig::load_or_default(dir.path());
        assert_eq!(loaded.camera.stream_width, 800);
        assert_eq!(loaded.normalizer.target_dpi, 400.0);
    }

    #[test]
    fn missing_or_corrupt_config_uses_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let loaded = AppConfig::load_or_default(dir.path());
        assert_eq!(loaded.camera.stream_width, 640);

        std::fs::write(dir.path().join(CONFIG_FILE), "{ not json").expect("write");
        let loaded = AppConfig::load_or_default(dir.path());
        assert_eq!(loaded.normalizer.max_candidates, 10);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "camera": { "stream_width": 320 } }"#).expect("parse");
        assert_eq!(config.camera.stream_width, 320);
        assert_eq!(config.camera.jpeg_quality, 80);
        assert!(config.data_dir.is_none());
    }
}
