// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer — owns the shared camera, the page normaliser and
// the resolved storage locations, and exposes one method per operator
// command.

use std::path::{Path, PathBuf};

use lutrin_camera::{CameraDevice, CameraManager, CancelToken, PreviewFrame, SimulatedCamera};
use lutrin_core::config::AppConfig;
use lutrin_core::error::{LutrinError, Result};
use lutrin_core::{CameraStatus, CaptureOutcome, OrderedTranscript, Resolution};
use lutrin_document::text::reading_order::parse_fragments;
use lutrin_document::text::transcribe;
use lutrin_document::{PageNormalizer, RectifiedPage, TextRecognizer, reconstruct};
use serde::Serialize;
use tracing::{info, warn};

use super::data_dir;

/// Subdirectory of the data directory holding stills and normalised pages.
const CAPTURES_DIR: &str = "captures";

/// Counters from a bounded preview run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreviewSummary {
    pub frames: usize,
    pub bytes: usize,
    /// Set when the camera was unavailable and the stream yielded its notice.
    pub unavailable: Option<String>,
}

/// Shared application services used by every command.
pub struct AppServices {
    config: AppConfig,
    config_dir: PathBuf,
    data_dir: PathBuf,
    camera: CameraManager,
    normalizer: PageNormalizer,
}

impl AppServices {
    /// Resolve directories, load the persisted config and wrap the camera.
    ///
    /// With `simulate`, an in-memory camera replaces the platform driver.
    pub fn init(simulate: bool) -> Result<Self> {
        let config_dir = data_dir::data_dir(None)?;
        let config = AppConfig::load_or_default(&config_dir);
        let data_dir = data_dir::data_dir(config.data_dir.as_deref())?;
        info!(
            config_dir = %config_dir.display(),
            data_dir = %data_dir.display(),
            simulate,
            "Initialising app services"
        );

        let device: Box<dyn CameraDevice> = if simulate {
            Box::new(simulated_stand_camera())
        } else {
            lutrin_camera::default_device(config.camera.device_index)
        };
        Ok(Self::with_device(config, config_dir, data_dir, device))
    }

    pub fn with_device(
        config: AppConfig,
        config_dir: PathBuf,
        data_dir: PathBuf,
        device: Box<dyn CameraDevice>,
    ) -> Self {
        let camera = CameraManager::new(device, config.camera.clone());
        let normalizer = PageNormalizer::new(config.normalizer.clone());
        Self {
            config,
            config_dir,
            data_dir,
            camera,
            normalizer,
        }
    }

    /// Write the active config (defaults included) to `config.json`.
    pub fn persist_config(&self) -> Result<PathBuf> {
        self.config.persist(&self.config_dir)?;
        Ok(self.config_dir.join(lutrin_core::config::CONFIG_FILE))
    }

    fn captures_dir(&self) -> Result<PathBuf> {
        Ok(data_dir::data_subdir(&self.data_dir, CAPTURES_DIR)?)
    }

    // -- Camera --------------------------------------------------------------

    /// Open the camera if needed and report its state.
    pub fn status(&self) -> CameraStatus {
        if let Err(err) = self.camera.initialize() {
            warn!(error = %err, "Camera unavailable");
        }
        self.camera.status()
    }

    /// Pull up to `frames` preview frames, writing them as JPEG into
    /// `output` when given.
    pub fn preview(&self, frames: usize, output: Option<&Path>) -> Result<PreviewSummary> {
        if let Some(dir) = output {
            std::fs::create_dir_all(dir)?;
        }
        let mut summary = PreviewSummary::default();
        for frame in self.camera.preview(CancelToken::new()).take(frames) {
            match frame {
                PreviewFrame::Jpeg(bytes) => {
                    if let Some(dir) = output {
                        let path = dir.join(format!("preview_{:04}.jpg", summary.frames));
                        std::fs::write(path, &bytes)?;
                    }
                    summary.frames += 1;
                    summary.bytes += bytes.len();
                }
                PreviewFrame::Unavailable(notice) => summary.unavailable = Some(notice),
            }
        }
        info!(frames = summary.frames, bytes = summary.bytes, "Preview finished");
        Ok(summary)
    }

    /// Take a still, into `output` or the captures directory.
    pub fn capture(&self, output: Option<&Path>) -> Result<CaptureOutcome> {
        let destination = match output {
            Some(path) => path.to_path_buf(),
            None => self.captures_dir()?,
        };
        Ok(self.camera.capture(&destination))
    }

    pub fn shutdown(&self) {
        self.camera.shutdown();
    }

    // -- Pages ---------------------------------------------------------------

    pub fn normalize(&self, input: &Path, output: Option<&Path>) -> Result<RectifiedPage> {
        self.normalizer.normalize_file(input, output)
    }

    /// Order the fragments stored as JSON at `path`.
    pub fn reconstruct(&self, path: &Path) -> Result<OrderedTranscript> {
        let json = std::fs::read_to_string(path)?;
        let fragments = parse_fragments(&json)?;
        let transcript = reconstruct(&fragments);
        info!(words = transcript.word_count, "Transcript reconstructed");
        Ok(transcript)
    }

    /// Capture, normalise, recognise and order one spread.
    pub fn read(&self, recognizer: &dyn TextRecognizer) -> Result<OrderedTranscript> {
        let still = match self.capture(None)? {
            CaptureOutcome::Saved(path) => path,
            CaptureOutcome::Failed(reason) => return Err(LutrinError::ReadFailure(reason)),
        };
        let page_path = still.with_extension("page.png");
        let page = self.normalize(&still, Some(&page_path))?;
        transcribe(recognizer, &page)
    }
}

/// The simulated stand camera: a 1080p webcam that also offers 720p and the
/// 640x360 preview mode.
fn simulated_stand_camera() -> SimulatedCamera {
    SimulatedCamera::new(vec![
        Resolution::new(1920, 1080),
        Resolution::new(1280, 720),
        Resolution::new(640, 360),
    ])
}
