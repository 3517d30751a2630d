// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Camera resource manager — owns the single physical device.
//
// The device is opened lazily on first use. Opening it probes the highest
// resolution the driver really applies, derives a preview resolution of the
// same aspect ratio, and leaves the device configured for preview. A failed
// open disables the camera for the rest of the process.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use lutrin_core::config::CameraConfig;
use lutrin_core::error::{LutrinError, Result};
use lutrin_core::types::{
    CameraStatus, CaptureOutcome, Resolution, ResolutionProfile, capture_file_name,
};
use parking_lot::Mutex;
use tracing::{debug, error, info, instrument, warn};

use crate::preview::{CancelToken, PreviewStream};
use crate::traits::{CameraDevice, Readiness};

/// Interval between readiness polls inside a settle window.
const READY_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Shared handle to the camera.
///
/// Cloning is cheap and every clone arbitrates the same device, so the
/// preview loop and capture requests can run on different threads.
#[derive(Clone)]
pub struct CameraManager {
    shared: Arc<Shared>,
}

struct Shared {
    config: CameraConfig,
    state: Mutex<CameraState>,
}

enum CameraState {
    /// Not opened yet; holds the driver until first use.
    Uninitialized(Box<dyn CameraDevice>),
    Ready(CameraHandle),
    /// Open failed, or the manager was shut down.
    Disabled(String),
}

/// The open device plus what was negotiated with it.
///
/// Only reachable through the manager's lock.
pub struct CameraHandle {
    device: Box<dyn CameraDevice>,
    maximum: ResolutionProfile,
    streaming: ResolutionProfile,
    /// Last resolution read back from the device.
    current: Resolution,
}

impl CameraHandle {
    pub fn maximum(&self) -> ResolutionProfile {
        self.maximum
    }

    pub fn streaming(&self) -> ResolutionProfile {
        self.streaming
    }

    pub fn current(&self) -> Resolution {
        self.current
    }

    /// Request `resolution`, settle, and record what the device applied.
    fn apply(&mut self, resolution: Resolution, window: Duration) -> Result<Resolution> {
        let applied = apply_resolution(self.device.as_mut(), resolution, window)?;
        self.current = applied;
        Ok(applied)
    }

    /// Reconfigure to maximum, read one frame, write it, reconfigure back.
    ///
    /// The previous configuration is restored on every path, including when
    /// the read or the write fails.
    fn capture_still(&mut self, destination: &Path, config: &CameraConfig) -> Result<PathBuf> {
        let previous = self.current;
        let maximum = self.maximum.resolution;
        info!(from = %previous, to = %maximum, "Switching to capture resolution");

        let result = self
            .apply(maximum, config.capture_settle())
            .and_then(|_| self.device.read_frame())
            .and_then(|frame| {
                let path = resolve_capture_path(destination)?;
                frame.save_jpeg(&path, config.jpeg_quality)?;
                info!(path = %path.display(), resolution = %frame.resolution(), "Capture saved");
                Ok(path)
            });

        match self.apply(previous, config.capture_settle()) {
            Ok(restored) if restored == previous => {
                debug!(resolution = %restored, "Preview resolution restored");
            }
            Ok(restored) => {
                warn!(expected = %previous, actual = %restored, "Device restored to a different resolution");
            }
            Err(err) => {
                warn!(error = %err, "Failed to restore preview resolution");
            }
        }

        result
    }
}

impl Drop for CameraHandle {
    fn drop(&mut self) {
        if self.device.is_open() {
            info!(device = self.device.name(), "Closing camera");
            self.device.close();
        }
    }
}

impl CameraManager {
    /// Wrap `device`. Nothing touches the hardware until the first preview,
    /// capture or [`initialize`](Self::initialize) call.
    pub fn new(device: Box<dyn CameraDevice>, config: CameraConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(CameraState::Uninitialized(device)),
            }),
        }
    }

    pub fn config(&self) -> &CameraConfig {
        &self.shared.config
    }

    /// Open and negotiate now instead of on first use.
    pub fn initialize(&self) -> Result<()> {
        self.with_handle(|_| ())
    }

    pub fn status(&self) -> CameraStatus {
        match &*self.shared.state.lock() {
            CameraState::Uninitialized(_) => CameraStatus::Uninitialized,
            CameraState::Ready(handle) => CameraStatus::Ready {
                maximum: handle.maximum,
                streaming: handle.streaming,
            },
            CameraState::Disabled(reason) => CameraStatus::Disabled {
                reason: reason.clone(),
            },
        }
    }

    /// Close the device. Later requests fail as unavailable.
    pub fn shutdown(&self) {
        let mut state = self.shared.state.lock();
        // Dropping a Ready handle closes the device.
        *state = CameraState::Disabled("camera shut down".into());
        info!("Camera manager shut down");
    }

    /// Rate-limited preview frames, ending on the first read failure or when
    /// `cancel` fires.
    pub fn preview(&self, cancel: CancelToken) -> PreviewStream {
        PreviewStream::new(self.clone(), cancel, self.shared.config.frame_interval())
    }

    /// Take a high-resolution still and write it as JPEG.
    ///
    /// `destination` is either a file path or an existing directory, in
    /// which case the file is named `capture_<unix-seconds>.jpg`. The lock is
    /// held for the whole reconfigure-read-restore cycle, so no preview frame
    /// is read in between. Never panics or returns an error.
    #[instrument(skip(self), fields(destination = %destination.display()))]
    pub fn capture(&self, destination: &Path) -> CaptureOutcome {
        let config = &self.shared.config;
        match self.with_handle(|handle| handle.capture_still(destination, config)) {
            Ok(Ok(path)) => CaptureOutcome::Saved(path),
            Ok(Err(err)) | Err(err) => {
                warn!(error = %err, "Capture failed");
                CaptureOutcome::Failed(err.to_string())
            }
        }
    }

    /// Read one preview frame and encode it, holding the lock only for the
    /// read and the encode.
    pub(crate) fn read_preview_jpeg(&self) -> Result<Vec<u8>> {
        let quality = self.shared.config.jpeg_quality;
        self.with_handle(|handle| {
            let frame = handle.device.read_frame()?;
            frame.encode_jpeg(quality)
        })?
    }

    /// Run `f` on the open handle under the device lock, opening the device
    /// first if needed.
    pub fn with_handle<R>(&self, f: impl FnOnce(&mut CameraHandle) -> R) -> Result<R> {
        let mut state = self.shared.state.lock();

        if matches!(*state, CameraState::Uninitialized(_)) {
            let placeholder = CameraState::Disabled("initialisation interrupted".into());
            if let CameraState::Uninitialized(device) = std::mem::replace(&mut *state, placeholder)
            {
                *state = match open_and_negotiate(device, &self.shared.config) {
                    Ok(handle) => CameraState::Ready(handle),
                    Err(reason) => CameraState::Disabled(reason),
                };
            }
        }

        match &mut *state {
            CameraState::Ready(handle) => Ok(f(handle)),
            CameraState::Disabled(reason) => Err(LutrinError::DeviceUnavailable(reason.clone())),
            CameraState::Uninitialized(_) => Err(LutrinError::DeviceUnavailable(
                "camera not initialised".into(),
            )),
        }
    }
}

/// Open, probe and configure for preview. On failure returns the reason the
/// camera is disabled.
#[instrument(skip_all, fields(device = device.name()))]
fn open_and_negotiate(
    mut device: Box<dyn CameraDevice>,
    config: &CameraConfig,
) -> std::result::Result<CameraHandle, String> {
    if let Err(err) = device.open() {
        error!(error = %err, "Unable to open camera; preview and capture disabled");
        return Err(err.to_string());
    }
    info!("Camera opened");
    settle(device.as_mut(), config.open_settle());

    let maximum = probe_maximum(
        device.as_mut(),
        &config.candidate_resolutions,
        config.fallback_resolution,
        config.probe_settle(),
    );

    // Always finish on the streaming resolution, never on the last probe.
    let target = maximum.resolution.scaled_to_width(config.stream_width);
    let (streaming, current) = match apply_resolution(device.as_mut(), target, config.probe_settle())
    {
        Ok(applied) => (
            ResolutionProfile {
                resolution: target,
                confirmed: applied == target,
            },
            applied,
        ),
        Err(err) => {
            warn!(error = %err, target = %target, "Failed to configure streaming resolution");
            let current = device.resolution().unwrap_or(target);
            (ResolutionProfile::unconfirmed(target), current)
        }
    };

    info!(
        maximum = %maximum.resolution,
        maximum_confirmed = maximum.confirmed,
        streaming = %streaming.resolution,
        streaming_confirmed = streaming.confirmed,
        "Camera negotiated"
    );

    Ok(CameraHandle {
        device,
        maximum,
        streaming,
        current,
    })
}

/// Find the first candidate the device applies exactly.
///
/// Candidates are tried in order, so list them from highest to lowest. A
/// candidate that errors is skipped. When none is confirmed, `fallback` is
/// returned unconfirmed.
pub fn probe_maximum(
    device: &mut dyn CameraDevice,
    candidates: &[Resolution],
    fallback: Resolution,
    window: Duration,
) -> ResolutionProfile {
    for &candidate in candidates {
        match apply_resolution(device, candidate, window) {
            Ok(applied) if applied == candidate => {
                info!(resolution = %candidate, "Maximum resolution confirmed");
                return ResolutionProfile::confirmed(candidate);
            }
            Ok(applied) => {
                debug!(requested = %candidate, applied = %applied, "Resolution not supported");
            }
            Err(err) => {
                debug!(requested = %candidate, error = %err, "Resolution request failed");
            }
        }
    }
    warn!(fallback = %fallback, "No candidate resolution confirmed; using fallback");
    ResolutionProfile::unconfirmed(fallback)
}

/// Request a resolution, wait for it to settle, and read back the result.
fn apply_resolution(
    device: &mut dyn CameraDevice,
    resolution: Resolution,
    window: Duration,
) -> Result<Resolution> {
    device.set_resolution(resolution)?;
    settle(device, window);
    device.resolution()
}

/// Wait for a reconfiguration to take effect.
///
/// Polls the device when it reports readiness, giving up after `window`;
/// otherwise sleeps for the whole window.
pub(crate) fn settle(device: &mut dyn CameraDevice, window: Duration) {
    if window.is_zero() {
        return;
    }
    match device.poll_ready() {
        Readiness::Ready => {}
        Readiness::Unsupported => thread::sleep(window),
        Readiness::Pending => {
            let deadline = Instant::now() + window;
            loop {
                let now = Instant::now();
                if now >= deadline {
                    warn!(?window, "Device not ready after settle window");
                    break;
                }
                thread::sleep(READY_POLL_INTERVAL.min(deadline - now));
                if device.poll_ready() != Readiness::Pending {
                    break;
                }
            }
        }
    }
}

/// Directories get a timestamped file name; anything else is used as-is.
fn resolve_capture_path(destination: &Path) -> Result<PathBuf> {
    if destination.is_dir() {
        return Ok(destination.join(capture_file_name(Utc::now())));
    }
    if let Some(parent) = destination.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(destination.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulated::{DeviceOp, SimulatedCamera};

    fn fast_config() -> CameraConfig {
        CameraConfig {
            frame_interval_ms: 0,
            open_settle_ms: 0,
            probe_settle_ms: 0,
            capture_settle_ms: 0,
            ..CameraConfig::default()
        }
    }

    fn hd_and_vga() -> Vec<Resolution> {
        vec![Resolution::new(1280, 720), Resolution::new(640, 480)]
    }

    #[test]
    fn probe_selects_highest_accepted_candidate() {
        let cam = SimulatedCamera::new(hd_and_vga());
        let manager = CameraManager::new(Box::new(cam), fast_config());
        manager.initialize().expect("initialise");

        match manager.status() {
            CameraStatus::Ready { maximum, streaming } => {
                assert_eq!(maximum, ResolutionProfile::confirmed(Resolution::new(1280, 720)));
                assert_eq!(streaming.resolution, Resolution::new(640, 360));
            }
            other => panic!("unexpected status {other:?}"),
        }
    }

    #[test]
    fn probe_over_arbitrary_subsets() {
        let all = CameraConfig::default().candidate_resolutions;
        for mask in 1u32..(1 << all.len()) {
            let accepted: Vec<Resolution> = all
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, r)| *r)
                .collect();
            let mut cam = SimulatedCamera::new(accepted.clone());
            cam.open().expect("open");
            let profile =
                probe_maximum(&mut cam, &all, Resolution::new(1, 1), Duration::ZERO);

            assert!(profile.confirmed);
            assert_eq!(profile.resolution, accepted[0]);

            let streaming = profile.resolution.scaled_to_width(640);
            let ratio_in = profile.resolution.aspect_ratio();
            let ratio_out = streaming.aspect_ratio();
            assert!((ratio_in - ratio_out).abs() < 0.01, "{ratio_in} vs {ratio_out}");
        }
    }

    #[test]
    fn probe_falls_back_when_nothing_matches() {
        let mut cam = SimulatedCamera::new(vec![Resolution::new(800, 600)]);
        cam.open().expect("open");
        let candidates = [Resolution::new(1920, 1080), Resolution::new(1280, 720)];
        let profile = probe_maximum(
            &mut cam,
            &candidates,
            Resolution::new(1280, 720),
            Duration::ZERO,
        );
        assert_eq!(profile, ResolutionProfile::unconfirmed(Resolution::new(1280, 720)));
    }

    #[test]
    fn initialisation_ends_on_streaming_resolution() {
        let cam = SimulatedCamera::new(vec![
            Resolution::new(1280, 720),
            Resolution::new(640, 360),
            Resolution::new(640, 480),
        ]);
        let probe = cam.probe();
        let manager = CameraManager::new(Box::new(cam), fast_config());
        manager.initialize().expect("initialise");

        // The last probe would have been 1280x720; streaming must win.
        assert_eq!(probe.current_resolution(), Resolution::new(640, 360));
        assert_eq!(
            probe.ops().last(),
            Some(&DeviceOp::SetResolution(Resolution::new(640, 360)))
        );
        match manager.status() {
            CameraStatus::Ready { streaming, .. } => assert!(streaming.confirmed),
            other => panic!("unexpected status {other:?}"),
        }
    }

    #[test]
    fn initialisation_is_lazy() {
        let cam = SimulatedCamera::new(hd_and_vga());
        let probe = cam.probe();
        let manager = CameraManager::new(Box::new(cam), fast_config());
        assert_eq!(manager.status(), CameraStatus::Uninitialized);
        assert!(probe.ops().is_empty());
    }

    #[test]
    fn failed_open_disables_permanently() {
        let manager = CameraManager::new(Box::new(SimulatedCamera::unplugged()), fast_config());
        assert!(matches!(
            manager.initialize(),
            Err(LutrinError::DeviceUnavailable(_))
        ));
        assert!(matches!(manager.status(), CameraStatus::Disabled { .. }));

        let dir = tempfile::tempdir().expect("tempdir");
        let outcome = manager.capture(dir.path());
        assert!(!outcome.is_success());
        assert!(matches!(manager.status(), CameraStatus::Disabled { .. }));
    }

    #[test]
    fn capture_restores_streaming_configuration() {
        let cam = SimulatedCamera::new(vec![
            Resolution::new(1280, 720),
            Resolution::new(640, 360),
        ]);
        let probe = cam.probe();
        let manager = CameraManager::new(Box::new(cam), fast_config());
        manager.initialize().expect("initialise");
        let before = probe.current_resolution();

        let dir = tempfile::tempdir().expect("tempdir");
        let outcome = manager.capture(dir.path());
        let path = outcome.path().expect("capture saved").to_path_buf();

        assert_eq!(probe.current_resolution(), before);
        let still = image::open(&path).expect("decode still");
        assert_eq!((still.width(), still.height()), (1280, 720));
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        assert!(name.starts_with("capture_") && name.ends_with(".jpg"), "{name}");

        let reads: Vec<_> = probe
            .ops()
            .into_iter()
            .filter_map(|op| match op {
                DeviceOp::Read(r) => Some(r),
                _ => None,
            })
            .collect();
        assert_eq!(reads, vec![Resolution::new(1280, 720)]);
    }

    #[test]
    fn capture_read_failure_still_restores() {
        let cam = SimulatedCamera::new(vec![
            Resolution::new(1280, 720),
            Resolution::new(640, 360),
        ]);
        let probe = cam.probe();
        let manager = CameraManager::new(Box::new(cam), fast_config());
        manager.initialize().expect("initialise");
        let before = probe.current_resolution();

        probe.fail_next_reads(1);
        let dir = tempfile::tempdir().expect("tempdir");
        match manager.capture(&dir.path().join("page.jpg")) {
            CaptureOutcome::Failed(reason) => assert!(reason.contains("read")),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(probe.current_resolution(), before);
        assert!(probe.is_open());

        // The handle survives a transient failure.
        assert!(manager.capture(&dir.path().join("page.jpg")).is_success());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn capture_write_failure_is_reported() {
        let cam = SimulatedCamera::new(hd_and_vga());
        let probe = cam.probe();
        let manager = CameraManager::new(Box::new(cam), fast_config());
        manager.initialize().expect("initialise");
        let before = probe.current_resolution();

        // Every write to /dev/full fails with ENOSPC.
        match manager.capture(Path::new("/dev/full")) {
            CaptureOutcome::Failed(reason) => assert!(!reason.is_empty()),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(probe.current_resolution(), before);
    }

    #[test]
    fn capture_to_explicit_file_creates_parents() {
        let manager = CameraManager::new(
            Box::new(SimulatedCamera::new(hd_and_vga())),
            fast_config(),
        );
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("nested").join("left.jpg");
        let outcome = manager.capture(&target);
        assert_eq!(outcome, CaptureOutcome::Saved(target.clone()));
        assert!(target.exists());
    }

    #[test]
    fn shutdown_closes_device() {
        let cam = SimulatedCamera::new(hd_and_vga());
        let probe = cam.probe();
        let manager = CameraManager::new(Box::new(cam), fast_config());
        manager.initialize().expect("initialise");
        assert!(probe.is_open());

        manager.shutdown();
        assert!(!probe.is_open());
        assert_eq!(probe.ops().last(), Some(&DeviceOp::Close));
        assert!(manager.initialize().is_err());
    }

    #[test]
    fn settle_polls_until_ready() {
        let mut cam = SimulatedCamera::new(hd_and_vga()).with_readiness(3);
        cam.open().expect("open");
        cam.set_resolution(Resolution::new(640, 480)).expect("set");

        let started = Instant::now();
        settle(&mut cam, Duration::from_secs(5));
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(cam.poll_ready(), Readiness::Ready);
    }

    #[test]
    fn concurrent_captures_never_interleave() {
        let cam = SimulatedCamera::new(vec![
            Resolution::new(1280, 720),
            Resolution::new(640, 360),
        ]);
        let probe = cam.probe();
        let manager = CameraManager::new(Box::new(cam), fast_config());
        manager.initialize().expect("initialise");
        let dir = tempfile::tempdir().expect("tempdir");

        let workers: Vec<_> = (0..4)
            .map(|i| {
                let manager = manager.clone();
                let path = dir.path().join(format!("still_{i}.jpg"));
                thread::spawn(move || manager.capture(&path))
            })
            .collect();
        for worker in workers {
            assert!(worker.join().expect("join").is_success());
        }

        // Every capture read happens at maximum, bracketed by its own
        // switch to maximum and back to streaming.
        let ops = probe.ops();
        for (i, op) in ops.iter().enumerate() {
            if let DeviceOp::Read(r) = op {
                assert_eq!(*r, Resolution::new(1280, 720));
                assert_eq!(
                    ops[i - 1],
                    DeviceOp::SetResolution(Resolution::new(1280, 720))
                );
                assert_eq!(
                    ops[i + 1],
                    DeviceOp::SetResolution(Resolution::new(640, 360))
                );
            }
        }
    }
}
