// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory camera used by tests and by `lutrin --simulate`.
//
// Behaves like a UVC webcam: requests for unsupported resolutions are
// snapped to the nearest supported mode rather than rejected, so callers
// must read back what was applied.

use std::sync::Arc;

use image::{Rgb, RgbImage};
use lutrin_core::Resolution;
use lutrin_core::error::{LutrinError, Result};
use parking_lot::Mutex;

use crate::frame::CapturedFrame;
use crate::traits::{CameraDevice, Readiness};

/// A command the simulated device received, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceOp {
    Open,
    SetResolution(Resolution),
    /// A frame read at the resolution active at the time.
    Read(Resolution),
    Close,
}

#[derive(Debug)]
struct SimState {
    accepted: Vec<Resolution>,
    current: Resolution,
    open: bool,
    fail_open: bool,
    failing_reads: usize,
    fail_all_reads: bool,
    /// Polls reporting `Pending` after each reconfiguration; `None` means
    /// readiness is unsupported.
    ready_after_polls: Option<u32>,
    pending_polls: u32,
    ops: Vec<DeviceOp>,
}

/// Simulated camera supporting a fixed set of resolutions.
pub struct SimulatedCamera {
    name: String,
    state: Arc<Mutex<SimState>>,
}

impl SimulatedCamera {
    /// A device that accepts exactly `accepted`. The first entry is the
    /// power-on mode.
    pub fn new(accepted: Vec<Resolution>) -> Self {
        let current = accepted
            .first()
            .copied()
            .unwrap_or(Resolution::new(640, 480));
        Self {
            name: "simulated camera".to_string(),
            state: Arc::new(Mutex::new(SimState {
                accepted,
                current,
                open: false,
                fail_open: false,
                failing_reads: 0,
                fail_all_reads: false,
                ready_after_polls: None,
                pending_polls: 0,
                ops: Vec::new(),
            })),
        }
    }

    /// A device whose `open` always fails.
    pub fn unplugged() -> Self {
        let cam = Self::new(vec![Resolution::new(640, 480)]);
        cam.state.lock().fail_open = true;
        cam
    }

    /// Report `Pending` for `polls` readiness polls after every resolution
    /// change, then `Ready`.
    pub fn with_readiness(self, polls: u32) -> Self {
        self.state.lock().ready_after_polls = Some(polls);
        self
    }

    /// Handle for inspecting and steering the device after it has been moved
    /// into a manager.
    pub fn probe(&self) -> SimulatedCameraProbe {
        SimulatedCameraProbe {
            state: Arc::clone(&self.state),
        }
    }
}

impl CameraDevice for SimulatedCamera {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        if state.fail_open {
            return Err(LutrinError::DeviceUnavailable(
                "simulated camera is unplugged".into(),
            ));
        }
        state.open = true;
        state.ops.push(DeviceOp::Open);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.state.lock().open
    }

    fn set_resolution(&mut self, resolution: Resolution) -> Result<()> {
        let mut state = self.state.lock();
        if !state.open {
            return Err(LutrinError::DeviceConfig("device is closed".into()));
        }
        state.ops.push(DeviceOp::SetResolution(resolution));
        state.current = snap(&state.accepted, resolution).unwrap_or(state.current);
        state.pending_polls = state.ready_after_polls.unwrap_or(0);
        Ok(())
    }

    fn resolution(&self) -> Result<Resolution> {
        let state = self.state.lock();
        if !state.open {
            return Err(LutrinError::DeviceConfig("device is closed".into()));
        }
        Ok(state.current)
    }

    fn read_frame(&mut self) -> Result<CapturedFrame> {
        let mut state = self.state.lock();
        if !state.open {
            return Err(LutrinError::ReadFailure("device is closed".into()));
        }
        let current = state.current;
        state.ops.push(DeviceOp::Read(current));
        if state.fail_all_reads {
            return Err(LutrinError::ReadFailure("simulated sensor fault".into()));
        }
        if state.failing_reads > 0 {
            state.failing_reads -= 1;
            return Err(LutrinError::ReadFailure("simulated dropped frame".into()));
        }
        let reads = state
            .ops
            .iter()
            .filter(|op| matches!(op, DeviceOp::Read(_)))
            .count();
        drop(state);
        Ok(CapturedFrame::new(test_pattern(current, reads)))
    }

    fn poll_ready(&mut self) -> Readiness {
        let mut state = self.state.lock();
        if state.ready_after_polls.is_none() {
            return Readiness::Unsupported;
        }
        if state.pending_polls > 0 {
            state.pending_polls -= 1;
            Readiness::Pending
        } else {
            Readiness::Ready
        }
    }

    fn close(&mut self) {
        let mut state = self.state.lock();
        if state.open {
            state.open = false;
            state.ops.push(DeviceOp::Close);
        }
    }
}

/// Shared view of a [`SimulatedCamera`]'s state.
#[derive(Clone)]
pub struct SimulatedCameraProbe {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedCameraProbe {
    /// Every command received so far.
    pub fn ops(&self) -> Vec<DeviceOp> {
        self.state.lock().ops.clone()
    }

    pub fn current_resolution(&self) -> Resolution {
        self.state.lock().current
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().open
    }

    /// Number of frame reads attempted, failed ones included.
    pub fn reads(&self) -> usize {
        self.state
            .lock()
            .ops
            .iter()
            .filter(|op| matches!(op, DeviceOp::Read(_)))
            .count()
    }

    /// Make the next `count` reads fail.
    pub fn fail_next_reads(&self, count: usize) {
        self.state.lock().failing_reads = count;
    }

    /// Make every read fail until switched off again.
    pub fn set_fail_all_reads(&self, fail: bool) {
        self.state.lock().fail_all_reads = fail;
    }
}

/// Pick the mode a driver would apply for `requested`: an exact match, else
/// the largest supported mode no wider than requested, else the smallest.
fn snap(accepted: &[Resolution], requested: Resolution) -> Option<Resolution> {
    if accepted.contains(&requested) {
        return Some(requested);
    }
    accepted
        .iter()
        .filter(|r| r.width <= requested.width)
        .max_by_key(|r| (r.width, r.height))
        .or_else(|| accepted.iter().min_by_key(|r| (r.width, r.height)))
        .copied()
}

/// Horizontal gradient whose brightness drifts with the frame counter.
fn test_pattern(resolution: Resolution, frame_no: usize) -> RgbImage {
    let width = resolution.width.max(1);
    let shift = (frame_no % 32) as u32;
    RgbImage::from_fn(resolution.width, resolution.height, |x, y| {
        let v = ((x * 255 / width + shift) % 256) as u8;
        Rgb([v, v, ((y + shift) % 256) as u8])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hd_and_vga() -> Vec<Resolution> {
        vec![Resolution::new(1280, 720), Resolution::new(640, 480)]
    }

    #[test]
    fn snaps_unsupported_requests() {
        let accepted = hd_and_vga();
        assert_eq!(
            snap(&accepted, Resolution::new(3840, 2160)),
            Some(Resolution::new(1280, 720))
        );
        assert_eq!(
            snap(&accepted, Resolution::new(640, 480)),
            Some(Resolution::new(640, 480))
        );
        assert_eq!(
            snap(&accepted, Resolution::new(320, 240)),
            Some(Resolution::new(640, 480))
        );
    }

    #[test]
    fn readback_reflects_applied_mode() {
        let mut cam = SimulatedCamera::new(hd_and_vga());
        cam.open().expect("open");
        cam.set_resolution(Resolution::new(1920, 1080)).expect("set");
        assert_eq!(cam.resolution().expect("readback"), Resolution::new(1280, 720));
    }

    #[test]
    fn frames_match_current_resolution() {
        let mut cam = SimulatedCamera::new(hd_and_vga());
        cam.open().expect("open");
        cam.set_resolution(Resolution::new(640, 480)).expect("set");
        let frame = cam.read_frame().expect("read");
        assert_eq!(frame.resolution(), Resolution::new(640, 480));
    }

    #[test]
    fn injected_read_failures() {
        let mut cam = SimulatedCamera::new(hd_and_vga());
        let probe = cam.probe();
        cam.open().expect("open");
        probe.fail_next_reads(1);
        assert!(matches!(cam.read_frame(), Err(LutrinError::ReadFailure(_))));
        assert!(cam.read_frame().is_ok());
        assert_eq!(probe.reads(), 2);
    }

    #[test]
    fn unplugged_device_fails_open() {
        let mut cam = SimulatedCamera::unplugged();
        assert!(matches!(cam.open(), Err(LutrinError::DeviceUnavailable(_))));
        assert!(!cam.is_open());
    }

    #[test]
    fn readiness_counts_down_after_change() {
        let mut cam = SimulatedCamera::new(hd_and_vga()).with_readiness(2);
        cam.open().expect("open");
        cam.set_resolution(Resolution::new(640, 480)).expect("set");
        assert_eq!(cam.poll_ready(), Readiness::Pending);
        assert_eq!(cam.poll_ready(), Readiness::Pending);
        assert_eq!(cam.poll_ready(), Readiness::Ready);

        let mut plain = SimulatedCamera::new(hd_and_vga());
        assert_eq!(plain.poll_ready(), Readiness::Unsupported);
    }
}
