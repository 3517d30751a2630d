// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Device abstraction the camera manager drives.
//
// Drivers only translate commands; locking, settling and lifecycle policy
// live in `CameraManager`.

use lutrin_core::Resolution;
use lutrin_core::error::Result;

use crate::frame::CapturedFrame;

/// Whether the device has finished applying the last configuration change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    Pending,
    /// The driver cannot tell; callers fall back to a fixed settle delay.
    Unsupported,
}

/// A single physical camera.
///
/// Implementations are driven from one thread at a time (the manager holds
/// its lock around every call) but may move between threads.
pub trait CameraDevice: Send {
    /// Human-readable device name for logs (e.g. "/dev/video0").
    fn name(&self) -> &str;

    /// Open the device. Called at most once by the manager.
    fn open(&mut self) -> Result<()>;

    fn is_open(&self) -> bool;

    /// Request a capture resolution. Drivers may silently apply a different
    /// one; callers confirm through [`resolution`](Self::resolution).
    fn set_resolution(&mut self, resolution: Resolution) -> Result<()>;

    /// Read back the resolution the device is actually using.
    fn resolution(&self) -> Result<Resolution>;

    /// Synchronously read one frame.
    fn read_frame(&mut self) -> Result<CapturedFrame>;

    /// Report whether the last reconfiguration has taken effect.
    fn poll_ready(&mut self) -> Readiness {
        Readiness::Unsupported
    }

    /// Release the device. Safe to call on a closed device.
    fn close(&mut self);
}
