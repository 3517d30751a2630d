// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// lutrin-camera — arbitration of the single shared camera.
//
// One physical device serves two consumers: a continuous low-resolution
// preview and on-demand high-resolution stills. Every device command runs
// under one lock owned by `CameraManager`; the preview releases it between
// frames, a capture holds it for the whole reconfigure-read-restore cycle.

pub mod frame;
pub mod manager;
pub mod preview;
pub mod simulated;
pub mod stub;
pub mod traits;

#[cfg(feature = "v4l2")]
pub mod v4l2;

pub use frame::CapturedFrame;
pub use manager::CameraManager;
pub use preview::{CancelToken, PreviewFrame, PreviewStream, PreviewWorker};
pub use simulated::{DeviceOp, SimulatedCamera, SimulatedCameraProbe};
pub use traits::{CameraDevice, Readiness};

#[cfg(feature = "v4l2")]
pub use v4l2::V4l2Camera;

/// The device driver for this build: the V4L2 device at `index` with the
/// `v4l2` feature, otherwise a stub whose `open` fails so the manager ends
/// up Disabled.
pub fn default_device(index: u32) -> Box<dyn CameraDevice> {
    #[cfg(feature = "v4l2")]
    {
        Box::new(v4l2::V4l2Camera::new(index))
    }
    #[cfg(not(feature = "v4l2"))]
    {
        Box::new(stub::UnavailableCamera::new(index))
    }
}
