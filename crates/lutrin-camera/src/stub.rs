// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub device for builds without a camera driver.
//
// Every method returns `PlatformUnavailable`; the manager treats the failed
// open as permanent and reports the camera as Disabled.

use lutrin_core::Resolution;
use lutrin_core::error::{LutrinError, Result};

use crate::frame::CapturedFrame;
use crate::traits::CameraDevice;

/// Device returned when no driver is compiled in.
pub struct UnavailableCamera {
    name: String,
}

impl UnavailableCamera {
    pub fn new(index: u32) -> Self {
        Self {
            name: format!("camera #{index} (no driver)"),
        }
    }
}

impl CameraDevice for UnavailableCamera {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&mut self) -> Result<()> {
        tracing::warn!("CameraDevice::open called on stub device");
        Err(LutrinError::PlatformUnavailable)
    }

    fn is_open(&self) -> bool {
        false
    }

    fn set_resolution(&mut self, _resolution: Resolution) -> Result<()> {
        Err(LutrinError::PlatformUnavailable)
    }

    fn resolution(&self) -> Result<Resolution> {
        Err(LutrinError::PlatformUnavailable)
    }

    fn read_frame(&mut self) -> Result<CapturedFrame> {
        Err(LutrinError::PlatformUnavailable)
    }

    fn close(&mut self) {}
}
