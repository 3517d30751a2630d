// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Video4Linux2 driver for USB webcams (Raspberry Pi and desktop Linux).
//
// Frames are requested as MJPEG and decoded with `image`. A short-lived
// mmap stream is opened per read so the format can be changed between
// reads without tearing down buffers held by a long-lived stream.

use image::ImageFormat;
use lutrin_core::Resolution;
use lutrin_core::error::{LutrinError, Result};
use tracing::{debug, instrument};
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::{Device, FourCC};

use crate::frame::CapturedFrame;
use crate::traits::CameraDevice;

/// Buffers queued per short-lived stream.
const STREAM_BUFFERS: u32 = 2;

/// Frames discarded after a stream starts; the first ones are often
/// under-exposed or stale.
const WARMUP_FRAMES: usize = 2;

/// A V4L2 capture device at `/dev/video<index>`.
pub struct V4l2Camera {
    index: usize,
    name: String,
    device: Option<Device>,
}

impl V4l2Camera {
    pub fn new(index: u32) -> Self {
        Self {
            index: index as usize,
            name: format!("/dev/video{index}"),
            device: None,
        }
    }

    fn device(&self) -> Result<&Device> {
        self.device
            .as_ref()
            .ok_or_else(|| LutrinError::DeviceConfig(format!("{} is closed", self.name)))
    }
}

impl CameraDevice for V4l2Camera {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&mut self) -> Result<()> {
        let device = Device::new(self.index).map_err(|err| {
            LutrinError::DeviceUnavailable(format!("failed to open {}: {}", self.name, err))
        })?;
        self.device = Some(device);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.device.is_some()
    }

    fn set_resolution(&mut self, resolution: Resolution) -> Result<()> {
        let device = self.device()?;
        let mut format = device
            .format()
            .map_err(|err| LutrinError::DeviceConfig(format!("VIDIOC_G_FMT: {}", err)))?;
        format.width = resolution.width;
        format.height = resolution.height;
        format.fourcc = FourCC::new(b"MJPG");
        let applied = device
            .set_format(&format)
            .map_err(|err| LutrinError::DeviceConfig(format!("VIDIOC_S_FMT: {}", err)))?;
        debug!(
            requested = %resolution,
            width = applied.width,
            height = applied.height,
            fourcc = %applied.fourcc,
            "Format applied"
        );
        Ok(())
    }

    fn resolution(&self) -> Result<Resolution> {
        let format = self
            .device()?
            .format()
            .map_err(|err| LutrinError::DeviceConfig(format!("VIDIOC_G_FMT: {}", err)))?;
        Ok(Resolution::new(format.width, format.height))
    }

    #[instrument(skip(self), fields(device = %self.name))]
    fn read_frame(&mut self) -> Result<CapturedFrame> {
        let device = self
            .device
            .as_ref()
            .ok_or_else(|| LutrinError::ReadFailure(format!("{} is closed", self.name)))?;
        let mut stream = Stream::with_buffers(device, Type::VideoCapture, STREAM_BUFFERS)
            .map_err(|err| LutrinError::ReadFailure(format!("stream setup failed: {}", err)))?;

        for _ in 0..WARMUP_FRAMES {
            stream
                .next()
                .map_err(|err| LutrinError::ReadFailure(format!("dequeue failed: {}", err)))?;
        }
        let (data, _meta) = stream
            .next()
            .map_err(|err| LutrinError::ReadFailure(format!("dequeue failed: {}", err)))?;

        let image = image::load_from_memory_with_format(data, ImageFormat::Jpeg)
            .map_err(|err| LutrinError::ReadFailure(format!("MJPEG decode failed: {}", err)))?
            .to_rgb8();
        Ok(CapturedFrame::new(image))
    }

    fn close(&mut self) {
        // Dropping the handle closes the file descriptor.
        self.device = None;
    }
}
