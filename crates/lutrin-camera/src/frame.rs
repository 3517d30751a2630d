// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raw frames read from the camera and their JPEG encoding.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::RgbImage;
use image::codecs::jpeg::JpegEncoder;
use lutrin_core::Resolution;
use lutrin_core::error::{LutrinError, Result};
use tracing::debug;

/// One immutable frame, tagged with the resolution it was read at.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    resolution: Resolution,
    image: RgbImage,
}

impl CapturedFrame {
    /// Wrap a decoded frame. The resolution is taken from the pixel buffer.
    pub fn new(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            resolution: Resolution::new(width, height),
            image,
        }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }

    /// Encode the frame as JPEG at `quality` (clamped to 1-100).
    pub fn encode_jpeg(&self, quality: u8) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100))
            .encode_image(&self.image)
            .map_err(|err| LutrinError::Encode(format!("JPEG encoding failed: {}", err)))?;
        debug!(bytes = buf.len(), resolution = %self.resolution, "Frame encoded");
        Ok(buf)
    }

    /// Write the frame to `path` as JPEG.
    pub fn save_jpeg(&self, path: &Path, quality: u8) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100))
            .encode_image(&self.image)
            .map_err(|err| {
                LutrinError::Encode(format!("failed to write {}: {}", path.display(), err))
            })?;
        // Dropping the writer would swallow a failed final write.
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn resolution_follows_buffer() {
        let frame = CapturedFrame::new(RgbImage::from_pixel(64, 48, Rgb([10, 20, 30])));
        assert_eq!(frame.resolution(), Resolution::new(64, 48));
    }

    #[test]
    fn encodes_decodable_jpeg() {
        let frame = CapturedFrame::new(RgbImage::from_pixel(32, 24, Rgb([200, 100, 50])));
        let bytes = frame.encode_jpeg(80).expect("encode");
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory(&bytes).expect("decode");
        assert_eq!((decoded.width(), decoded.height()), (32, 24));
    }

    #[test]
    fn saves_to_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("still.jpg");
        let frame = CapturedFrame::new(RgbImage::from_pixel(16, 16, Rgb([0, 0, 0])));
        frame.save_jpeg(&path, 90).expect("save");
        assert!(path.metadata().expect("metadata").len() > 0);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn full_disk_is_reported() {
        let frame = CapturedFrame::new(RgbImage::from_pixel(16, 16, Rgb([0, 0, 0])));
        let err = frame.save_jpeg(Path::new("/dev/full"), 90).unwrap_err();
        assert!(matches!(err, LutrinError::Io(_) | LutrinError::Encode(_)), "{err:?}");
    }
}
