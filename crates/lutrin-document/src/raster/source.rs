// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Source image — a decoded photograph plus the sampling density its file
// declared, if any.

use std::path::Path;

use image::DynamicImage;
use lutrin_core::Density;
use lutrin_core::error::{LutrinError, Result};
use tracing::{debug, info, instrument};

use crate::raster::density::read_density_hint;

/// A decoded input image awaiting normalisation.
#[derive(Debug, Clone)]
pub struct SourceImage {
    image: DynamicImage,
    density: Density,
}

impl SourceImage {
    // -- Construction ---------------------------------------------------------

    /// Load an image file, reading its density hint from the same bytes.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let source = Self::from_bytes(&data).map_err(|err| match err {
            LutrinError::ImageError(detail) => {
                LutrinError::ImageError(format!("{}: {}", path.display(), detail))
            }
            other => other,
        })?;
        info!(
            width = source.width(),
            height = source.height(),
            density = ?source.density,
            "Source image loaded"
        );
        Ok(source)
    }

    /// Decode raw encoded bytes (JPEG, PNG, etc.).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(data)
            .map_err(|err| LutrinError::ImageError(format!("failed to decode image: {}", err)))?;
        let density = Density::from_hint(read_density_hint(data));
        debug!(
            width = image.width(),
            height = image.height(),
            ?density,
            "Image decoded from bytes"
        );
        Ok(Self { image, density })
    }

    /// Wrap an already-decoded image, e.g. a frame straight from the camera.
    pub fn from_dynamic(image: DynamicImage, density: Density) -> Self {
        Self { image, density }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn density(&self) -> Density {
        self.density
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn encoded(format: ImageFormat) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 6, Rgb([200, 180, 160])));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, format).expect("encode");
        buf.into_inner()
    }

    #[test]
    fn decodes_png_without_density() {
        let source = SourceImage::from_bytes(&encoded(ImageFormat::Png)).expect("decode");
        assert_eq!((source.width(), source.height()), (8, 6));
        assert_eq!(source.density(), Density::Unknown);
    }

    #[test]
    fn garbage_is_an_image_error() {
        let err = SourceImage::from_bytes(b"not an image").unwrap_err();
        assert!(matches!(err, LutrinError::ImageError(_)));
    }

    #[test]
    fn open_missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = SourceImage::open(dir.path().join("absent.jpg")).unwrap_err();
        assert!(matches!(err, LutrinError::Io(_)));
    }

    #[test]
    fn open_reads_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("page.png");
        std::fs::write(&path, encoded(ImageFormat::Png)).expect("write");
        let source = SourceImage::open(&path).expect("open");
        assert_eq!(source.as_dynamic().width(), 8);
    }
}
