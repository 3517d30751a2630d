// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page normaliser — turns a raw photograph of a page into a rectified,
// density-normalised, binarised image ready for text recognition.

use std::io::Cursor;
use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, ImageFormat};
use imageproc::filter::gaussian_blur_f32;
use lutrin_core::config::NormalizerConfig;
use lutrin_core::error::{LutrinError, Result};
use lutrin_core::{Density, Point};
use tracing::{debug, info, instrument, warn};

use crate::raster::source::SourceImage;
use crate::scan::boundary::{BoundaryParams, detect_page_boundary};
use crate::scan::rectify::warp_to_rectangle;
use crate::scan::threshold::adaptive_threshold;

/// Output of [`PageNormalizer::normalize`].
#[derive(Debug, Clone)]
pub struct RectifiedPage {
    /// Corners used for rectification, in source-frame coordinates. `None`
    /// when no page boundary was found and the whole frame was kept.
    pub corners: Option<[Point; 4]>,
    /// Binarised page (0 = ink, 255 = paper).
    pub image: GrayImage,
    /// Density declared by the source.
    pub density: Density,
    /// Resampling factor applied after rectification (1.0 when none).
    pub scale: f32,
}

impl RectifiedPage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Effective density of the output, when the source declared one.
    pub fn output_density(&self) -> Option<f32> {
        self.density.dpi().map(|dpi| dpi * self.scale)
    }

    pub fn to_dynamic(&self) -> DynamicImage {
        DynamicImage::ImageLuma8(self.image.clone())
    }

    /// Encode the page as PNG.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Cursor::new(Vec::new());
        self.image
            .write_to(&mut buf, ImageFormat::Png)
            .map_err(|err| LutrinError::Encode(format!("PNG encoding failed: {}", err)))?;
        Ok(buf.into_inner())
    }

    /// Write the page to `path` as PNG, creating parent directories.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn save_png(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_png_bytes()?)?;
        info!(width = self.width(), height = self.height(), "Normalised page saved");
        Ok(())
    }
}

/// Rectifies, rescales and binarises page photographs.
#[derive(Debug, Clone, Default)]
pub struct PageNormalizer {
    config: NormalizerConfig,
}

impl PageNormalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    // -- Pipeline -------------------------------------------------------------

    /// Run the full pipeline on a decoded source.
    ///
    /// 1. Convert to grayscale
    /// 2. Detect the page quadrilateral and warp it to a rectangle; keep the
    ///    whole frame when no quadrilateral is found
    /// 3. Upscale to the target density when the source declares a lower one
    /// 4. Light blur, then adaptive binarisation
    #[instrument(skip_all, fields(width = source.width(), height = source.height()))]
    pub fn normalize(&self, source: &SourceImage) -> RectifiedPage {
        let gray = source.as_dynamic().to_luma8();
        let (corners, rectified) = self.rectify(&gray);
        let (resampled, scale) = self.rescale(rectified, source.density());
        let image = self.condition(&resampled);

        info!(
            found_boundary = corners.is_some(),
            scale,
            width = image.width(),
            height = image.height(),
            "Page normalised"
        );
        RectifiedPage {
            corners,
            image,
            density: source.density(),
            scale,
        }
    }

    /// Decode `data` and normalise it.
    pub fn normalize_bytes(&self, data: &[u8]) -> Result<RectifiedPage> {
        let source = SourceImage::from_bytes(data)?;
        Ok(self.normalize(&source))
    }

    /// Normalise the image file at `input`, writing the result as PNG to
    /// `output` when given.
    #[instrument(skip(self), fields(input = %input.display()))]
    pub fn normalize_file(&self, input: &Path, output: Option<&Path>) -> Result<RectifiedPage> {
        let source = SourceImage::open(input)?;
        let page = self.normalize(&source);
        if let Some(output) = output {
            page.save_png(output)?;
        }
        Ok(page)
    }

    // -- Stages ---------------------------------------------------------------

    /// Locate the page and warp it to an axis-aligned rectangle.
    ///
    /// Returns the frame unchanged, with no corners, when no four-vertex
    /// boundary is found or the found one is degenerate.
    pub fn rectify(&self, gray: &GrayImage) -> (Option<[Point; 4]>, GrayImage) {
        let params = BoundaryParams::from(&self.config);
        let Some(corners) = detect_page_boundary(gray, &params) else {
            warn!("No four-point page contour found; processing the whole frame");
            return (None, gray.clone());
        };
        debug!(?corners, "Page boundary detected");

        match warp_to_rectangle(gray, &corners) {
            Some(warped) => (Some(corners), warped),
            None => {
                warn!(?corners, "Page boundary unusable; processing the whole frame");
                (None, gray.clone())
            }
        }
    }

    /// Upscale so the page reaches the target density.
    ///
    /// Only upsamples, and only when the density is known: an unknown
    /// density leaves the image untouched rather than guessing. Factors or
    /// output sizes beyond the configured limits are skipped the same way.
    pub fn rescale(&self, gray: GrayImage, density: Density) -> (GrayImage, f32) {
        let Some(dpi) = density.dpi() else {
            warn!("Source density unknown; skipping resample");
            return (gray, 1.0);
        };
        if dpi >= self.config.target_dpi {
            debug!(dpi, target = self.config.target_dpi, "Density sufficient");
            return (gray, 1.0);
        }

        let factor = self.config.target_dpi / dpi;
        if factor > self.config.max_upscale_factor {
            warn!(
                dpi,
                factor,
                limit = self.config.max_upscale_factor,
                "Declared density implausibly low; skipping resample"
            );
            return (gray, 1.0);
        }
        let width = (f64::from(gray.width()) * f64::from(factor)).round().max(1.0);
        let height = (f64::from(gray.height()) * f64::from(factor)).round().max(1.0);
        if width * height > self.config.max_output_pixels as f64 {
            warn!(
                dpi,
                factor,
                width,
                height,
                limit = self.config.max_output_pixels,
                "Upscaled page would be too large; skipping resample"
            );
            return (gray, 1.0);
        }
        let (width, height) = (width as u32, height as u32);
        let resized = imageops::resize(&gray, width, height, FilterType::Triangle);
        info!(
            dpi,
            target = self.config.target_dpi,
            factor,
            width,
            height,
            "Upscaled to target density"
        );
        (resized, factor)
    }

    /// Light blur followed by adaptive binarisation.
    pub fn condition(&self, gray: &GrayImage) -> GrayImage {
        let blurred = if self.config.final_blur_sigma > 0.0 {
            gaussian_blur_f32(gray, self.config.final_blur_sigma)
        } else {
            gray.clone()
        };
        adaptive_threshold(
            &blurred,
            self.config.final_block_radius,
            self.config.final_offset,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn page_on_desk(w: u32, h: u32, left: u32, top: u32, right: u32, bottom: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| {
            if (left..right).contains(&x) && (top..bottom).contains(&y) {
                Luma([235u8])
            } else {
                Luma([35u8])
            }
        })
    }

    fn source(gray: GrayImage, density: Density) -> SourceImage {
        SourceImage::from_dynamic(DynamicImage::ImageLuma8(gray), density)
    }

    #[test]
    fn no_boundary_keeps_frame_unchanged() {
        let gray = GrayImage::from_fn(160, 120, |x, _| Luma([(80 + x / 2) as u8]));
        let normalizer = PageNormalizer::default();
        let (corners, rectified) = normalizer.rectify(&gray);
        assert!(corners.is_none());
        assert_eq!(rectified, gray);
    }

    #[test]
    fn detected_page_is_cropped() {
        let gray = page_on_desk(400, 500, 60, 70, 340, 430);
        let page = PageNormalizer::default().normalize(&source(gray, Density::Unknown));
        assert!(page.corners.is_some());
        // Roughly the page's 280x360, never the full frame.
        assert!(page.width() < 320 && page.width() > 260, "width {}", page.width());
        assert!(page.height() < 400 && page.height() > 340, "height {}", page.height());
    }

    #[test]
    fn low_density_is_upscaled() {
        let gray = GrayImage::from_pixel(50, 40, Luma([200u8]));
        let page = PageNormalizer::default().normalize(&source(gray, Density::Known(150.0)));
        assert_eq!((page.width(), page.height()), (100, 80));
        assert!((page.scale - 2.0).abs() < 1e-6);
        assert_eq!(page.output_density(), Some(300.0));
    }

    #[test]
    fn sufficient_or_unknown_density_is_not_resampled() {
        let normalizer = PageNormalizer::default();
        for density in [Density::Known(300.0), Density::Known(600.0), Density::Unknown] {
            let gray = GrayImage::from_pixel(50, 40, Luma([200u8]));
            let page = normalizer.normalize(&source(gray, density));
            assert_eq!((page.width(), page.height()), (50, 40));
            assert_eq!(page.scale, 1.0);
        }
    }

    #[test]
    fn implausible_density_skips_resample() {
        // 1 dpi would ask for a 300x blow-up of a 2000x1500 frame.
        let gray = GrayImage::from_pixel(2000, 1500, Luma([200u8]));
        let page = PageNormalizer::default().normalize(&source(gray, Density::Known(1.0)));
        assert_eq!((page.width(), page.height()), (2000, 1500));
        assert_eq!(page.scale, 1.0);
    }

    #[test]
    fn oversized_upscale_skips_resample() {
        let normalizer = PageNormalizer::new(NormalizerConfig {
            max_output_pixels: 5_000,
            ..NormalizerConfig::default()
        });
        // 150 dpi doubles 50x40 to 100x80 = 8000 pixels, over the limit.
        let gray = GrayImage::from_pixel(50, 40, Luma([200u8]));
        let (resampled, scale) = normalizer.rescale(gray, Density::Known(150.0));
        assert_eq!(resampled.dimensions(), (50, 40));
        assert_eq!(scale, 1.0);
    }

    #[test]
    fn output_is_binary() {
        let gray = GrayImage::from_fn(64, 64, |x, y| Luma([((x * 7 + y * 3) % 256) as u8]));
        let page = PageNormalizer::default().normalize(&source(gray, Density::Unknown));
        assert!(page.image.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn normalize_file_writes_png() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("spread.png");
        DynamicImage::ImageLuma8(GrayImage::from_pixel(30, 20, Luma([180u8])))
            .save(&input)
            .expect("write input");
        let output = dir.path().join("out").join("page.png");

        let page = PageNormalizer::default()
            .normalize_file(&input, Some(&output))
            .expect("normalize");
        let written = image::open(&output).expect("read output");
        assert_eq!((written.width(), written.height()), (page.width(), page.height()));
    }

    #[test]
    fn undecodable_bytes_are_an_error() {
        let err = PageNormalizer::default().normalize_bytes(b"\x00\x01").unwrap_err();
        assert!(matches!(err, LutrinError::ImageError(_)));
    }
}
