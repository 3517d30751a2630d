// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text recognition with the `ocrs` engine.
//
// Only compiled with the `ocr` feature. The engine needs two `.rten` model
// files (text detection and text recognition); `ocrs-cli` downloads them to
// `$XDG_CACHE_HOME/ocrs` (typically `~/.cache/ocrs`) on first run.

use std::path::{Path, PathBuf};

use image::DynamicImage;
use lutrin_core::error::{LutrinError, Result};
use lutrin_core::{Point, TextFragment};
use ocrs::{ImageSource, OcrEngine, OcrEngineParams, TextItem};
use rten::Model;
use tracing::{debug, info, instrument};

use crate::text::TextRecognizer;

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// `$XDG_CACHE_HOME/ocrs`, else `~/.cache/ocrs`, else `./ocrs-models`.
pub fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

/// Locations of the two model files.
#[derive(Debug, Clone)]
pub struct OcrModels {
    pub detection: PathBuf,
    pub recognition: PathBuf,
}

impl Default for OcrModels {
    fn default() -> Self {
        Self::from_dir(default_model_dir())
    }
}

impl OcrModels {
    /// Expect `text-detection.rten` and `text-recognition.rten` in `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection: dir.join(DETECTION_MODEL_FILENAME),
            recognition: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    pub fn validate(&self) -> Result<()> {
        for path in [&self.detection, &self.recognition] {
            if !path.exists() {
                return Err(LutrinError::OcrError(format!(
                    "model not found at {}; run `ocrs-cli` once to download models",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

/// `ocrs`-backed recogniser emitting one fragment per text line.
pub struct OcrRecognizer {
    engine: OcrEngine,
}

impl OcrRecognizer {
    /// Load both models. Model loading is the expensive step, so keep the
    /// recogniser around between pages.
    #[instrument(skip_all, fields(
        detection = %models.detection.display(),
        recognition = %models.recognition.display(),
    ))]
    pub fn new(models: &OcrModels) -> Result<Self> {
        models.validate()?;

        let load = |path: &Path| {
            Model::load_file(path).map_err(|err| {
                LutrinError::OcrError(format!("failed to load model {}: {}", path.display(), err))
            })
        };
        let detection_model = load(&models.detection)?;
        let recognition_model = load(&models.recognition)?;

        let engine = OcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|err| LutrinError::OcrError(format!("failed to initialise OCR engine: {}", err)))?;

        info!("OCR engine initialised");
        Ok(Self { engine })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(&OcrModels::default())
    }
}

impl TextRecognizer for OcrRecognizer {
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<TextFragment>> {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();

        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
            LutrinError::OcrError(format!(
                "failed to create image source ({}x{}): {}",
                width, height, err
            ))
        })?;
        let input = self
            .engine
            .prepare_input(source)
            .map_err(|err| LutrinError::OcrError(format!("OCR preprocessing failed: {}", err)))?;

        let word_rects = self
            .engine
            .detect_words(&input)
            .map_err(|err| LutrinError::OcrError(format!("word detection failed: {}", err)))?;
        let line_rects = self.engine.find_text_lines(&input, &word_rects);
        debug!(words = word_rects.len(), lines = line_rects.len(), "Text lines found");

        let lines = self
            .engine
            .recognize_text(&input, &line_rects)
            .map_err(|err| LutrinError::OcrError(format!("line recognition failed: {}", err)))?;

        let fragments: Vec<TextFragment> = lines
            .iter()
            .flatten()
            .filter_map(|line| {
                let text = line.to_string();
                if text.trim().is_empty() {
                    return None;
                }
                let polygon = line
                    .rotated_rect()
                    .corners()
                    .iter()
                    .map(|c| Point::new(c.x, c.y))
                    .collect();
                Some(TextFragment::new(text, polygon))
            })
            .collect();

        info!(fragments = fragments.len(), "OCR complete");
        Ok(fragments)
    }
}
