// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page normalisation pipeline — boundary detection, perspective
// rectification, density rescaling and binarisation, plus optical
// character recognition (OCR).

pub mod boundary;
pub mod normalize;
pub mod rectify;
pub mod threshold;

#[cfg(feature = "ocr")]
pub mod ocr;

pub use normalize::{PageNormalizer, RectifiedPage};

#[cfg(feature = "ocr")]
pub use ocr::OcrRecognizer;
