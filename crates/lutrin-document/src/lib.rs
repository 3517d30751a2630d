// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// lutrin-document — Page processing for the Lutrin reading stand.
//
// Turns a photographed book spread into a rectified, density-normalised,
// binarised page for text recognition (`scan`), and puts the recognised
// fragments of a two-page spread back into reading order (`text`).

pub mod raster;
pub mod scan;
pub mod text;

pub use raster::source::SourceImage;
pub use scan::normalize::{PageNormalizer, RectifiedPage};
pub use text::TextRecognizer;
pub use text::reading_order::reconstruct;

#[cfg(feature = "ocr")]
pub use scan::ocr::OcrRecognizer;
