// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text — the recognition engine seam and two-page reading-order
// reconstruction.

pub mod reading_order;

use image::DynamicImage;
use lutrin_core::error::Result;
use lutrin_core::{OrderedTranscript, TextFragment};
use tracing::{info, instrument};

use crate::scan::normalize::RectifiedPage;

/// A text-recognition engine.
///
/// Returns fragments in whatever order the engine produces them, each with
/// a polygon in the coordinate space of `image`.
pub trait TextRecognizer {
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<TextFragment>>;
}

/// Recognise a normalised spread and put the fragments into reading order.
///
/// Engine failures are returned unchanged.
#[instrument(skip_all, fields(width = page.width(), height = page.height()))]
pub fn transcribe(recognizer: &dyn TextRecognizer, page: &RectifiedPage) -> Result<OrderedTranscript> {
    let fragments = recognizer.recognize(&page.to_dynamic())?;
    reading_order::validate(&fragments)?;
    let transcript = reading_order::reconstruct(&fragments);
    info!(
        fragments = transcript.fragments.len(),
        words = transcript.word_count,
        "Page transcribed"
    );
    Ok(transcript)
}
