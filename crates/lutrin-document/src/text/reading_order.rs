// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Reading-order reconstruction for a photographed two-page spread.
//
// Recognition engines return fragments in detection order, which on an open
// book often interleaves lines of the left and right pages. Each fragment is
// assigned to a page by comparing its horizontal centre with the midline of
// the text extent, then fragments are sorted left page first, top to bottom.

use std::cmp::Ordering;

use lutrin_core::error::{LutrinError, Result};
use lutrin_core::{OrderedTranscript, Page, PageAssignment, TextFragment};
use tracing::{debug, instrument};

/// Vertical midline of the spread: half the largest x over all fragments.
///
/// The right edge of the text, not the image width, bounds the spread.
pub fn spread_midline(fragments: &[TextFragment]) -> Option<f32> {
    fragments
        .iter()
        .filter_map(TextFragment::max_x)
        .reduce(f32::max)
        .map(|max_x| max_x / 2.0)
}

/// Page and vertical position of every fragment, in input order.
///
/// A centre exactly on the midline belongs to the right page. Fragments
/// without a polygon are placed on the right page below everything else,
/// so they trail the transcript in their input order.
pub fn assign_pages(fragments: &[TextFragment]) -> Vec<PageAssignment> {
    let midline = spread_midline(fragments).unwrap_or(0.0);
    fragments
        .iter()
        .enumerate()
        .map(|(index, fragment)| match (fragment.centroid_x(), fragment.top()) {
            (Some(centre), Some(top)) => PageAssignment {
                index,
                page: if centre >= midline { Page::Right } else { Page::Left },
                top,
            },
            _ => PageAssignment {
                index,
                page: Page::Right,
                top: f32::INFINITY,
            },
        })
        .collect()
}

/// Fragments sorted left page first, then by ascending top coordinate.
///
/// The sort is stable: fragments sharing a page and top keep their input
/// order.
pub fn order_fragments(fragments: &[TextFragment]) -> Vec<TextFragment> {
    let mut assignments = assign_pages(fragments);
    assignments.sort_by(compare_assignments);
    assignments
        .into_iter()
        .map(|a| fragments[a.index].clone())
        .collect()
}

fn compare_assignments(a: &PageAssignment, b: &PageAssignment) -> Ordering {
    a.page.cmp(&b.page).then_with(|| a.top.total_cmp(&b.top))
}

/// Order fragments for reading and join their text with single spaces.
#[instrument(skip_all, fields(fragments = fragments.len()))]
pub fn reconstruct(fragments: &[TextFragment]) -> OrderedTranscript {
    if fragments.is_empty() {
        return OrderedTranscript::default();
    }

    let ordered = order_fragments(fragments);
    let text = ordered
        .iter()
        .map(|f| f.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let word_count = text.split_whitespace().count();

    debug!(word_count, "Reading order reconstructed");
    OrderedTranscript {
        text,
        fragments: ordered,
        word_count,
    }
}

/// Reject fragments whose coordinates are not finite numbers.
pub fn validate(fragments: &[TextFragment]) -> Result<()> {
    for (index, fragment) in fragments.iter().enumerate() {
        if fragment
            .polygon
            .iter()
            .any(|p| !p.x.is_finite() || !p.y.is_finite())
        {
            return Err(LutrinError::InvalidFragment(format!(
                "fragment {index} ({:?}) has a non-finite coordinate",
                fragment.text
            )));
        }
    }
    Ok(())
}

/// Parse a JSON array of fragments, e.g. saved engine output.
pub fn parse_fragments(json: &str) -> Result<Vec<TextFragment>> {
    let fragments: Vec<TextFragment> = serde_json::from_str(json)?;
    validate(&fragments)?;
    Ok(fragments)
}
