// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster input — decoding source photographs and their density metadata.

pub mod density;
pub mod source;

pub use density::read_density_hint;
pub use source::SourceImage;
