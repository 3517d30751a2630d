// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Lutrin.

use thiserror::Error;

/// Top-level error type for all Lutrin operations.
#[derive(Debug, Error)]
pub enum LutrinError {
    // -- Camera errors --
    /// The device could not be opened. Permanent until process restart.
    #[error("camera unavailable: {0}")]
    DeviceUnavailable(String),

    /// A single frame read failed. The open handle is kept.
    #[error("frame read failed: {0}")]
    ReadFailure(String),

    #[error("camera configuration failed: {0}")]
    DeviceConfig(String),

    #[error("frame encoding failed: {0}")]
    Encode(String),

    // -- Document errors --
    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("OCR failed: {0}")]
    OcrError(String),

    #[error("invalid text fragment: {0}")]
    InvalidFragment(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Platform --
    #[error("feature not available on this platform")]
    PlatformUnavailable,
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LutrinError>;
