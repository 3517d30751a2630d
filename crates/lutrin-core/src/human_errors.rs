// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for people using the reading stand.
//
// Every technical error is mapped to plain English with a clear suggestion.
// The taxonomy uses three severity levels that drive presentation.

use crate::error::LutrinError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// A frame glitch. Trying again usually works.
    Transient,
    /// User must do something (plug the camera in, free disk space).
    ActionRequired,
    /// Cannot be fixed by retrying until the service restarts.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether retrying the same request can succeed.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `LutrinError` into a `HumanError`.
pub fn humanize_error(err: &LutrinError) -> HumanError {
    match err {
        // -- Camera errors --
        LutrinError::DeviceUnavailable(_) => HumanError {
            message: "The camera isn't available.".into(),
            suggestion: "Check the camera is plugged in, then restart the reading stand.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        LutrinError::ReadFailure(_) => HumanError {
            message: "The camera didn't return a picture.".into(),
            suggestion: "Try again. If this keeps happening, unplug the camera and plug it back in.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        LutrinError::DeviceConfig(detail) => HumanError {
            message: "The camera refused a setting change.".into(),
            suggestion: format!("Try again in a moment. ({detail})"),
            retriable: true,
            severity: Severity::Transient,
        },

        LutrinError::Encode(_) => HumanError {
            message: "The picture couldn't be saved as an image.".into(),
            suggestion: "Try taking the picture again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        // -- Document errors --
        LutrinError::ImageError(_) => HumanError {
            message: "There's a problem with this image.".into(),
            suggestion: "The image may be damaged or in an unusual format. Try a JPEG or PNG photo.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        LutrinError::OcrError(_) => HumanError {
            message: "Text recognition didn't work on this page.".into(),
            suggestion: "Make sure the book is well lit and fully inside the picture, then try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        LutrinError::InvalidFragment(detail) => HumanError {
            message: "The recognised text couldn't be put in order.".into(),
            suggestion: format!("Check the text positions file. ({detail})"),
            retriable: false,
            severity: Severity::Permanent,
        },

        // -- Storage --
        LutrinError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound => HumanError {
                message: "The file couldn't be found.".into(),
                suggestion: "It may have been moved or deleted. Check the path and try again.".into(),
                retriable: false,
                severity: Severity::ActionRequired,
            },
            std::io::ErrorKind::PermissionDenied => HumanError {
                message: "The reading stand isn't allowed to use that folder.".into(),
                suggestion: "Check the folder permissions, or choose a different data folder.".into(),
                retriable: false,
                severity: Severity::ActionRequired,
            },
            _ => HumanError {
                message: "There was a problem reading or writing a file.".into(),
                suggestion: "Try again. If this keeps happening, the storage may be full.".into(),
                retriable: true,
                severity: Severity::Transient,
            },
        },

        LutrinError::Serialization(_) => HumanError {
            message: "A settings or data file couldn't be read.".into(),
            suggestion: "Check the file is valid JSON.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        // -- Platform --
        LutrinError::PlatformUnavailable => HumanError {
            message: "This feature isn't available on this device.".into(),
            suggestion: "This build lacks the camera driver or text recognition engine it needs. Rebuild with that feature enabled.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_unavailable_is_permanent() {
        let human = humanize_error(&LutrinError::DeviceUnavailable("index 0".into()));
        assert_eq!(human.severity, Severity::Permanent);
        assert!(!human.retriable);
    }

    #[test]
    fn read_failure_is_transient() {
        let human = humanize_error(&LutrinError::ReadFailure("timeout".into()));
        assert_eq!(human.severity, Severity::Transient);
        assert!(human.retriable);
    }

    #[test]
    fn missing_file_is_action_required() {
        let err = LutrinError::Io(std::io::Error::from(std::io::ErrorKind::NotFound));
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::ActionRequired);
    }

    #[test]
    fn config_detail_is_surfaced() {
        let human = humanize_error(&LutrinError::DeviceConfig("VIDIOC_S_FMT".into()));
        assert!(human.suggestion.contains("VIDIOC_S_FMT"));
    }
}
