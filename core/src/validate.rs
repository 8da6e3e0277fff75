//! Post-hoc checks of a captured response.
//!
//! Both checks are read-only. When both are configured the status check runs
//! first, so a response failing both always reports the status.

use crate::capture::ResponseCapture;
use crate::error::ValidationError;
use crate::range::{RangeSet, StatusRange};

/// Accept the response if its status lies in any range of `ranges`.
/// Returns the matching range.
pub fn validate_status<'a>(
    capture: &ResponseCapture,
    ranges: &'a RangeSet,
) -> Result<&'a StatusRange, ValidationError> {
    ranges
        .matching(capture.status())
        .ok_or_else(|| ValidationError::Status {
            status: capture.status(),
            ranges: ranges.clone(),
        })
}

/// Accept the response if its body contains `required` literally.
/// A missing or empty `required` always passes; a missing body counts as
/// empty.
pub fn validate_content(
    capture: &ResponseCapture,
    required: Option<&str>,
) -> Result<(), ValidationError> {
    let Some(required) = required.filter(|r| !r.is_empty()) else {
        return Ok(());
    };
    let content = capture.content().unwrap_or_default();
    if content.contains(required) {
        Ok(())
    } else {
        Err(ValidationError::Content {
            length: content.chars().count(),
            expected: required.to_string(),
        })
    }
}
