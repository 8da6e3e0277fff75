//! Error types for the request engine.
//!
//! # Design
//! One enum per failure class, so callers can tell apart what went wrong
//! before the network was touched (`ConfigurationError`), during the login
//! replay (`AuthenticationError`), on the wire (`TransportError`) and after a
//! complete round trip (`ValidationError`). `Error` unifies them.
//!
//! A validation failure keeps the captured response: the round trip
//! succeeded and the caller may still want to inspect what came back.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::capture::ResponseCapture;
use crate::range::RangeSet;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Malformed status-range text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeParseError {
    #[error("empty status range entry in '{0}'")]
    Empty(String),

    #[error("invalid status range '{0}': expected N or N:M")]
    Malformed(String),

    #[error("status code {0} out of range 0..=599")]
    OutOfBounds(u32),

    #[error("invalid status range '{0}': lower bound exceeds upper bound")]
    Inverted(String),
}

/// Problems detected before any network I/O.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("authentication '{0}' doesn't exist")]
    UnknownAuthentication(String),

    #[error("authentication key name '{0}' must be unique")]
    DuplicateKeyName(String),

    #[error("authentication key name must not be empty")]
    EmptyKeyName,

    #[error(transparent)]
    InvalidRange(#[from] RangeParseError),

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("invalid authentication registry: {0}")]
    InvalidRegistry(#[from] serde_json::Error),
}

/// A form-login step answered with a non-2xx status.
#[derive(Debug, Error)]
pub enum AuthenticationError {
    #[error("authentication '{key}' step {step} ({method} {url}) returned status {status}")]
    StepFailed {
        key: String,
        step: usize,
        method: String,
        url: String,
        status: u16,
    },
}

/// Connect, timeout or I/O failures on the wire.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} timed out after {}s", .timeout.as_secs())]
    Timeout { url: String, timeout: Duration },

    #[error("response body from {url} exceeds {limit} bytes")]
    BodyTooLarge { url: String, limit: u64 },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: ureq::Error,
    },
}

impl TransportError {
    pub(crate) fn from_ureq(url: &str, timeout: Duration, err: ureq::Error) -> Self {
        match err {
            ureq::Error::Timeout(_) => TransportError::Timeout {
                url: url.to_string(),
                timeout,
            },
            ureq::Error::BodyExceedsLimit(limit) => TransportError::BodyTooLarge {
                url: url.to_string(),
                limit,
            },
            source => TransportError::Request {
                url: url.to_string(),
                source,
            },
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout { .. })
    }
}

/// The response did not satisfy the caller's success criteria.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Fail: the returned code {status} is not in the accepted range: {ranges}")]
    Status { status: u16, ranges: RangeSet },

    #[error("Fail: Response with length {length} doesn't contain '{expected}'")]
    Content { length: usize, expected: String },
}

/// Every failure the engine reports.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Authentication(#[from] AuthenticationError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("{error}")]
    Validation {
        error: ValidationError,
        response: Box<ResponseCapture>,
    },

    #[error("failed to write response to {}: {source}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// The captured response, when the round trip completed but validation
    /// failed.
    pub fn response(&self) -> Option<&ResponseCapture> {
        match self {
            Error::Validation { response, .. } => Some(response),
            _ => None,
        }
    }

    pub fn into_response(self) -> Option<ResponseCapture> {
        match self {
            Error::Validation { response, .. } => Some(*response),
            _ => None,
        }
    }
}

impl From<RangeParseError> for Error {
    fn from(err: RangeParseError) -> Self {
        Error::Configuration(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_authentication_message_names_the_key() {
        let err: Error = ConfigurationError::UnknownAuthentication("ci-login".into()).into();
        assert_eq!(err.to_string(), "authentication 'ci-login' doesn't exist");
        assert!(err.response().is_none());
    }

    #[test]
    fn timeout_is_a_transport_error() {
        let err = TransportError::Timeout {
            url: "http://localhost/hang".into(),
            timeout: Duration::from_secs(1),
        };
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "request to http://localhost/hang timed out after 1s");
    }

    #[test]
    fn body_limit_maps_to_its_own_variant() {
        let err = TransportError::from_ureq(
            "http://localhost/big",
            Duration::from_secs(1),
            ureq::Error::BodyExceedsLimit(1024),
        );
        assert!(matches!(err, TransportError::BodyTooLarge { limit: 1024, .. }));
        assert!(!err.is_timeout());
        assert_eq!(err.to_string(), "response body from http://localhost/big exceeds 1024 bytes");
    }

    #[test]
    fn validation_error_keeps_the_response() {
        let err = Error::Validation {
            error: ValidationError::Content {
                length: 4,
                expected: "ok".into(),
            },
            response: Box::new(ResponseCapture::buffered(200, Vec::new(), Some("nope".into()))),
        };
        assert_eq!(err.to_string(), "Fail: Response with length 4 doesn't contain 'ok'");
        let response = err.into_response().unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.content(), Some("nope"));
    }
}
