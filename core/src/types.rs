//! Declarative request parameters.
//!
//! # Design
//! `RequestSpec` is what a job hands the engine: everything needed to build,
//! authenticate, send and validate one call. It deserializes from JSON with
//! the same defaults a caller gets from [`RequestSpec::new`], so a job
//! definition only has to name what differs.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::http::{HttpMethod, MimeType};
use crate::range::DEFAULT_VALID_RESPONSE_CODES;

/// Timeout applied when a spec leaves `timeout_secs` at 0.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Largest response body buffered when a spec leaves `max_body_bytes` at 0.
pub const DEFAULT_MAX_BODY_BYTES: u64 = 256 * 1024 * 1024;

/// A name/value pair. Names need not be unique within a list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NameValuePair {
    pub name: String,
    pub value: String,
}

impl NameValuePair {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One login request replayed by form authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestAction {
    pub url: String,
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default)]
    pub params: Vec<NameValuePair>,
}

impl RequestAction {
    pub fn new(method: HttpMethod, url: impl Into<String>, params: Vec<NameValuePair>) -> Self {
        Self {
            url: url.into(),
            method,
            params,
        }
    }
}

/// Everything needed to perform and check one HTTP call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSpec {
    pub url: String,
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default)]
    pub content_type: MimeType,
    #[serde(default)]
    pub accept_type: MimeType,
    #[serde(default)]
    pub custom_headers: Vec<NameValuePair>,
    #[serde(default)]
    pub body_params: Vec<NameValuePair>,
    /// 0 means [`DEFAULT_TIMEOUT_SECS`].
    #[serde(default)]
    pub timeout_secs: u64,
    #[serde(default)]
    pub authentication_key: Option<String>,
    #[serde(default = "default_valid_response_codes")]
    pub valid_response_codes: String,
    #[serde(default)]
    pub valid_response_content: Option<String>,
    #[serde(default)]
    pub console_log_response_body: bool,
    /// When false the body is read lazily on first access instead of
    /// right after the response arrives.
    #[serde(default = "default_true")]
    pub capture_body: bool,
    #[serde(default)]
    pub output_file: Option<PathBuf>,
    /// 0 means [`DEFAULT_MAX_BODY_BYTES`]. A larger body fails the call.
    #[serde(default)]
    pub max_body_bytes: u64,
}

fn default_valid_response_codes() -> String {
    DEFAULT_VALID_RESPONSE_CODES.to_string()
}

fn default_true() -> bool {
    true
}

impl RequestSpec {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: HttpMethod::default(),
            content_type: MimeType::NotSet,
            accept_type: MimeType::NotSet,
            custom_headers: Vec::new(),
            body_params: Vec::new(),
            timeout_secs: 0,
            authentication_key: None,
            valid_response_codes: default_valid_response_codes(),
            valid_response_content: None,
            console_log_response_body: false,
            capture_body: true,
            output_file: None,
            max_body_bytes: 0,
        }
    }

    #[must_use]
    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub fn with_content_type(mut self, mime: MimeType) -> Self {
        self.content_type = mime;
        self
    }

    #[must_use]
    pub fn with_accept_type(mut self, mime: MimeType) -> Self {
        self.accept_type = mime;
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_headers.push(NameValuePair::new(name, value));
        self
    }

    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.body_params.push(NameValuePair::new(name, value));
        self
    }

    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn with_authentication(mut self, key: impl Into<String>) -> Self {
        self.authentication_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_valid_response_codes(mut self, codes: impl Into<String>) -> Self {
        self.valid_response_codes = codes.into();
        self
    }

    #[must_use]
    pub fn with_valid_response_content(mut self, content: impl Into<String>) -> Self {
        self.valid_response_content = Some(content.into());
        self
    }

    #[must_use]
    pub fn with_console_log_response_body(mut self, enabled: bool) -> Self {
        self.console_log_response_body = enabled;
        self
    }

    #[must_use]
    pub fn with_capture_body(mut self, enabled: bool) -> Self {
        self.capture_body = enabled;
        self
    }

    #[must_use]
    pub fn with_output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_file = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_max_body_bytes(mut self, limit: u64) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Connect and read timeout for this call.
    pub fn timeout(&self) -> Duration {
        match self.timeout_secs {
            0 => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            secs => Duration::from_secs(secs),
        }
    }

    /// Most body bytes buffered for this call.
    pub fn body_limit(&self) -> u64 {
        match self.max_body_bytes {
            0 => DEFAULT_MAX_BODY_BYTES,
            limit => limit,
        }
    }

    /// The configured authentication key, or `None` when it is blank.
    /// A non-blank key is returned exactly as given.
    pub fn authentication(&self) -> Option<&str> {
        self.authentication_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_with_defaults() {
        let spec: RequestSpec = serde_json::from_str(r#"{"url":"http://localhost/"}"#).unwrap();
        assert_eq!(spec, RequestSpec::new("http://localhost/"));
        assert_eq!(spec.method, HttpMethod::Get);
        assert_eq!(spec.valid_response_codes, "100:399");
        assert!(spec.capture_body);
        assert_eq!(spec.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn deserializes_full_spec() {
        let spec: RequestSpec = serde_json::from_str(
            r#"{
                "url": "http://localhost/api",
                "method": "POST",
                "content_type": "APPLICATION_JSON",
                "accept_type": "TEXT_PLAIN",
                "custom_headers": [{"name": "X", "value": "1"}, {"name": "X", "value": "2"}],
                "body_params": [{"name": "a", "value": "1"}],
                "timeout_secs": 5,
                "authentication_key": "login",
                "valid_response_codes": "200",
                "valid_response_content": "ok",
                "console_log_response_body": true
            }"#,
        )
        .unwrap();
        assert_eq!(spec.method, HttpMethod::Post);
        assert_eq!(spec.content_type, MimeType::ApplicationJson);
        assert_eq!(spec.custom_headers.len(), 2);
        assert_eq!(spec.timeout(), Duration::from_secs(5));
        assert_eq!(spec.authentication(), Some("login"));
    }

    #[test]
    fn missing_url_is_rejected() {
        let result: Result<RequestSpec, _> = serde_json::from_str(r#"{"method":"GET"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn blank_authentication_key_is_ignored() {
        let spec = RequestSpec::new("http://localhost/").with_authentication("  ");
        assert_eq!(spec.authentication(), None);
    }

    #[test]
    fn authentication_key_is_not_trimmed() {
        let spec = RequestSpec::new("http://localhost/").with_authentication(" ci ");
        assert_eq!(spec.authentication(), Some(" ci "));
    }

    #[test]
    fn zero_body_limit_means_default() {
        let spec = RequestSpec::new("http://localhost/");
        assert_eq!(spec.body_limit(), DEFAULT_MAX_BODY_BYTES);
        assert_eq!(spec.with_max_body_bytes(16).body_limit(), 16);
    }

    #[test]
    fn builder_methods_preserve_header_order() {
        let spec = RequestSpec::new("http://localhost/")
            .with_header("X", "1")
            .with_header("X", "2");
        let values: Vec<_> = spec.custom_headers.iter().map(|h| h.value.as_str()).collect();
        assert_eq!(values, vec!["1", "2"]);
    }
}
