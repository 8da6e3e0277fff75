//! HTTP transport types shared by the builder and the executor.
//!
//! # Design
//! `HttpRequest` describes a pending request as plain data. The builder
//! produces it without touching the network; the executor's `Session` turns
//! it into a transport request only when it is actually sent. Keeping the
//! pending request as data lets the same value be re-sent (digest challenge)
//! and makes the encoding rules testable without a server.
//!
//! Headers are an ordered `Vec` rather than a map: duplicate names are legal
//! and are sent in insertion order.

use std::fmt;

use serde::{Deserialize, Serialize};

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Head,
    Patch,
    Options,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Options => "OPTIONS",
        }
    }

    /// Whether parameters travel in the request body rather than the query
    /// string.
    pub fn sends_body(self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Media type used for the `Content-Type` and `Accept` convenience headers.
///
/// `NotSet` means "do not send this header at all".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MimeType {
    #[default]
    NotSet,
    TextHtml,
    TextPlain,
    ApplicationJson,
    ApplicationJsonUtf8,
    ApplicationTar,
    ApplicationZip,
    ApplicationOctetstream,
    ApplicationForm,
}

impl MimeType {
    /// The header value, or `None` for `NotSet`.
    pub fn value(self) -> Option<&'static str> {
        match self {
            MimeType::NotSet => None,
            MimeType::TextHtml => Some("text/html"),
            MimeType::TextPlain => Some("text/plain"),
            MimeType::ApplicationJson => Some("application/json"),
            MimeType::ApplicationJsonUtf8 => Some("application/json; charset=UTF-8"),
            MimeType::ApplicationTar => Some("application/x-tar"),
            MimeType::ApplicationZip => Some("application/zip"),
            MimeType::ApplicationOctetstream => Some("application/octet-stream"),
            MimeType::ApplicationForm => Some(FORM_URLENCODED),
        }
    }

    pub fn is_set(self) -> bool {
        self != MimeType::NotSet
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value().unwrap_or("NOT_SET"))
    }
}

pub(crate) const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// An HTTP request described as plain data.
///
/// Built by [`crate::builder::build`]. `url` already carries any query string
/// produced from body parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// All values of `name`, compared case-insensitively, in send order.
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }
}
