//! Captured response: status, headers and a body read at most once.
//!
//! # Design
//! The body is buffered as raw bytes, either right after the response
//! arrives or, when the caller opted out of eager capture, on first access.
//! Either way it is read under a size limit and stored in a `OnceLock`, so
//! every later read returns the cached value without touching the network.
//!
//! [`ResponseCapture::bytes`] exposes the body exactly as received;
//! [`ResponseCapture::content`] exposes it as text, with invalid UTF-8
//! replaced by U+FFFD.
//!
//! A failure while reading (timeout, I/O, size limit) is a
//! [`TransportError`]. Eager capture reports it from
//! [`ResponseCapture::from_response`]; lazy capture reports it from
//! [`ResponseCapture::try_content`] or [`ResponseCapture::try_bytes`].

use std::fmt;
use std::sync::{Mutex, OnceLock, PoisonError};
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{Result, TransportError};

/// A body as received, plus its text form when it was not valid UTF-8.
enum Payload {
    Text(String),
    Binary { raw: Vec<u8>, text: String },
}

impl Payload {
    fn decode(raw: Vec<u8>) -> Self {
        match String::from_utf8(raw) {
            Ok(text) => Payload::Text(text),
            Err(e) => {
                let raw = e.into_bytes();
                let text = String::from_utf8_lossy(&raw).into_owned();
                Payload::Binary { raw, text }
            }
        }
    }

    fn bytes(&self) -> &[u8] {
        match self {
            Payload::Text(text) => text.as_bytes(),
            Payload::Binary { raw, .. } => raw.as_slice(),
        }
    }

    fn text(&self) -> &str {
        match self {
            Payload::Text(text) | Payload::Binary { text, .. } => text.as_str(),
        }
    }
}

/// A body still on the wire, with what is needed to read and report it.
struct PendingBody {
    body: ureq::Body,
    url: String,
    timeout: Duration,
    limit: u64,
}

impl PendingBody {
    fn read(mut self) -> Result<Payload, TransportError> {
        let raw = self
            .body
            .with_config()
            .limit(self.limit)
            .read_to_vec()
            .map_err(|e| TransportError::from_ureq(&self.url, self.timeout, e))?;
        debug!(url = %self.url, bytes = raw.len(), "response body buffered");
        Ok(Payload::decode(raw))
    }
}

/// The result of one executed request.
pub struct ResponseCapture {
    status: u16,
    headers: Vec<(String, String)>,
    pending: Mutex<Option<PendingBody>>,
    payload: OnceLock<Option<Payload>>,
}

impl ResponseCapture {
    /// A capture whose body is already in memory.
    pub fn buffered(status: u16, headers: Vec<(String, String)>, content: Option<String>) -> Self {
        Self {
            status,
            headers,
            pending: Mutex::new(None),
            payload: OnceLock::from(content.map(Payload::Text)),
        }
    }

    /// Capture `response`. With `eager` the body is read now and a read
    /// failure is returned; otherwise it is read on first access.
    pub(crate) fn from_response(
        response: ureq::http::Response<ureq::Body>,
        url: &str,
        timeout: Duration,
        limit: u64,
        eager: bool,
    ) -> Result<Self> {
        let (parts, body) = response.into_parts();
        let headers = parts
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let pending = PendingBody {
            body,
            url: url.to_string(),
            timeout,
            limit,
        };
        let capture = if eager {
            Self {
                status: parts.status.as_u16(),
                headers,
                pending: Mutex::new(None),
                payload: OnceLock::from(Some(pending.read()?)),
            }
        } else {
            Self {
                status: parts.status.as_u16(),
                headers,
                pending: Mutex::new(Some(pending)),
                payload: OnceLock::new(),
            }
        };
        Ok(capture)
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// First value of `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The body as text. A deferred body that fails to read is logged and
    /// reported as absent; use [`try_content`](Self::try_content) to get the
    /// error instead.
    pub fn content(&self) -> Option<&str> {
        self.load_or_warn().map(Payload::text)
    }

    /// The body exactly as received.
    pub fn bytes(&self) -> Option<&[u8]> {
        self.load_or_warn().map(Payload::bytes)
    }

    pub fn try_content(&self) -> Result<Option<&str>> {
        Ok(self.load()?.map(Payload::text))
    }

    pub fn try_bytes(&self) -> Result<Option<&[u8]>> {
        Ok(self.load()?.map(Payload::bytes))
    }

    fn load_or_warn(&self) -> Option<&Payload> {
        self.load().unwrap_or_else(|e| {
            warn!(status = self.status, error = %e, "failed to read response body");
            None
        })
    }

    fn load(&self) -> Result<Option<&Payload>> {
        if let Some(payload) = self.payload.get() {
            return Ok(payload.as_ref());
        }
        // Held until the payload is set, so a concurrent caller never sees
        // the body taken but not yet stored.
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(payload) = self.payload.get() {
            return Ok(payload.as_ref());
        }
        let read = pending.take().map(PendingBody::read).transpose();
        match read {
            Ok(payload) => Ok(self.payload.get_or_init(|| payload).as_ref()),
            Err(e) => {
                let _ = self.payload.set(None);
                Err(e.into())
            }
        }
    }
}

impl fmt::Debug for ResponseCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseCapture")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field(
                "content",
                &self.payload.get().map(|p| p.as_ref().map(Payload::text)),
            )
            .finish()
    }
}

impl fmt::Display for ResponseCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Status: {}, Response: ", self.status)?;
        match self.content() {
            Some(content) => f.write_str(content),
            None => f.write_str("null"),
        }
    }
}
