//! Request execution and authentication engine for automation jobs.
//!
//! # Overview
//! Performs a single outbound HTTP call described by a [`RequestSpec`],
//! optionally preceded by an authentication handshake, and validates the
//! response against the caller's success criteria.
//!
//! # Design
//! - [`builder`] turns declarative parameters into a plain-data
//!   [`HttpRequest`] without touching the network.
//! - [`AuthStrategy`] prepares a per-call [`Session`] (none, pre-emptive
//!   Basic with Digest fallback, or a replayed form login).
//! - [`RequestExecutor`] resolves the authentication from an injected
//!   [`AuthRegistry`], sends the request under a bounded timeout and returns a
//!   [`ResponseCapture`].
//! - [`validate`] checks status ranges and required content; a failure keeps
//!   the captured response in [`Error::Validation`].

pub mod auth;
pub mod builder;
pub mod capture;
pub mod console;
pub mod error;
pub mod executor;
pub mod http;
pub mod range;
pub mod session;
pub mod types;
pub mod validate;

pub use auth::{AuthRegistry, AuthStrategy, AuthenticationEntry, BasicDigestAuth, FormAuth};
pub use capture::ResponseCapture;
pub use console::{ConsoleLog, MemoryConsole, TracingConsole};
pub use error::{
    AuthenticationError, ConfigurationError, Error, RangeParseError, Result, TransportError,
    ValidationError,
};
pub use executor::RequestExecutor;
pub use http::{HttpMethod, HttpRequest, MimeType};
pub use range::{RangeSet, StatusRange};
pub use session::Session;
pub use types::{NameValuePair, RequestAction, RequestSpec};
