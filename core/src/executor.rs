//! Runs one request end to end.
//!
//! # Design
//! `RequestExecutor` holds only shared, read-mostly collaborators: the
//! authentication registry and the console log. Everything mutable (agent,
//! cookies, credentials) lives in a `Session` created inside each call, so
//! concurrent executions on the same executor never see each other's state.
//!
//! Every configuration problem (unknown authentication key, bad URL or
//! header, malformed range text) is detected before the first byte goes out.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::auth::{AuthRegistry, AuthStrategy};
use crate::builder::{self, parse_url};
use crate::capture::ResponseCapture;
use crate::console::{ConsoleLog, TracingConsole};
use crate::error::{ConfigurationError, Error, Result, ValidationError};
use crate::range::RangeSet;
use crate::session::Session;
use crate::types::RequestSpec;
use crate::validate;

pub struct RequestExecutor {
    registry: Arc<AuthRegistry>,
    console: Arc<dyn ConsoleLog>,
}

impl RequestExecutor {
    /// An executor that writes its console notices to `tracing`.
    pub fn new(registry: Arc<AuthRegistry>) -> Self {
        Self {
            registry,
            console: Arc::new(TracingConsole),
        }
    }

    #[must_use]
    pub fn with_console(mut self, console: Arc<dyn ConsoleLog>) -> Self {
        self.console = console;
        self
    }

    pub fn registry(&self) -> &AuthRegistry {
        &self.registry
    }

    /// Authenticate if configured, send the request and capture the response.
    /// No validation is applied.
    #[instrument(skip_all, fields(method = %spec.method, url = %spec.url))]
    pub fn execute(&self, spec: &RequestSpec) -> Result<ResponseCapture> {
        self.console.line(&format!("HttpMode: {}", spec.method));
        self.console.line(&format!("URL: {}", spec.url));

        let entry = spec
            .authentication()
            .map(|key| {
                self.registry
                    .lookup(key)
                    .ok_or_else(|| ConfigurationError::UnknownAuthentication(key.to_string()))
            })
            .transpose()?;

        let request = builder::build(spec)?;
        let target = parse_url(&request.url)?;

        if let Some(content_type) = spec.content_type.value() {
            self.console.line(&format!("Content-type: {content_type}"));
        }
        if let Some(accept) = spec.accept_type.value() {
            self.console.line(&format!("Accept: {accept}"));
        }
        for header in &spec.custom_headers {
            self.console.line(&format!("{}: {}", header.name, header.value));
        }

        let mut session = Session::new(spec.timeout());
        if let Some(entry) = &entry {
            self.console
                .line(&format!("Using authentication: {}", entry.key_name()));
        }
        AuthStrategy::for_entry(entry.as_ref()).prepare(&mut session, &target)?;

        let response = session.send(&request)?;
        let capture = ResponseCapture::from_response(
            response,
            &request.url,
            spec.timeout(),
            spec.body_limit(),
            spec.capture_body,
        )?;
        debug!(status = capture.status(), "response received");
        Ok(capture)
    }

    /// [`execute`](Self::execute), then log and store the body as configured
    /// and validate status and content.
    ///
    /// On a validation failure the returned [`Error::Validation`] still
    /// carries the captured response.
    #[instrument(skip_all, fields(method = %spec.method, url = %spec.url))]
    pub fn perform(&self, spec: &RequestSpec) -> Result<ResponseCapture> {
        let ranges = RangeSet::parse(Some(spec.valid_response_codes.as_str()))?;

        let capture = self.execute(spec)?;

        // A deferred body is read here when anything below needs it, so a
        // read failure surfaces as a transport error rather than an empty body.
        let needs_body = spec.console_log_response_body
            || spec.output_file.is_some()
            || spec
                .valid_response_content
                .as_deref()
                .is_some_and(|c| !c.is_empty());
        if needs_body {
            capture.try_bytes()?;
        }

        if spec.console_log_response_body {
            self.console
                .line(&format!("Response: \n{}", capture.content().unwrap_or("null")));
        }
        if let Some(path) = &spec.output_file {
            self.save(&capture, path)?;
        }

        let matched = match validate::validate_status(&capture, &ranges) {
            Ok(range) => *range,
            Err(error) => return Err(self.fail(error, capture)),
        };
        self.console.line(&format!("Success code from {matched}"));

        if let Err(error) =
            validate::validate_content(&capture, spec.valid_response_content.as_deref())
        {
            return Err(self.fail(error, capture));
        }
        Ok(capture)
    }

    fn save(&self, capture: &ResponseCapture, path: &Path) -> Result<()> {
        let Some(content) = capture.bytes() else {
            return Ok(());
        };
        self.console
            .line(&format!("Saving response to {}", path.display()));
        std::fs::write(path, content).map_err(|source| Error::Output {
            path: path.to_path_buf(),
            source,
        })
    }

    fn fail(&self, error: ValidationError, capture: ResponseCapture) -> Error {
        warn!(status = capture.status(), %error, "response failed validation");
        Error::Validation {
            error,
            response: Box::new(capture),
        }
    }
}
