//! Authentication entries and the strategies that apply them.
//!
//! # Design
//! Entries are configuration records looked up by key name. At request time
//! an entry (or its absence) becomes an [`AuthStrategy`], whose single
//! capability is to prepare the execution's [`Session`] before the real
//! request is sent:
//!
//! - `None` leaves the session untouched.
//! - `BasicDigest` installs credentials for the target host and port.
//! - `Form` replays its login requests in order on the same session, so the
//!   cookies they set ride along on the real request. The first failing step
//!   aborts the sequence.

pub mod digest;
pub mod registry;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::builder::build_action;
use crate::error::{AuthenticationError, Result};
use crate::session::Session;
use crate::types::RequestAction;

pub use registry::AuthRegistry;

/// Username and password sent pre-emptively as Basic, or in answer to a
/// Digest challenge.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicDigestAuth {
    pub key_name: String,
    pub username: String,
    pub password: String,
}

impl BasicDigestAuth {
    pub fn new(
        key_name: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            key_name: key_name.into(),
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for BasicDigestAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicDigestAuth")
            .field("key_name", &self.key_name)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// An ordered sequence of login requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormAuth {
    pub key_name: String,
    #[serde(default)]
    pub actions: Vec<RequestAction>,
}

impl FormAuth {
    pub fn new(key_name: impl Into<String>, actions: Vec<RequestAction>) -> Self {
        Self {
            key_name: key_name.into(),
            actions,
        }
    }
}

/// A configured authentication, referenced by its key name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthenticationEntry {
    BasicDigest(BasicDigestAuth),
    Form(FormAuth),
}

impl AuthenticationEntry {
    pub fn key_name(&self) -> &str {
        match self {
            AuthenticationEntry::BasicDigest(auth) => &auth.key_name,
            AuthenticationEntry::Form(auth) => &auth.key_name,
        }
    }

    pub fn strategy(&self) -> AuthStrategy<'_> {
        match self {
            AuthenticationEntry::BasicDigest(auth) => AuthStrategy::BasicDigest(auth),
            AuthenticationEntry::Form(auth) => AuthStrategy::Form(auth),
        }
    }
}

impl From<BasicDigestAuth> for AuthenticationEntry {
    fn from(auth: BasicDigestAuth) -> Self {
        AuthenticationEntry::BasicDigest(auth)
    }
}

impl From<FormAuth> for AuthenticationEntry {
    fn from(auth: FormAuth) -> Self {
        AuthenticationEntry::Form(auth)
    }
}

/// How a session is prepared before the real request.
#[derive(Debug, Clone, Copy, Default)]
pub enum AuthStrategy<'a> {
    #[default]
    None,
    BasicDigest(&'a BasicDigestAuth),
    Form(&'a FormAuth),
}

impl<'a> AuthStrategy<'a> {
    pub fn for_entry(entry: Option<&'a AuthenticationEntry>) -> Self {
        entry.map(AuthenticationEntry::strategy).unwrap_or_default()
    }

    /// Prepare `session` for a real request to `target`.
    pub fn prepare(&self, session: &mut Session, target: &Url) -> Result<()> {
        match self {
            AuthStrategy::None => Ok(()),
            AuthStrategy::BasicDigest(auth) => {
                session.install_credentials(target, &auth.username, &auth.password);
                Ok(())
            }
            AuthStrategy::Form(auth) => replay(auth, session),
        }
    }
}

fn replay(auth: &FormAuth, session: &mut Session) -> Result<()> {
    // Every step is encoded up front so a malformed step fails before any
    // login request goes out.
    let steps = auth
        .actions
        .iter()
        .map(build_action)
        .collect::<Result<Vec<_>, _>>()?;

    for (index, request) in steps.iter().enumerate() {
        let step = index + 1;
        debug!(key = %auth.key_name, step, method = %request.method, url = %request.url, "form login step");
        let response = session.send(request)?;
        let status = response.status().as_u16();
        drop(response);
        if !(200..300).contains(&status) {
            warn!(key = %auth.key_name, step, status, "form login step failed");
            return Err(AuthenticationError::StepFailed {
                key: auth.key_name.clone(),
                step,
                method: request.method.to_string(),
                url: request.url.clone(),
                status,
            }
            .into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::{ConfigurationError, Error};
    use crate::http::HttpMethod;

    #[test]
    fn entries_deserialize_by_type_tag() {
        let entries: Vec<AuthenticationEntry> = serde_json::from_str(
            r#"[
                {"type": "basic_digest", "key_name": "ci", "username": "u", "password": "p"},
                {"type": "form", "key_name": "portal", "actions": [
                    {"url": "http://localhost/login", "method": "POST",
                     "params": [{"name": "user", "value": "u"}]}
                ]}
            ]"#,
        )
        .unwrap();
        assert_eq!(entries[0].key_name(), "ci");
        assert_eq!(entries[1].key_name(), "portal");
        match &entries[1] {
            AuthenticationEntry::Form(form) => {
                assert_eq!(form.actions.len(), 1);
                assert_eq!(form.actions[0].method, HttpMethod::Post);
            }
            other => panic!("expected form entry, got {other:?}"),
        }
    }

    #[test]
    fn debug_redacts_password() {
        let auth = BasicDigestAuth::new("ci", "admin", "hunter2");
        let rendered = format!("{auth:?}");
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn none_strategy_leaves_session_untouched() {
        let mut session = Session::new(Duration::from_secs(1));
        let target = Url::parse("http://localhost/").unwrap();
        AuthStrategy::for_entry(None).prepare(&mut session, &target).unwrap();
        assert!(!session.has_credentials());
    }

    #[test]
    fn basic_digest_strategy_installs_credentials() {
        let entry: AuthenticationEntry = BasicDigestAuth::new("ci", "u", "p").into();
        let mut session = Session::new(Duration::from_secs(1));
        let target = Url::parse("http://localhost/").unwrap();
        AuthStrategy::for_entry(Some(&entry))
            .prepare(&mut session, &target)
            .unwrap();
        assert!(session.has_credentials());
    }

    #[test]
    fn malformed_form_step_fails_before_sending() {
        let auth = FormAuth::new(
            "portal",
            vec![
                RequestAction::new(HttpMethod::Post, "http://127.0.0.1:9/login", Vec::new()),
                RequestAction::new(HttpMethod::Get, "not a url", Vec::new()),
            ],
        );
        let mut session = Session::new(Duration::from_secs(1));
        let target = Url::parse("http://localhost/").unwrap();
        let err = AuthStrategy::Form(&auth)
            .prepare(&mut session, &target)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Configuration(ConfigurationError::InvalidUrl { .. })
        ));
    }
}
