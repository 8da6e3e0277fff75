//! Per-execution transport context.
//!
//! # Design
//! A `Session` owns a fresh `ureq::Agent` (and with it the cookie jar) plus
//! any credentials an authentication strategy installed. One session serves
//! exactly one execution: the form-login replay and the real request share
//! it, and nothing leaks into other executions.
//!
//! Installed credentials are scoped to the host and port of the target URL.
//! Matching requests carry a pre-emptive `Authorization: Basic` header; a
//! 401 answered with a Digest challenge is re-sent once with a Digest
//! `Authorization` header instead.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::debug;
use ureq::http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use ureq::http::Response;
use ureq::{Agent, Body};
use url::Url;

use crate::auth::digest::Challenge;
use crate::builder::parse_url;
use crate::error::{ConfigurationError, Result, TransportError};
use crate::http::HttpRequest;

struct Credentials {
    host: String,
    port: Option<u16>,
    username: String,
    password: String,
}

impl Credentials {
    fn applies_to(&self, url: &Url) -> bool {
        url.host_str() == Some(self.host.as_str()) && url.port_or_known_default() == self.port
    }

    fn basic(&self) -> String {
        let token = STANDARD.encode(format!("{}:{}", self.username, self.password));
        format!("Basic {token}")
    }
}

pub struct Session {
    agent: Agent,
    timeout: Duration,
    credentials: Option<Credentials>,
}

impl Session {
    /// A session whose connect and read timeouts are both `timeout`.
    pub fn new(timeout: Duration) -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_connect(Some(timeout))
            .timeout_send_request(Some(timeout))
            .timeout_send_body(Some(timeout))
            .timeout_recv_response(Some(timeout))
            .timeout_recv_body(Some(timeout))
            .build()
            .new_agent();
        Self {
            agent,
            timeout,
            credentials: None,
        }
    }

    /// Install Basic/Digest credentials for the host and port of `target`.
    pub fn install_credentials(&mut self, target: &Url, username: &str, password: &str) {
        let host = target.host_str().unwrap_or_default().to_string();
        debug!(host = %host, port = ?target.port_or_known_default(), "installing credentials");
        self.credentials = Some(Credentials {
            host,
            port: target.port_or_known_default(),
            username: username.to_string(),
            password: password.to_string(),
        });
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    /// Send `request`, answering a Digest challenge if credentials apply.
    pub fn send(&self, request: &HttpRequest) -> Result<Response<Body>> {
        let url = parse_url(&request.url)?;
        let credentials = self
            .credentials
            .as_ref()
            .filter(|c| c.applies_to(&url))
            .filter(|_| request.header_values("authorization").is_empty());

        let basic = credentials.map(Credentials::basic);
        let response = self.run(request, basic.as_deref())?;

        let Some(credentials) = credentials else {
            return Ok(response);
        };
        if response.status().as_u16() != 401 {
            return Ok(response);
        }
        let challenge = response
            .headers()
            .get_all(WWW_AUTHENTICATE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(Challenge::parse);
        let Some(challenge) = challenge else {
            return Ok(response);
        };

        debug!(url = %request.url, realm = %challenge.realm, "answering digest challenge");
        let uri = match url.query() {
            Some(query) => format!("{}?{query}", url.path()),
            None => url.path().to_string(),
        };
        let digest = challenge.authorization(
            request.method.as_str(),
            &uri,
            &credentials.username,
            &credentials.password,
        );
        drop(response);
        self.run(request, Some(&digest))
    }

    fn run(&self, request: &HttpRequest, authorization: Option<&str>) -> Result<Response<Body>> {
        let mut builder = ureq::http::Request::builder()
            .method(request.method.as_str())
            .uri(request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(authorization) = authorization {
            builder = builder.header(AUTHORIZATION, authorization);
        }

        let invalid = |e: ureq::http::Error| ConfigurationError::InvalidUrl {
            url: request.url.clone(),
            reason: e.to_string(),
        };
        let sent = match &request.body {
            Some(body) => self.agent.run(builder.body(body.clone()).map_err(invalid)?),
            None => self.agent.run(builder.body(()).map_err(invalid)?),
        };
        sent.map_err(|e| TransportError::from_ureq(&request.url, self.timeout, e).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_are_scoped_to_host_and_port() {
        let mut session = Session::new(Duration::from_secs(1));
        let target = Url::parse("http://localhost:8080/api").unwrap();
        session.install_credentials(&target, "u", "p");
        let creds = session.credentials.as_ref().unwrap();
        assert!(creds.applies_to(&Url::parse("http://localhost:8080/other").unwrap()));
        assert!(!creds.applies_to(&Url::parse("http://localhost:8081/api").unwrap()));
        assert!(!creds.applies_to(&Url::parse("http://example.com:8080/api").unwrap()));
    }

    #[test]
    fn default_ports_match_explicit_ports() {
        let mut session = Session::new(Duration::from_secs(1));
        session.install_credentials(&Url::parse("https://example.com/").unwrap(), "u", "p");
        let creds = session.credentials.as_ref().unwrap();
        assert!(creds.applies_to(&Url::parse("https://example.com:443/x").unwrap()));
        assert!(!creds.applies_to(&Url::parse("http://example.com/x").unwrap()));
    }

    #[test]
    fn basic_header_is_base64_of_user_and_password() {
        let creds = Credentials {
            host: "localhost".into(),
            port: Some(80),
            username: "admin".into(),
            password: "secret".into(),
        };
        assert_eq!(creds.basic(), "Basic YWRtaW46c2VjcmV0");
    }
}
