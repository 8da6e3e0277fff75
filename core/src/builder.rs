//! Turns declarative parameters into a pending [`HttpRequest`].
//!
//! Encoding rules:
//! - GET, HEAD, DELETE and OPTIONS carry parameters as a URL-encoded query
//!   string appended to any query already present in the URL.
//! - POST, PUT and PATCH carry them as the body. Without a declared content
//!   type (or with the form type) the body is `application/x-www-form-urlencoded`.
//!   With any other declared type the pairs are joined verbatim as
//!   `name=value&...`; a single pair with an empty name is sent as its raw
//!   value, which is how JSON and other opaque payloads are passed.
//! - `Content-Type` and `Accept` come first, then every custom header in
//!   input order. Headers are appended, never replaced.
//!
//! Nothing here performs I/O.

use ureq::http::{HeaderName, HeaderValue};
use url::form_urlencoded;
use url::Url;

use crate::error::ConfigurationError;
use crate::http::{HttpMethod, HttpRequest, MimeType, FORM_URLENCODED};
use crate::types::{NameValuePair, RequestAction, RequestSpec};

/// Build the request for the real call described by `spec`.
pub fn build(spec: &RequestSpec) -> Result<HttpRequest, ConfigurationError> {
    let mut request = encode(spec.method, &spec.url, &spec.body_params, spec.content_type)?;

    if let Some(content_type) = spec.content_type.value() {
        request
            .headers
            .insert(0, ("Content-Type".to_string(), content_type.to_string()));
    }
    if let Some(accept) = spec.accept_type.value() {
        request.headers.push(("Accept".to_string(), accept.to_string()));
    }
    for header in &spec.custom_headers {
        check_header(header)?;
        request
            .headers
            .push((header.name.clone(), header.value.clone()));
    }
    Ok(request)
}

/// Build one form-login step. Steps use the same parameter encoding as the
/// real call but no convenience or custom headers.
pub fn build_action(action: &RequestAction) -> Result<HttpRequest, ConfigurationError> {
    encode(action.method, &action.url, &action.params, MimeType::NotSet)
}

/// Parse and check `raw` as an absolute http(s) URL.
pub fn parse_url(raw: &str) -> Result<Url, ConfigurationError> {
    let url = Url::parse(raw.trim()).map_err(|e| ConfigurationError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(ConfigurationError::InvalidUrl {
                url: raw.to_string(),
                reason: format!("unsupported scheme '{scheme}'"),
            })
        }
    }
    if url.host_str().is_none() {
        return Err(ConfigurationError::InvalidUrl {
            url: raw.to_string(),
            reason: "missing host".to_string(),
        });
    }
    Ok(url)
}

fn encode(
    method: HttpMethod,
    raw_url: &str,
    params: &[NameValuePair],
    content_type: MimeType,
) -> Result<HttpRequest, ConfigurationError> {
    let mut url = parse_url(raw_url)?;
    let mut headers = Vec::new();
    let mut body = None;

    if method.sends_body() {
        if !params.is_empty() {
            match content_type {
                MimeType::NotSet => {
                    headers.push(("Content-Type".to_string(), FORM_URLENCODED.to_string()));
                    body = Some(form_encode(params));
                }
                MimeType::ApplicationForm => body = Some(form_encode(params)),
                _ => body = Some(join_verbatim(params)),
            }
        }
    } else if !params.is_empty() {
        url.query_pairs_mut()
            .extend_pairs(params.iter().map(|p| (p.name.as_str(), p.value.as_str())));
    }

    Ok(HttpRequest {
        method,
        url: url.to_string(),
        headers,
        body,
    })
}

fn form_encode(params: &[NameValuePair]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter().map(|p| (p.name.as_str(), p.value.as_str())))
        .finish()
}

fn join_verbatim(params: &[NameValuePair]) -> String {
    match params {
        [only] if only.name.is_empty() => only.value.clone(),
        _ => params
            .iter()
            .map(|p| format!("{}={}", p.name, p.value))
            .collect::<Vec<_>>()
            .join("&"),
    }
}

fn check_header(header: &NameValuePair) -> Result<(), ConfigurationError> {
    HeaderName::from_bytes(header.name.as_bytes()).map_err(|e| {
        ConfigurationError::InvalidHeader {
            name: header.name.clone(),
            reason: e.to_string(),
        }
    })?;
    HeaderValue::from_str(&header.value).map_err(|e| ConfigurationError::InvalidHeader {
        name: header.name.clone(),
        reason: e.to_string(),
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(req: &HttpRequest) -> Option<String> {
        Url::parse(&req.url).unwrap().query().map(str::to_string)
    }

    #[test]
    fn get_params_become_query_string() {
        let spec = RequestSpec::new("http://localhost:3000/echo")
            .with_param("a", "1")
            .with_param("b", "2");
        let req = build(&spec).unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(query(&req).as_deref(), Some("a=1&b=2"));
        assert!(req.body.is_none());
        assert!(req.headers.is_empty());
    }

    #[test]
    fn post_params_become_form_body() {
        let spec = RequestSpec::new("http://localhost:3000/echo")
            .with_method(HttpMethod::Post)
            .with_param("a", "1")
            .with_param("b", "2");
        let req = build(&spec).unwrap();
        assert_eq!(req.body.as_deref(), Some("a=1&b=2"));
        assert_eq!(query(&req), None);
        assert_eq!(req.header_values("content-type"), vec![FORM_URLENCODED]);
    }

    #[test]
    fn query_params_are_appended_to_existing_query() {
        let spec = RequestSpec::new("http://localhost/echo?x=0")
            .with_method(HttpMethod::Delete)
            .with_param("a", "1 2");
        let req = build(&spec).unwrap();
        assert_eq!(query(&req).as_deref(), Some("x=0&a=1+2"));
    }

    #[test]
    fn head_and_options_use_query_string() {
        for method in [HttpMethod::Head, HttpMethod::Options] {
            let spec = RequestSpec::new("http://localhost/")
                .with_method(method)
                .with_param("q", "v");
            let req = build(&spec).unwrap();
            assert_eq!(query(&req).as_deref(), Some("q=v"), "{method}");
            assert!(req.body.is_none());
        }
    }

    #[test]
    fn form_body_is_percent_encoded() {
        let spec = RequestSpec::new("http://localhost/")
            .with_method(HttpMethod::Put)
            .with_param("name", "a&b=c");
        let req = build(&spec).unwrap();
        assert_eq!(req.body.as_deref(), Some("name=a%26b%3Dc"));
    }

    #[test]
    fn declared_content_type_overrides_form_header() {
        let spec = RequestSpec::new("http://localhost/")
            .with_method(HttpMethod::Post)
            .with_content_type(MimeType::TextPlain)
            .with_param("a", "1")
            .with_param("b", "x y");
        let req = build(&spec).unwrap();
        assert_eq!(req.header_values("content-type"), vec!["text/plain"]);
        assert_eq!(req.body.as_deref(), Some("a=1&b=x y"));
    }

    #[test]
    fn single_unnamed_param_is_sent_raw() {
        let spec = RequestSpec::new("http://localhost/")
            .with_method(HttpMethod::Patch)
            .with_content_type(MimeType::ApplicationJson)
            .with_param("", r#"{"title":"x"}"#);
        let req = build(&spec).unwrap();
        assert_eq!(req.body.as_deref(), Some(r#"{"title":"x"}"#));
        assert_eq!(req.header_values("Content-Type"), vec!["application/json"]);
    }

    #[test]
    fn explicit_form_content_type_is_sent_once() {
        let spec = RequestSpec::new("http://localhost/")
            .with_method(HttpMethod::Post)
            .with_content_type(MimeType::ApplicationForm)
            .with_param("a", "1");
        let req = build(&spec).unwrap();
        assert_eq!(req.header_values("content-type"), vec![FORM_URLENCODED]);
        assert_eq!(req.body.as_deref(), Some("a=1"));
    }

    #[test]
    fn post_without_params_has_no_body() {
        let spec = RequestSpec::new("http://localhost/").with_method(HttpMethod::Post);
        let req = build(&spec).unwrap();
        assert!(req.body.is_none());
        assert!(req.headers.is_empty());
    }

    #[test]
    fn convenience_headers_precede_custom_headers() {
        let spec = RequestSpec::new("http://localhost/")
            .with_content_type(MimeType::ApplicationJson)
            .with_accept_type(MimeType::TextHtml)
            .with_header("X", "1")
            .with_header("X", "2")
            .with_header("Accept", "application/zip");
        let req = build(&spec).unwrap();
        let names: Vec<_> = req.headers.iter().map(|(n, v)| format!("{n}={v}")).collect();
        assert_eq!(
            names,
            vec![
                "Content-Type=application/json",
                "Accept=text/html",
                "X=1",
                "X=2",
                "Accept=application/zip",
            ]
        );
    }

    #[test]
    fn rejects_bad_urls() {
        for url in ["not a url", "ftp://localhost/file", "/relative/path"] {
            let err = build(&RequestSpec::new(url)).unwrap_err();
            assert!(matches!(err, ConfigurationError::InvalidUrl { .. }), "{url}");
        }
    }

    #[test]
    fn rejects_bad_header_names() {
        let spec = RequestSpec::new("http://localhost/").with_header("bad header", "v");
        let err = build(&spec).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidHeader { .. }));
    }

    #[test]
    fn actions_use_the_same_encoding() {
        let action = RequestAction::new(
            HttpMethod::Post,
            "http://localhost/login",
            vec![NameValuePair::new("user", "admin"), NameValuePair::new("pass", "s3cr=t")],
        );
        let req = build_action(&action).unwrap();
        assert_eq!(req.body.as_deref(), Some("user=admin&pass=s3cr%3Dt"));
        assert_eq!(req.header_values("content-type"), vec![FORM_URLENCODED]);
    }
}
