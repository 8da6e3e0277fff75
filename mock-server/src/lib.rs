use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Form, Json, Router,
};
use futures::stream::{self, StreamExt};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "secret";
pub const REALM: &str = "mock";
pub const NONCE: &str = "5f3b9a1c7d2e4f60";
pub const HELLO: &str = "All is well";

/// What `/stall-body` sends before it stops writing.
pub const PARTIAL: &str = "partial";

/// Served by `/binary`: a zip signature followed by bytes that are not UTF-8.
pub const BINARY: &[u8] = b"PK\x03\x04\xff\xfe\x00\x80";

/// How long `/hang` stalls before answering.
pub const HANG: Duration = Duration::from_secs(30);

/// What `/echo` saw, in arrival order.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Echo {
    pub method: String,
    pub query: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Echo {
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

#[derive(Deserialize)]
pub struct Login {
    pub username: String,
    pub password: String,
}

/// Shared by every handler. `hits` counts handled requests.
#[derive(Clone, Default)]
pub struct MockState {
    hits: Arc<AtomicUsize>,
    sessions: Arc<RwLock<HashSet<String>>>,
}

impl MockState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.hits.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn app() -> Router {
    app_with_state(MockState::new())
}

pub fn app_with_state(state: MockState) -> Router {
    Router::new()
        .route("/echo", any(echo))
        .route("/hello", get(hello))
        .route("/status/{code}", any(status))
        .route("/hang", any(hang))
        .route("/stall-body", get(stall_body))
        .route("/bytes/{len}", get(bytes_of_len))
        .route("/binary", get(binary))
        .route("/login", post(login))
        .route("/protected", get(protected))
        .route("/basic", get(basic))
        .route("/digest", any(digest))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_state(listener: TcpListener, state: MockState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(state)).await
}

async fn echo(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Json<Echo> {
    state.hit();
    let headers = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    Json(Echo {
        method: method.to_string(),
        query: uri.query().map(str::to_string),
        headers,
        body,
    })
}

async fn hello(State(state): State<MockState>) -> &'static str {
    state.hit();
    HELLO
}

async fn status(State(state): State<MockState>, Path(code): Path<u16>) -> Response {
    state.hit();
    match StatusCode::from_u16(code) {
        Ok(status) => (status, format!("status {code}")).into_response(),
        Err(_) => (StatusCode::BAD_REQUEST, "invalid status").into_response(),
    }
}

async fn hang(State(state): State<MockState>) -> &'static str {
    state.hit();
    tokio::time::sleep(HANG).await;
    "too late"
}

/// Headers and a first chunk go out at once; the rest of the body never does.
async fn stall_body(State(state): State<MockState>) -> Response {
    state.hit();
    let first = Bytes::from_static(PARTIAL.as_bytes());
    let chunks = stream::once(async move { Ok::<_, std::io::Error>(first) }).chain(stream::pending());
    Body::from_stream(chunks).into_response()
}

async fn bytes_of_len(State(state): State<MockState>, Path(len): Path<usize>) -> Vec<u8> {
    state.hit();
    vec![b'a'; len]
}

async fn binary(State(state): State<MockState>) -> Response {
    state.hit();
    ([(header::CONTENT_TYPE, "application/zip")], BINARY).into_response()
}

async fn login(State(state): State<MockState>, Form(input): Form<Login>) -> Response {
    state.hit();
    if input.username != USERNAME || input.password != PASSWORD {
        return (StatusCode::UNAUTHORIZED, "bad credentials").into_response();
    }
    let session = Uuid::new_v4().to_string();
    state.sessions.write().await.insert(session.clone());
    (
        [(header::SET_COOKIE, format!("session={session}; Path=/"))],
        "logged in",
    )
        .into_response()
}

async fn protected(State(state): State<MockState>, headers: HeaderMap) -> Response {
    state.hit();
    let session = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|c| c.trim().strip_prefix("session="))
        .map(str::to_string)
        .next();
    let known = match session {
        Some(id) => state.sessions.read().await.contains(&id),
        None => false,
    };
    if known {
        (StatusCode::OK, "welcome").into_response()
    } else {
        (StatusCode::FORBIDDEN, "login required").into_response()
    }
}

async fn basic(State(state): State<MockState>, headers: HeaderMap) -> Response {
    state.hit();
    // base64("admin:secret")
    let expected = "Basic YWRtaW46c2VjcmV0";
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);
    if authorized {
        (StatusCode::OK, "basic ok").into_response()
    } else {
        (StatusCode::UNAUTHORIZED, "basic required").into_response()
    }
}

async fn digest(State(state): State<MockState>, method: Method, headers: HeaderMap) -> Response {
    state.hit();
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| digest_matches(method.as_str(), v));
    if authorized {
        return (StatusCode::OK, "digest ok").into_response();
    }
    let challenge = format!(r#"Digest realm="{REALM}", qop="auth", nonce="{NONCE}", opaque="0pa9ue""#);
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, challenge)],
        "digest required",
    )
        .into_response()
}

fn digest_matches(method: &str, header: &str) -> bool {
    let Some(rest) = header.strip_prefix("Digest ") else {
        return false;
    };
    let params: HashMap<&str, &str> = rest
        .split(',')
        .filter_map(|p| p.split_once('='))
        .map(|(k, v)| (k.trim(), v.trim().trim_matches('"')))
        .collect();
    let field = |name: &str| param(&params, name);

    if field("username") != USERNAME || field("realm") != REALM || field("nonce") != NONCE {
        return false;
    }
    let ha1 = md5_hex(&format!("{USERNAME}:{REALM}:{PASSWORD}"));
    let ha2 = md5_hex(&format!("{method}:{}", field("uri")));
    let expected = if field("qop") == "auth" {
        md5_hex(&format!(
            "{ha1}:{NONCE}:{}:{}:auth:{ha2}",
            field("nc"),
            field("cnonce")
        ))
    } else {
        md5_hex(&format!("{ha1}:{NONCE}:{ha2}"))
    };
    field("response") == expected
}

fn param<'a>(params: &HashMap<&str, &'a str>, name: &str) -> &'a str {
    params.get(name).copied().unwrap_or_default()
}

fn md5_hex(input: &str) -> String {
    hex::encode(Md5::digest(input.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echo_roundtrips_through_json() {
        let echo = Echo {
            method: "GET".to_string(),
            query: Some("a=1".to_string()),
            headers: vec![("x".to_string(), "1".to_string()), ("x".to_string(), "2".to_string())],
            body: String::new(),
        };
        let json = serde_json::to_string(&echo).unwrap();
        let back: Echo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, echo);
        assert_eq!(back.header_values("X"), vec!["1", "2"]);
    }

    #[test]
    fn digest_accepts_correct_response() {
        let ha1 = md5_hex(&format!("{USERNAME}:{REALM}:{PASSWORD}"));
        let ha2 = md5_hex("GET:/digest");
        let response = md5_hex(&format!("{ha1}:{NONCE}:00000001:abc:auth:{ha2}"));
        let header = format!(
            r#"Digest username="{USERNAME}", realm="{REALM}", nonce="{NONCE}", uri="/digest", response="{response}", qop=auth, nc=00000001, cnonce="abc""#
        );
        assert!(digest_matches("GET", &header));
        assert!(!digest_matches("POST", &header));
    }

    #[test]
    fn digest_rejects_basic_and_wrong_user() {
        assert!(!digest_matches("GET", "Basic YWRtaW46c2VjcmV0"));
        assert!(!digest_matches(
            "GET",
            r#"Digest username="other", realm="mock", nonce="x", uri="/", response="0""#
        ));
    }

    #[test]
    fn login_form_requires_both_fields() {
        let result: Result<Login, _> = serde_json::from_str(r#"{"username":"admin"}"#);
        assert!(result.is_err());
    }
}
