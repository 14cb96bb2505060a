//! Integration tests for the HTTP surface and its auth gate, driven
//! in-process through `tower::ServiceExt::oneshot`.

use std::time::{Duration, Instant};

use axum::body::{to_bytes, Body};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chrono::Utc;
use secretkeeper::server::http::router;
use secretkeeper::server::{AppState, Database, TokenAuthority};
use secretkeeper::transfer::{decode, encode, metadata_json, Envelope, TruncationPolicy};
use tower::ServiceExt;

struct Harness {
    app: Router,
    state: AppState,
}

impl Harness {
    fn new() -> Self {
        Self::with_state(AppState::new(
            Database::open_in_memory().unwrap(),
            TokenAuthority::generate(Duration::from_secs(3600)).unwrap(),
            TruncationPolicy::Strict,
        ))
    }

    fn with_state(state: AppState) -> Self {
        Self {
            app: router(state.clone()),
            state,
        }
    }

    async fn call(&self, request: Request<Body>) -> Response {
        self.app.clone().oneshot(request).await.unwrap()
    }

    /// Register `login` and return the `auth` cookie pair.
    async fn register(&self, login: &str) -> String {
        let response = self
            .call(json_post("/api/user/register", login, "pw"))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        auth_cookie(&response).expect("session cookie")
    }
}

fn json_post(path: &str, login: &str, password: &str) -> Request<Body> {
    Request::post(path)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({ "login": login, "password": password }).to_string(),
        ))
        .unwrap()
}

/// `auth=<token>` from the response's `Set-Cookie`, if any.
fn auth_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("auth="))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

fn multipart(method: &str, path: &str, cookie: &str, envelope: &Envelope) -> Request<Body> {
    let encoded = encode(envelope);
    Request::builder()
        .method(method)
        .uri(path)
        .header(COOKIE, cookie)
        .header(CONTENT_TYPE, encoded.content_type)
        .body(Body::from(encoded.body))
        .unwrap()
}

fn get(path: &str, cookie: &str) -> Request<Body> {
    Request::get(path)
        .header(COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

async fn body(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

fn empty_metadata() -> Vec<u8> {
    metadata_json(&Default::default()).unwrap()
}

// ---------------------------------------------------------------------------
// Auth gate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn healthz_is_public() {
    let h = Harness::new();
    let response = h
        .call(Request::get("/healthz").body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_credential_is_unauthorized() {
    let h = Harness::new();
    let response = h
        .call(
            Request::get("/api/user/data/text/note")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(body(response).await.is_empty());
}

#[tokio::test]
async fn expired_token_is_unauthorized() {
    let h = Harness::new();
    let token = h
        .state
        .tokens
        .issue_expiring_at(1, Utc::now().timestamp() - 5)
        .unwrap();
    let response = h
        .call(get("/api/user/data/text/note", &format!("auth={token}")))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_signed_by_another_key_is_unauthorized() {
    let h = Harness::new();
    let foreign = TokenAuthority::generate(Duration::from_secs(60))
        .unwrap()
        .issue(1)
        .unwrap();
    let response = h
        .call(get("/api/user/data/text/note", &format!("auth={foreign}")))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_authorization_header_is_bad_request() {
    let h = Harness::new();
    let response = h
        .call(
            Request::get("/api/user/data/text/note")
                .header(AUTHORIZATION, "Basic dXNlcjpwYXNz")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bearer_token_is_accepted() {
    let h = Harness::new();
    let cookie = h.register("alice").await;
    let token = cookie.trim_start_matches("auth=");

    let response = h
        .call(
            Request::get("/api/user/data/text/missing")
                .header(AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    // Authenticated, and the secret does not exist.
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn identity_comes_from_the_token() {
    let h = Harness::new();
    let alice = h.register("alice").await;
    let bob = h.register("bob").await;

    let envelope = Envelope::new(b"alice's note".to_vec(), empty_metadata());
    let response = h
        .call(multipart("POST", "/api/user/data/text/note", &alice, &envelope))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = h.call(get("/api/user/data/text/note", &bob)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = h.call(get("/api/user/data/text/note", &alice)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body(response).await, b"alice's note");
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn register_sets_scoped_http_only_cookie() {
    let h = Harness::new();
    let response = h
        .call(json_post("/api/user/register", "alice", "pw"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(cookie.starts_with("auth="));
    assert!(cookie.contains("Path=/api/user/"));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let h = Harness::new();
    h.register("alice").await;
    let response = h
        .call(json_post("/api/user/register", "alice", "other"))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn malformed_account_body_is_bad_request() {
    let h = Harness::new();
    let response = h
        .call(
            Request::post("/api/user/register")
                .body(Body::from("login=alice"))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = h.call(json_post("/api/user/login", "", "pw")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_checks_password() {
    let h = Harness::new();
    h.register("alice").await;

    let response = h.call(json_post("/api/user/login", "alice", "wrong")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(auth_cookie(&response).is_none());

    let response = h.call(json_post("/api/user/login", "alice", "pw")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(auth_cookie(&response).is_some());
}

#[tokio::test]
async fn logout_clears_cookie() {
    let h = Harness::new();
    let cookie = h.register("alice").await;

    let response = h
        .call(
            Request::post("/api/user/logout")
                .header(COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let set = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
    assert!(set.starts_with("auth=;"));
    assert!(set.contains("Max-Age=0"));
}

// ---------------------------------------------------------------------------
// Secrets
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_conflicts_on_second_attempt() {
    let h = Harness::new();
    let cookie = h.register("alice").await;
    let envelope = Envelope::new(b"{}".to_vec(), empty_metadata());

    let first = h
        .call(multipart("POST", "/api/user/data/credentials/gh", &cookie, &envelope))
        .await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = h
        .call(multipart("POST", "/api/user/data/credentials/gh", &cookie, &envelope))
        .await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn unknown_type_is_bad_request() {
    let h = Harness::new();
    let cookie = h.register("alice").await;
    let envelope = Envelope::new(b"x".to_vec(), empty_metadata());

    let response = h
        .call(multipart("POST", "/api/user/data/passwords/x", &cookie, &envelope))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn non_multipart_body_is_bad_request() {
    let h = Harness::new();
    let cookie = h.register("alice").await;

    let response = h
        .call(
            Request::post("/api/user/data/text/note")
                .header(COOKIE, &cookie)
                .header(CONTENT_TYPE, "text/plain")
                .body(Body::from("hello"))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_and_delete_of_missing_secret_are_no_content() {
    let h = Harness::new();
    let cookie = h.register("alice").await;
    let envelope = Envelope::new(b"x".to_vec(), empty_metadata());

    let response = h
        .call(multipart("PUT", "/api/user/data/text/ghost", &cookie, &envelope))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = h
        .call(
            Request::delete("/api/user/data/text/ghost")
                .header(COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn update_replaces_payload_then_delete_removes_it() {
    let h = Harness::new();
    let cookie = h.register("alice").await;
    let path = "/api/user/data/text/note";

    let v1 = Envelope::new(b"v1".to_vec(), empty_metadata());
    let v2 = Envelope::new(b"v2".to_vec(), empty_metadata());
    assert_eq!(h.call(multipart("POST", path, &cookie, &v1)).await.status(), StatusCode::OK);
    assert_eq!(h.call(multipart("PUT", path, &cookie, &v2)).await.status(), StatusCode::OK);
    assert_eq!(body(h.call(get(path, &cookie)).await).await, b"v2");

    let response = h
        .call(
            Request::delete(path)
                .header(COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.call(get(path, &cookie)).await.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn binary_secret_is_served_as_file_part() {
    let h = Harness::new();
    let cookie = h.register("alice").await;
    let bytes: Vec<u8> = (0..=255u8).collect();
    let envelope = Envelope::with_file(
        std::path::Path::new("/tmp/key.der"),
        bytes.clone(),
        empty_metadata(),
    )
    .unwrap();

    let response = h
        .call(multipart("POST", "/api/user/data/binary/signing-key", &cookie, &envelope))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = h
        .call(get("/api/user/data/binary/signing-key", &cookie))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    let parts = decode(&content_type, &body(response).await, TruncationPolicy::Strict).unwrap();
    let file = parts.file.expect("file part");
    assert_eq!(file.file_name, "signing-key");
    assert_eq!(file.bytes, bytes);
}

#[tokio::test]
async fn binary_larger_than_two_megabytes_is_stored() {
    let h = Harness::new();
    let cookie = h.register("alice").await;
    let bytes: Vec<u8> = (0..3 * 1024 * 1024).map(|i| (i % 251) as u8).collect();
    let envelope = Envelope::with_file(
        std::path::Path::new("/tmp/backup.tar"),
        bytes.clone(),
        empty_metadata(),
    )
    .unwrap();

    let response = h
        .call(multipart("POST", "/api/user/data/binary/backup", &cookie, &envelope))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = h.call(get("/api/user/data/binary/backup", &cookie)).await;
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    let parts = decode(&content_type, &body(response).await, TruncationPolicy::Strict).unwrap();
    assert_eq!(parts.file.expect("file part").bytes, bytes);
}

#[tokio::test]
async fn body_over_the_configured_limit_is_payload_too_large() {
    let state = AppState::new(
        Database::open_in_memory().unwrap(),
        TokenAuthority::generate(Duration::from_secs(3600)).unwrap(),
        TruncationPolicy::Strict,
    )
    .with_body_limit(64 * 1024);
    let h = Harness::with_state(state);
    let cookie = h.register("alice").await;

    let small = Envelope::new(vec![b'a'; 1024], empty_metadata());
    let response = h
        .call(multipart("POST", "/api/user/data/text/small", &cookie, &small))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let large = Envelope::new(vec![b'a'; 128 * 1024], empty_metadata());
    let response = h
        .call(multipart("POST", "/api/user/data/text/large", &cookie, &large))
        .await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn password_hashing_leaves_the_runtime_responsive() {
    let h = Harness::new();
    let started = Instant::now();
    let timer = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        started.elapsed()
    });

    let response = h.call(json_post("/api/user/register", "alice", "pw")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let fired_after = timer.await.unwrap();
    assert!(fired_after < Duration::from_millis(250), "timer fired after {fired_after:?}");
}

#[tokio::test]
async fn percent_encoded_names_are_decoded() {
    let h = Harness::new();
    let cookie = h.register("alice").await;
    let envelope = Envelope::new(b"spaced".to_vec(), empty_metadata());

    let response = h
        .call(multipart("POST", "/api/user/data/text/my%20note", &cookie, &envelope))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let stored = h
        .state
        .secrets
        .read(&secretkeeper::server::service::SecretKey {
            owner: 1,
            kind: "text",
            name: "my note",
        })
        .unwrap();
    assert_eq!(stored.payload, b"spaced");
}
