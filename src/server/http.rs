use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::header::{CONTENT_TYPE, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Router};
use serde::Deserialize;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::compression::CompressionLayer;
use tower_http::decompression::RequestDecompressionLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::auth::{self, cleared_cookie, session_cookie, Identity};
use super::error::AppError;
use super::service::SecretKey;
use super::state::AppState;
use crate::secret::{Secret, SecretKind};
use crate::transfer::{self, DecodedParts, FilePart};

#[derive(Deserialize)]
struct Account {
    login: String,
    password: String,
}

pub fn router(state: AppState) -> Router {
    let protected = protected_routes().layer(middleware::from_fn_with_state(
        state.clone(),
        auth::http_layer,
    ));

    let body_limit = match state.body_limit {
        0 => DefaultBodyLimit::disable(),
        limit => DefaultBodyLimit::max(limit),
    };

    Router::new()
        .route("/healthz", get(health_check))
        .route("/api/user/register", post(register))
        .route("/api/user/login", post(login))
        .merge(protected)
        .layer(body_limit)
        .layer(RequestDecompressionLayer::new())
        .layer(CompressionLayer::new())
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/api/user/logout", post(logout))
        .route(
            "/api/user/data/{kind}/{name}",
            post(create_secret)
                .get(read_secret)
                .put(update_secret)
                .delete(delete_secret),
        )
}

async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Run store or hashing work on the blocking pool.
async fn blocking<T, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::internal(format!("blocking task failed: {e}")))?
}

// ── Accounts ─────────────────────────────────────────────────────────

async fn register(State(state): State<AppState>, body: Bytes) -> Result<Response, AppError> {
    let account = parse_account(&body).inspect_err(|e| warn!(operation = "register", error = %e))?;

    let users = state.users.clone();
    let login = account.login.clone();
    let user_id = blocking(move || {
        users
            .register(&account.login, &account.password)
            .map_err(AppError::from)
    })
    .await
    .inspect_err(|e| warn!(operation = "register", login = %login, error = %e))?;

    info!(user_id, login = %login, "user registered");
    start_session(&state, user_id, "register")
}

async fn login(State(state): State<AppState>, body: Bytes) -> Result<Response, AppError> {
    let account = parse_account(&body).inspect_err(|e| warn!(operation = "login", error = %e))?;

    let users = state.users.clone();
    let login = account.login.clone();
    let user_id = blocking(move || {
        users
            .authenticate(&account.login, &account.password)
            .map_err(AppError::from)
    })
    .await
    .inspect_err(|e| warn!(operation = "login", login = %login, error = %e))?;

    start_session(&state, user_id, "login")
}

async fn logout(Extension(identity): Extension<Identity>) -> Response {
    info!(user_id = identity.user_id, "user logged out");
    (StatusCode::OK, [(SET_COOKIE, cleared_cookie())]).into_response()
}

fn parse_account(body: &[u8]) -> Result<Account, AppError> {
    let account: Account = serde_json::from_slice(body)
        .map_err(|e| AppError::bad_request(format!("malformed account body: {e}")))?;
    if account.login.is_empty() || account.password.is_empty() {
        return Err(AppError::bad_request("login and password are required"));
    }
    Ok(account)
}

fn start_session(state: &AppState, user_id: i64, operation: &str) -> Result<Response, AppError> {
    let token = state.tokens.issue(user_id).map_err(|e| {
        warn!(operation, user_id, error = %e, "failed to issue token");
        AppError::internal(e.to_string())
    })?;
    Ok((StatusCode::OK, [(SET_COOKIE, session_cookie(&token))]).into_response())
}

// ── Secrets ──────────────────────────────────────────────────────────

async fn create_secret(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path((kind, name)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let key = SecretKey {
        owner: identity.user_id,
        kind: &kind,
        name: &name,
    };
    let (payload, metadata) = decode_body(&state, &key, "create", &headers, &body)?;

    let secrets = state.secrets.clone();
    blocking(move || {
        let key = SecretKey {
            owner: identity.user_id,
            kind: &kind,
            name: &name,
        };
        secrets
            .create(&key, payload, metadata)
            .map_err(|e| failed(&key, "create", e.into()))
    })
    .await?;
    Ok(StatusCode::OK)
}

async fn read_secret(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path((kind, name)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let secrets = state.secrets.clone();
    let secret: Secret = blocking(move || {
        let key = SecretKey {
            owner: identity.user_id,
            kind: &kind,
            name: &name,
        };
        secrets
            .read(&key)
            .map_err(|e| failed(&key, "read", e.into()))
    })
    .await?;

    if secret.kind != SecretKind::Binary {
        return Ok((
            StatusCode::OK,
            [(CONTENT_TYPE, "text/plain; charset=utf-8".to_string())],
            secret.payload,
        )
            .into_response());
    }

    let encoded = transfer::encode_file(&FilePart {
        file_name: secret.name,
        bytes: secret.payload,
    });
    Ok((
        StatusCode::OK,
        [(CONTENT_TYPE, encoded.content_type)],
        encoded.body,
    )
        .into_response())
}

async fn update_secret(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path((kind, name)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let key = SecretKey {
        owner: identity.user_id,
        kind: &kind,
        name: &name,
    };
    let (payload, metadata) = decode_body(&state, &key, "update", &headers, &body)?;

    let secrets = state.secrets.clone();
    blocking(move || {
        let key = SecretKey {
            owner: identity.user_id,
            kind: &kind,
            name: &name,
        };
        secrets
            .update(&key, &payload, &metadata)
            .map_err(|e| failed(&key, "update", e.into()))
    })
    .await?;
    Ok(StatusCode::OK)
}

async fn delete_secret(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path((kind, name)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    let secrets = state.secrets.clone();
    blocking(move || {
        let key = SecretKey {
            owner: identity.user_id,
            kind: &kind,
            name: &name,
        };
        secrets
            .delete(&key)
            .map_err(|e| failed(&key, "delete", e.into()))
    })
    .await?;
    Ok(StatusCode::OK)
}

/// Decode a create/update body into (payload, metadata).
fn decode_body(
    state: &AppState,
    key: &SecretKey<'_>,
    operation: &str,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(Vec<u8>, Vec<u8>), AppError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| failed(key, operation, AppError::bad_request("missing content type")))?;

    let parts: DecodedParts = transfer::decode(content_type, body, state.truncation)
        .map_err(|e| failed(key, operation, e.into()))?;
    if parts.truncated {
        warn!(
            user_id = key.owner,
            operation,
            name = key.name,
            "kept truncated multipart body"
        );
    }
    Ok(parts.into_payload())
}

/// Log a handler failure with its context and pass it on.
fn failed(key: &SecretKey<'_>, operation: &str, err: AppError) -> AppError {
    if err.status() == StatusCode::INTERNAL_SERVER_ERROR {
        warn!(user_id = key.owner, operation, kind = key.kind, name = key.name, error = %err);
    } else {
        info!(user_id = key.owner, operation, kind = key.kind, name = key.name, error = %err);
    }
    err
}
