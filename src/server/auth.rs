//! Auth gate for the protected routes.
//!
//! The credential is looked up in the `Authorization: Bearer` header
//! first, then in the `auth` cookie. A header that cannot be read at all
//! is a malformed credential (400); no credential, a bad signature or an
//! expired token are all 401.

use axum::body::Body;
use axum::extract::State;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use super::error::AppError;
use super::state::AppState;
use super::tokens::TokenError;

/// Name of the session cookie.
pub const AUTH_COOKIE: &str = "auth";

/// Path the session cookie is scoped to.
pub const COOKIE_PATH: &str = "/api/user/";

/// The verified principal, attached to the request extensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
}

pub async fn http_layer(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = match credential(req.headers()) {
        Ok(Some(token)) => token,
        Ok(None) => return AppError::unauthorized("missing credential").into_response(),
        Err(err) => return err.into_response(),
    };

    match state.tokens.verify(&token) {
        Ok(claims) => {
            req.extensions_mut().insert(Identity {
                user_id: claims.user_id,
            });
            next.run(req).await
        }
        Err(err) => {
            debug!(error = %err, "rejected session token");
            let reason = match err {
                TokenError::Expired => "token expired",
                _ => "invalid token",
            };
            AppError::unauthorized(reason).into_response()
        }
    }
}

/// Pull the raw token out of the request headers.
fn credential(headers: &HeaderMap) -> Result<Option<String>, AppError> {
    if let Some(value) = headers.get(AUTHORIZATION) {
        let value = value
            .to_str()
            .map_err(|_| AppError::bad_request("unreadable authorization header"))?;
        return match extract_bearer_token(value) {
            Some(token) if !token.is_empty() => Ok(Some(token.to_string())),
            _ => Err(AppError::bad_request("malformed authorization header")),
        };
    }

    for value in headers.get_all(COOKIE) {
        let value = value
            .to_str()
            .map_err(|_| AppError::bad_request("unreadable cookie header"))?;
        if let Some(token) = cookie_value(value, AUTH_COOKIE) {
            return Ok((!token.is_empty()).then(|| token.to_string()));
        }
    }

    Ok(None)
}

pub fn extract_bearer_token(value: &str) -> Option<&str> {
    let value = value.trim();
    if let Some(rest) = value.strip_prefix("Bearer ") {
        Some(rest.trim())
    } else if let Some(rest) = value.strip_prefix("bearer ") {
        Some(rest.trim())
    } else {
        None
    }
}

/// Find `name` in a `Cookie` header value (`a=1; b=2`).
pub fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"'))
}

/// `Set-Cookie` value handing out a session token.
pub fn session_cookie(token: &str) -> String {
    format!("{AUTH_COOKIE}={token}; Path={COOKIE_PATH}; HttpOnly; SameSite=Lax")
}

/// `Set-Cookie` value telling the client to drop its session.
pub fn cleared_cookie() -> String {
    format!("{AUTH_COOKIE}=; Path={COOKIE_PATH}; HttpOnly; SameSite=Lax; Max-Age=0")
}
