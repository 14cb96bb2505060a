use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::errors::KeeperError;

/// Failures of the store, the services, and account handling.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid secret type '{0}'")]
    InvalidType(String),

    #[error("secret already exists")]
    AlreadyExists,

    #[error("secret not found")]
    NotFound,

    #[error("login '{0}' is already taken")]
    LoginTaken(String),

    #[error("invalid login or password")]
    InvalidCredentials,

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("database connection poisoned")]
    Poisoned,
}

impl From<StoreError> for KeeperError {
    fn from(e: StoreError) -> Self {
        KeeperError::Store(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum AppErrorKind {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("not found")]
    NotFound,
    #[error("unexpected error: {0}")]
    Internal(String),
}

/// Handler failure. The response carries only the status code; the
/// detail is for the log.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct AppError {
    kind: AppErrorKind,
}

impl AppError {
    pub fn new(kind: AppErrorKind) -> Self {
        Self { kind }
    }

    pub fn bad_request<T: Into<String>>(message: T) -> Self {
        Self::new(AppErrorKind::BadRequest(message.into()))
    }

    pub fn unauthorized<T: Into<String>>(message: T) -> Self {
        Self::new(AppErrorKind::Unauthorized(message.into()))
    }

    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::new(AppErrorKind::Internal(message.into()))
    }

    /// Absence is reported as 204 No Content.
    pub fn status(&self) -> StatusCode {
        match self.kind {
            AppErrorKind::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppErrorKind::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppErrorKind::Conflict(_) => StatusCode::CONFLICT,
            AppErrorKind::NotFound => StatusCode::NO_CONTENT,
            AppErrorKind::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.status().into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        let kind = match value {
            StoreError::InvalidType(_) => AppErrorKind::BadRequest(value.to_string()),
            StoreError::AlreadyExists | StoreError::LoginTaken(_) => {
                AppErrorKind::Conflict(value.to_string())
            }
            StoreError::NotFound => AppErrorKind::NotFound,
            StoreError::InvalidCredentials => AppErrorKind::Unauthorized(value.to_string()),
            StoreError::Hashing(_) | StoreError::Database(_) | StoreError::Poisoned => {
                AppErrorKind::Internal(value.to_string())
            }
        };
        AppError::new(kind)
    }
}

impl From<KeeperError> for AppError {
    fn from(value: KeeperError) -> Self {
        match value {
            KeeperError::Multipart(_)
            | KeeperError::InvalidDataType(_)
            | KeeperError::Serialization(_)
            | KeeperError::EmptyInput => AppError::bad_request(value.to_string()),
            other => AppError::internal(other.to_string()),
        }
    }
}
