use std::sync::Arc;

use super::db::Database;
use super::repository::{SecretRepository, UserRepository};
use super::service::SecretService;
use super::tokens::TokenAuthority;
use super::users::UserService;
use crate::transfer::TruncationPolicy;

pub type SharedSecrets = Arc<SecretService>;
pub type SharedUsers = Arc<UserService>;
pub type SharedTokens = Arc<TokenAuthority>;

/// Everything a handler needs. Read-only after start-up; the store
/// connection is the only serialization point.
#[derive(Clone)]
pub struct AppState {
    pub secrets: SharedSecrets,
    pub users: SharedUsers,
    pub tokens: SharedTokens,
    pub truncation: TruncationPolicy,
    /// Request body cap in bytes; 0 means unlimited.
    pub body_limit: usize,
}

/// Body cap used unless configured otherwise.
pub const DEFAULT_BODY_LIMIT: usize = 64 * 1024 * 1024;

impl AppState {
    pub fn new(db: Database, tokens: TokenAuthority, truncation: TruncationPolicy) -> Self {
        Self {
            secrets: Arc::new(SecretService::new(SecretRepository::new(db.clone()))),
            users: Arc::new(UserService::new(UserRepository::new(db))),
            tokens: Arc::new(tokens),
            truncation,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }
}
