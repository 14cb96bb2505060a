//! Principal registration and login.
//!
//! Passwords are stored as Argon2id PHC strings; the plaintext never
//! reaches the store.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::RngCore;

use super::error::StoreError;
use super::repository::UserRepository;

#[derive(Clone)]
pub struct UserService {
    repo: UserRepository,
}

impl UserService {
    pub fn new(repo: UserRepository) -> Self {
        Self { repo }
    }

    /// Create a principal and return its id.
    pub fn register(&self, login: &str, password: &str) -> Result<i64, StoreError> {
        let hash = hash_password(password)?;
        self.repo.create(login, &hash)
    }

    /// Check a login/password pair and return the principal's id.
    ///
    /// Unknown logins and wrong passwords are indistinguishable to the
    /// caller.
    pub fn authenticate(&self, login: &str, password: &str) -> Result<i64, StoreError> {
        let user = self
            .repo
            .find_by_login(login)?
            .ok_or(StoreError::InvalidCredentials)?;

        let parsed = PasswordHash::new(&user.password_hash)
            .map_err(|e| StoreError::Hashing(e.to_string()))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| StoreError::InvalidCredentials)?;

        Ok(user.id)
    }
}

fn hash_password(password: &str) -> Result<String, StoreError> {
    let mut salt = [0u8; 16];
    rand::rng().fill_bytes(&mut salt);
    let salt = SaltString::encode_b64(&salt).map_err(|e| StoreError::Hashing(e.to_string()))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| StoreError::Hashing(e.to_string()))
}
