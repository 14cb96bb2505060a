//! The stored `Secret` record and the JSON shapes of typed payloads.
//!
//! Payload bytes are opaque to the store; the shapes below only matter
//! to the client readers that produce them and to whoever reads them
//! back.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use super::SecretKind;

/// Caller-defined key/value annotations, kept in key order.
pub type Metadata = BTreeMap<String, String>;

/// A single stored secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Secret {
    /// Identity of the owning principal, assigned from the session token.
    pub owner: i64,

    pub kind: SecretKind,

    /// Caller-chosen identifier, unique per (owner, kind).
    pub name: String,

    pub payload: Vec<u8>,

    /// JSON-encoded `Metadata`, stored verbatim.
    pub metadata: Vec<u8>,

    /// Set by the store on insert, never changed afterwards.
    pub created_at: DateTime<Utc>,
}

/// Payload of a `credentials` secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

/// Payload of a `card` secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDetails {
    pub number: u64,
    pub owner: String,
    pub expires: NaiveDate,
    pub cv: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeroized_credentials_are_empty() {
        let mut credentials = Credentials {
            login: "alice".to_string(),
            password: "s3cret".to_string(),
        };
        credentials.zeroize();
        assert!(credentials.login.is_empty());
        assert!(credentials.password.is_empty());
    }
}
