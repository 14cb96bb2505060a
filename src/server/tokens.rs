//! Session tokens: EdDSA-signed JWTs binding one user id.
//!
//! The signing key pair is generated when the server starts and never
//! leaves the process, so a restart invalidates every outstanding
//! session. There is no revocation list.

use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use ed25519_dalek::pkcs8::EncodePrivateKey;
use ed25519_dalek::SigningKey;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroizing;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("signing key error: {0}")]
    Key(String),
}

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

/// Issues and verifies session tokens.
pub struct TokenAuthority {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenAuthority {
    /// Generate a fresh Ed25519 key pair.
    pub fn generate(ttl: Duration) -> Result<Self, TokenError> {
        let mut seed = Zeroizing::new([0u8; 32]);
        rand::rng().fill_bytes(&mut *seed);

        let signing_key = SigningKey::from_bytes(&seed);
        let pkcs8 = signing_key
            .to_pkcs8_der()
            .map_err(|e| TokenError::Key(e.to_string()))?;
        let public = URL_SAFE_NO_PAD.encode(signing_key.verifying_key().to_bytes());

        let decoding =
            DecodingKey::from_ed_components(&public).map_err(|e| TokenError::Key(e.to_string()))?;

        let mut validation = Validation::new(Algorithm::EdDSA);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Ok(Self {
            encoding: EncodingKey::from_ed_der(pkcs8.as_bytes()),
            decoding,
            validation,
            ttl,
        })
    }

    /// Issue a token for `user_id`, valid for the configured lifetime.
    pub fn issue(&self, user_id: i64) -> Result<String, TokenError> {
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        self.issue_expiring_at(user_id, Utc::now().timestamp().saturating_add(ttl))
    }

    /// Issue a token with an explicit expiry timestamp.
    pub fn issue_expiring_at(&self, user_id: i64, exp: i64) -> Result<String, TokenError> {
        encode(
            &Header::new(Algorithm::EdDSA),
            &Claims { user_id, exp },
            &self.encoding,
        )
        .map_err(|e| TokenError::Key(e.to_string()))
    }

    /// Check signature and expiry, returning the embedded claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }
}
