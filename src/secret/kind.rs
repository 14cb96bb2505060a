//! The closed set of secret types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::KeeperError;

/// Every type of secret the keeper understands.
///
/// The wire and storage spelling is the lowercase variant name, e.g.
/// `/api/user/data/card/visa`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretKind {
    Credentials,
    Card,
    Text,
    Binary,
}

impl SecretKind {
    pub const ALL: [SecretKind; 4] = [Self::Credentials, Self::Card, Self::Text, Self::Binary];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Credentials => "credentials",
            Self::Card => "card",
            Self::Text => "text",
            Self::Binary => "binary",
        }
    }
}

impl fmt::Display for SecretKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecretKind {
    type Err = KeeperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| KeeperError::InvalidDataType(s.to_string()))
    }
}

/// Returns true if `value` names one of the supported secret types.
///
/// Matching is exact: `"Card"` and `" card"` are rejected.
pub fn is_valid_data_type(value: &str) -> bool {
    value.parse::<SecretKind>().is_ok()
}
