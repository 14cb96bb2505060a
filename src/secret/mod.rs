//! Secret module: the typed records the keeper stores.
//!
//! This module provides:
//! - `SecretKind`, the closed set of secret types (`kind`)
//! - Card-number, expiry and CV rules (`card`)
//! - `Secret`, `Metadata` and the typed payload shapes (`record`)

pub mod card;
pub mod kind;
pub mod record;

// Re-export the most commonly used items.
pub use card::is_valid_card_number;
pub use kind::{is_valid_data_type, SecretKind};
pub use record::{CardDetails, Credentials, Metadata, Secret};
