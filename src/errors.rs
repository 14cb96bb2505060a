use std::time::Duration;

use thiserror::Error;

/// All errors that can occur in the keeper client and server.
#[derive(Debug, Error)]
pub enum KeeperError {
    // --- Input errors ---
    #[error("Empty input — a value is required")]
    EmptyInput,

    #[error("Invalid data type '{0}' (expected credentials, card, text or binary)")]
    InvalidDataType(String),

    #[error("Invalid card number — expected 16 digits with a valid checksum")]
    InvalidCardNumber,

    #[error("Invalid card expiration date — expected MM/YY")]
    InvalidCardDate,

    #[error("Invalid card CV — expected a number between 100 and 999")]
    InvalidCardCv,

    #[error("Invalid metadata line '{0}' — expected `key : value`")]
    InvalidMetadata(String),

    #[error("Invalid file path: {0}")]
    InvalidFilePath(String),

    // --- Server outcome errors ---
    #[error("Bad request — the server rejected the input")]
    BadRequest,

    #[error("Unauthorized — register or log in first")]
    Unauthorized,

    #[error("Already exists")]
    AlreadyExists,

    #[error("Not found")]
    NotFound,

    #[error("Too large — the server refused the request body")]
    TooLarge,

    #[error("Internal server error")]
    ServerInternal,

    #[error("Unexpected status code {0}")]
    UnknownStatus(u16),

    #[error("Connection refused — is the server running?")]
    ConnectionRefused,

    // --- Session control ---
    #[error("Exit requested")]
    Exit,

    #[error("Unknown command '{0}' (type `help` for a list)")]
    UnknownCommand(String),

    #[error("Interrupted")]
    Interrupted,

    // --- Transport errors ---
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed multipart body: {0}")]
    Multipart(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    Config(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    Serialization(String),

    // --- Server runtime errors ---
    #[error("Store error: {0}")]
    Store(String),

    #[error("Shutdown did not complete within {0:?}")]
    ShutdownTimeout(Duration),
}

impl KeeperError {
    /// Whether the error belongs to the user-facing taxonomy.
    ///
    /// The client prints known errors and keeps going; anything else
    /// aborts the command loop.
    pub fn is_known(&self) -> bool {
        matches!(
            self,
            Self::EmptyInput
                | Self::InvalidDataType(_)
                | Self::InvalidCardNumber
                | Self::InvalidCardDate
                | Self::InvalidCardCv
                | Self::InvalidMetadata(_)
                | Self::InvalidFilePath(_)
                | Self::BadRequest
                | Self::Unauthorized
                | Self::AlreadyExists
                | Self::NotFound
                | Self::TooLarge
                | Self::ServerInternal
                | Self::UnknownStatus(_)
                | Self::ConnectionRefused
                | Self::Exit
                | Self::UnknownCommand(_)
        )
    }
}

impl From<serde_json::Error> for KeeperError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Convenience type alias for keeper results.
pub type Result<T> = std::result::Result<T, KeeperError>;
