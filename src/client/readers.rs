//! Typed readers: turn interactive field input into a validated payload
//! for one secret type.
//!
//! Validation happens here and only here; nothing leaves the client
//! until a reader accepts it.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use zeroize::Zeroizing;

use crate::cli::console::Console;
use crate::errors::{KeeperError, Result};
use crate::secret::card::{parse_card_number, parse_cv, parse_expiry};
use crate::secret::{CardDetails, Credentials, Metadata, SecretKind};
use crate::transfer::metadata_json;

/// Line that ends multi-line text and metadata input.
pub const CLOSE: &str = "close";

/// Separator between a metadata key and its value.
pub const METADATA_SEPARATOR: &str = " : ";

/// One reader per secret type, plus metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretReader {
    Credentials,
    Card,
    Text,
    /// Reads the file at the given path.
    Binary(PathBuf),
    Metadata,
}

impl SecretReader {
    /// Reader for the payload of `kind`. Binary secrets take the file
    /// path up front.
    pub fn for_kind(kind: SecretKind, path: Option<PathBuf>) -> Result<Self> {
        Ok(match kind {
            SecretKind::Credentials => Self::Credentials,
            SecretKind::Card => Self::Card,
            SecretKind::Text => Self::Text,
            SecretKind::Binary => Self::Binary(path.ok_or(KeeperError::EmptyInput)?),
        })
    }

    /// Consume the reader and produce its payload bytes.
    pub fn read<R: BufRead, W: Write>(self, console: &mut Console<R, W>) -> Result<Vec<u8>> {
        match self {
            Self::Credentials => read_credentials(console),
            Self::Card => read_card(console),
            Self::Text => read_text(console),
            Self::Binary(path) => read_file(&path),
            Self::Metadata => metadata_json(&read_metadata(console)?),
        }
    }
}

fn read_credentials<R: BufRead, W: Write>(console: &mut Console<R, W>) -> Result<Vec<u8>> {
    let credentials = Zeroizing::new(Credentials {
        login: console.prompt("Login: ")?,
        password: console.prompt("Password: ")?,
    });
    Ok(serde_json::to_vec_pretty(&*credentials)?)
}

fn read_card<R: BufRead, W: Write>(console: &mut Console<R, W>) -> Result<Vec<u8>> {
    let number = parse_card_number(&console.prompt("Card number: ")?)?;
    let expires = parse_expiry(&console.prompt("Expires (MM/YY): ")?)?;
    let owner = console.prompt("Card owner: ")?;
    let cv = parse_cv(&console.prompt("CV: ")?)?;

    let card = CardDetails {
        number,
        owner,
        expires,
        cv,
    };
    Ok(serde_json::to_vec_pretty(&card)?)
}

/// Lines up to `close` or end of input, joined with newlines.
fn read_text<R: BufRead, W: Write>(console: &mut Console<R, W>) -> Result<Vec<u8>> {
    console.info(&format!("Type text, then `{CLOSE}` on its own line to finish"))?;

    let mut lines = Vec::new();
    while let Some(line) = console.read_line()? {
        if line == CLOSE {
            break;
        }
        lines.push(line);
    }
    Ok(lines.join("\n").into_bytes())
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    if !path.is_file() {
        return Err(KeeperError::InvalidFilePath(path.display().to_string()));
    }
    Ok(std::fs::read(path)?)
}

/// `key : value` lines up to `close`, an empty line, or end of input.
pub fn read_metadata<R: BufRead, W: Write>(console: &mut Console<R, W>) -> Result<Metadata> {
    console.info(&format!(
        "Metadata as `key{METADATA_SEPARATOR}value`, then `{CLOSE}` to finish"
    ))?;

    let mut metadata = Metadata::new();
    while let Some(line) = console.read_line()? {
        if line.is_empty() || line == CLOSE {
            break;
        }
        let (key, value) = parse_metadata_line(&line)?;
        metadata.insert(key, value);
    }
    Ok(metadata)
}

fn parse_metadata_line(line: &str) -> Result<(String, String)> {
    let fields: Vec<&str> = line.split(METADATA_SEPARATOR).map(str::trim).collect();
    match fields.as_slice() {
        [key, value] if !key.is_empty() && !value.is_empty() => {
            Ok((key.to_string(), value.to_string()))
        }
        _ => Err(KeeperError::InvalidMetadata(line.to_string())),
    }
}
