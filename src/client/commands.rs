//! Bodies of the interactive commands.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use serde::Serialize;
use zeroize::Zeroizing;

use super::readers::{read_metadata, SecretReader};
use super::transport::{Reply, Request};
use super::KeeperClient;
use super::Command;
use crate::cli::output;
use crate::errors::{KeeperError, Result};
use crate::secret::SecretKind;
use crate::transfer::{self, metadata_json, Envelope, TruncationPolicy};

/// Prompts for login and password are repeated this many times on empty
/// input.
const EMPTY_INPUT_ATTEMPTS: usize = 3;

const REGISTER_PATH: &str = "/api/user/register";
const LOGIN_PATH: &str = "/api/user/login";
const LOGOUT_PATH: &str = "/api/user/logout";

#[derive(Serialize)]
struct Account<'a> {
    login: &'a str,
    password: &'a str,
}

impl<R: BufRead, W: Write> KeeperClient<R, W> {
    // ── Account commands ─────────────────────────────────────────────

    pub(super) fn register(&mut self) -> Result<()> {
        let login = self.authenticate(REGISTER_PATH)?;
        self.console
            .success(&format!("Registered and logged in as '{login}'"))
    }

    pub(super) fn login(&mut self) -> Result<()> {
        let login = self.authenticate(LOGIN_PATH)?;
        self.console.success(&format!("Logged in as '{login}'"))
    }

    pub(super) fn logout(&mut self) -> Result<()> {
        let reply = self.send(&Request::post(LOGOUT_PATH))?;
        self.session
            .absorb(reply.set_cookies.iter().map(String::as_str));
        self.session.clear();
        self.console.success("Logged out")
    }

    /// Send login and password to `path` and keep the returned cookie.
    fn authenticate(&mut self, path: &str) -> Result<String> {
        let login = self.prompt_retrying("Login: ")?;
        let password = Zeroizing::new(self.prompt_retrying("Password: ")?);

        let body = Zeroizing::new(serde_json::to_vec(&Account {
            login: &login,
            password: &password,
        })?);
        let request = Request::post(path).with_body("application/json", body.to_vec());

        let reply = self.send(&request)?;
        self.session
            .absorb(reply.set_cookies.iter().map(String::as_str));
        if !self.session.is_authenticated() {
            self.console
                .warning("The server did not hand out a session cookie")?;
        }
        Ok(login)
    }

    fn prompt_retrying(&mut self, label: &str) -> Result<String> {
        for attempt in 1..=EMPTY_INPUT_ATTEMPTS {
            match self.console.prompt(label) {
                Err(KeeperError::EmptyInput) if attempt < EMPTY_INPUT_ATTEMPTS => {
                    self.console.warning("A value is required, try again")?;
                }
                other => return other,
            }
        }
        Err(KeeperError::EmptyInput)
    }

    // ── Secret commands ──────────────────────────────────────────────

    pub(super) fn create(&mut self) -> Result<()> {
        let (kind, name) = self.read_key()?;
        let envelope = self.read_envelope(kind)?;
        let encoded = transfer::encode(&envelope);

        let request =
            Request::post(data_path(kind, &name)).with_body(encoded.content_type, encoded.body);
        self.send(&request)?;
        self.console.success(&format!("Stored {kind} '{name}'"))
    }

    pub(super) fn update(&mut self) -> Result<()> {
        let (kind, name) = self.read_key()?;
        let envelope = self.read_envelope(kind)?;
        let encoded = transfer::encode(&envelope);

        let request =
            Request::put(data_path(kind, &name)).with_body(encoded.content_type, encoded.body);
        self.send(&request)?;
        self.console.success(&format!("Updated {kind} '{name}'"))
    }

    pub(super) fn get(&mut self) -> Result<()> {
        let (kind, name) = self.read_key()?;
        let reply = self.send(&Request::get(data_path(kind, &name)))?;

        if kind != SecretKind::Binary {
            let text = String::from_utf8_lossy(&reply.body).into_owned();
            return self.console.write_line(&text);
        }

        let content_type = reply.content_type.as_deref().unwrap_or_default();
        let parts = transfer::decode(content_type, &reply.body, TruncationPolicy::Strict)
            .map_err(|_| KeeperError::BadRequest)?;
        let file = parts.file.ok_or(KeeperError::BadRequest)?;

        let target = PathBuf::from(self.console.prompt("Save to path: ")?);
        std::fs::write(&target, &file.bytes)
            .map_err(|_| KeeperError::InvalidFilePath(target.display().to_string()))?;
        self.console.success(&format!(
            "Wrote {} bytes to {}",
            file.bytes.len(),
            target.display()
        ))
    }

    pub(super) fn delete(&mut self) -> Result<()> {
        let (kind, name) = self.read_key()?;
        self.send(&Request::delete(data_path(kind, &name)))?;
        self.console.success(&format!("Deleted {kind} '{name}'"))
    }

    pub(super) fn help(&mut self) -> Result<()> {
        let rows: Vec<(&str, &str)> = Command::ALL
            .iter()
            .map(|c| (c.name(), c.description()))
            .collect();
        let table = output::commands_table(&rows);
        self.console.write_line(&table.to_string())
    }

    // ── Helpers ──────────────────────────────────────────────────────

    fn read_key(&mut self) -> Result<(SecretKind, String)> {
        let kind: SecretKind = self
            .console
            .prompt("Type (credentials, card, text, binary): ")?
            .parse()?;
        let name = self.console.prompt("Name: ")?;
        Ok((kind, name))
    }

    /// Read the typed payload, then the metadata, and package both.
    fn read_envelope(&mut self, kind: SecretKind) -> Result<Envelope> {
        let path = match kind {
            SecretKind::Binary => Some(PathBuf::from(self.console.prompt("File path: ")?)),
            _ => None,
        };

        let payload = SecretReader::for_kind(kind, path.clone())?.read(&mut self.console)?;
        let metadata = metadata_json(&read_metadata(&mut self.console)?)?;

        match path {
            Some(path) => Envelope::with_file(&path, payload, metadata),
            None => Ok(Envelope::new(payload, metadata)),
        }
    }

    fn send(&mut self, request: &Request) -> Result<Reply> {
        self.transport.send(request, &self.session, &self.cancel)
    }
}

/// `/api/user/data/{type}/{name}` with the name percent-encoded.
fn data_path(kind: SecretKind, name: &str) -> String {
    format!("/api/user/data/{kind}/{}", encode_segment(name))
}

fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(char::from(byte))
            }
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_path_encodes_reserved_characters() {
        assert_eq!(
            data_path(SecretKind::Card, "my visa/2"),
            "/api/user/data/card/my%20visa%2F2"
        );
        assert_eq!(
            data_path(SecretKind::Text, "notes-2024_v1.txt"),
            "/api/user/data/text/notes-2024_v1.txt"
        );
    }

    #[test]
    fn non_ascii_names_are_utf8_encoded() {
        assert_eq!(encode_segment("é"), "%C3%A9");
    }
}
