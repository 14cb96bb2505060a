//! Client-side encoding of a secret into a multipart body.

use std::path::Path;

use rand::distr::Alphanumeric;
use rand::Rng;

use super::{FilePart, DATA_PART, FILE_PART, METADATA_PART};
use crate::errors::{KeeperError, Result};
use crate::secret::Metadata;

const BOUNDARY_LEN: usize = 32;

/// Pretty-printed JSON form of a metadata map, as carried in the
/// `metadata` part.
pub fn metadata_json(metadata: &Metadata) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(metadata)?)
}

/// Everything a create or update request sends.
///
/// `metadata` holds the JSON produced by [`metadata_json`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    pub data: Vec<u8>,
    pub metadata: Vec<u8>,
    pub file: Option<FilePart>,
}

impl Envelope {
    pub fn new(data: Vec<u8>, metadata: Vec<u8>) -> Self {
        Self {
            data,
            metadata,
            file: None,
        }
    }

    /// Envelope for a binary secret read from `path`.
    ///
    /// The bytes travel in the `file` part under the path's base name and
    /// the `data` part is left empty.
    pub fn with_file(path: &Path, bytes: Vec<u8>, metadata: Vec<u8>) -> Result<Self> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| KeeperError::InvalidFilePath(path.display().to_string()))?
            .to_string();

        Ok(Self {
            data: Vec::new(),
            metadata,
            file: Some(FilePart { file_name, bytes }),
        })
    }
}

/// An encoded body and the `Content-Type` header that goes with it.
#[derive(Debug, Clone)]
pub struct Encoded {
    pub content_type: String,
    pub body: Vec<u8>,
}

/// Encode an envelope with a fresh random boundary.
pub fn encode(envelope: &Envelope) -> Encoded {
    let boundary = pick_boundary(&[
        envelope.data.as_slice(),
        envelope.metadata.as_slice(),
        envelope.file.as_ref().map_or(&[][..], |f| f.bytes.as_slice()),
    ]);
    encode_with_boundary(envelope, &boundary)
}

/// Encode with a caller-chosen boundary. The output is fully determined by
/// the inputs.
pub fn encode_with_boundary(envelope: &Envelope, boundary: &str) -> Encoded {
    write_parts(
        boundary,
        &envelope.data,
        &envelope.metadata,
        envelope.file.as_ref(),
    )
}

/// Encode a body holding only a `file` part. Used for binary read
/// responses.
pub fn encode_file(file: &FilePart) -> Encoded {
    let boundary = pick_boundary(&[file.bytes.as_slice()]);
    let mut body = Vec::with_capacity(file.bytes.len() + 256);
    write_file_part(&mut body, &boundary, file);
    close(&mut body, &boundary);
    Encoded {
        content_type: content_type(&boundary),
        body,
    }
}

fn write_parts(boundary: &str, data: &[u8], metadata: &[u8], file: Option<&FilePart>) -> Encoded {
    let mut body = Vec::with_capacity(
        data.len() + metadata.len() + file.map_or(0, |f| f.bytes.len()) + 512,
    );

    open_part(&mut body, boundary);
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{DATA_PART}\"\r\n\r\n").as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(b"\r\n");

    open_part(&mut body, boundary);
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{METADATA_PART}\"\r\n\
             Content-Type: application/json\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(metadata);
    body.extend_from_slice(b"\r\n");

    if let Some(file) = file {
        write_file_part(&mut body, boundary, file);
    }

    close(&mut body, boundary);

    Encoded {
        content_type: content_type(boundary),
        body,
    }
}

fn write_file_part(body: &mut Vec<u8>, boundary: &str, file: &FilePart) {
    open_part(body, boundary);
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{FILE_PART}\"; filename=\"{}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n",
            escape_quoted(&file.file_name)
        )
        .as_bytes(),
    );
    body.extend_from_slice(&file.bytes);
    body.extend_from_slice(b"\r\n");
}

fn open_part(body: &mut Vec<u8>, boundary: &str) {
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
}

fn close(body: &mut Vec<u8>, boundary: &str) {
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
}

fn content_type(boundary: &str) -> String {
    format!("multipart/form-data; boundary={boundary}")
}

fn escape_quoted(value: &str) -> String {
    value
        .chars()
        .filter(|c| *c != '\r' && *c != '\n')
        .flat_map(|c| match c {
            '"' | '\\' => vec!['\\', c],
            other => vec![other],
        })
        .collect()
}

/// Draw random boundaries until one does not occur in any part content.
fn pick_boundary(contents: &[&[u8]]) -> String {
    loop {
        let candidate: String = rand::rng()
            .sample_iter(Alphanumeric)
            .take(BOUNDARY_LEN)
            .map(char::from)
            .collect();
        let marker = format!("--{candidate}");
        if !contents
            .iter()
            .any(|c| super::decode::find(c, marker.as_bytes()).is_some())
        {
            return candidate;
        }
    }
}
