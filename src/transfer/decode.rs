//! Decoding of multipart bodies back into parts.
//!
//! Used by the server on create/update and by the client on binary reads.
//! Parts are visited in arrival order and assigned by name; unknown names
//! are skipped.

use super::{FilePart, TruncationPolicy, DATA_PART, FILE_PART, METADATA_PART};
use crate::errors::{KeeperError, Result};

/// The parts recovered from a multipart body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedParts {
    pub data: Vec<u8>,
    pub metadata: Vec<u8>,
    pub file: Option<FilePart>,

    /// Set when a part body ended early and the lenient policy kept it.
    pub truncated: bool,
}

impl DecodedParts {
    /// The secret payload: the file bytes when a file part arrived,
    /// otherwise the data part.
    pub fn payload(&self) -> &[u8] {
        match &self.file {
            Some(file) => &file.bytes,
            None => &self.data,
        }
    }

    pub fn into_payload(self) -> (Vec<u8>, Vec<u8>) {
        match self.file {
            Some(file) => (file.bytes, self.metadata),
            None => (self.data, self.metadata),
        }
    }
}

/// Decode `body` according to the boundary declared in `content_type`.
pub fn decode(content_type: &str, body: &[u8], policy: TruncationPolicy) -> Result<DecodedParts> {
    let boundary = boundary_from_content_type(content_type)?;
    let delimiter = format!("--{boundary}");
    let delimiter = delimiter.as_bytes();

    let mut parts = DecodedParts::default();

    let Some(start) = find(body, delimiter) else {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(parts);
        }
        return Err(malformed("no opening boundary"));
    };
    let mut rest = &body[start + delimiter.len()..];

    loop {
        // Closing delimiter, or the stream ended cleanly right after a
        // delimiter line.
        if rest.starts_with(b"--") || rest.iter().all(u8::is_ascii_whitespace) {
            return Ok(parts);
        }

        rest = skip_line_break(rest)?;

        let (headers, after_headers) = split_headers(rest)?;
        let disposition = parse_disposition(headers)?;

        let mut closing = Vec::with_capacity(delimiter.len() + 2);
        closing.extend_from_slice(b"\r\n");
        closing.extend_from_slice(delimiter);

        let (content, next, complete) = match find(after_headers, &closing) {
            Some(end) => (
                &after_headers[..end],
                &after_headers[end + closing.len()..],
                true,
            ),
            None => match policy {
                TruncationPolicy::Strict => return Err(malformed("part body truncated")),
                TruncationPolicy::Lenient => (after_headers, &[][..], false),
            },
        };

        match disposition.name.as_str() {
            DATA_PART => parts.data = content.to_vec(),
            METADATA_PART => parts.metadata = content.to_vec(),
            FILE_PART => {
                parts.file = Some(FilePart {
                    file_name: disposition.file_name.unwrap_or_default(),
                    bytes: content.to_vec(),
                })
            }
            _ => {}
        }

        if !complete {
            parts.truncated = true;
            return Ok(parts);
        }
        rest = next;
    }
}

/// Extract the boundary parameter from a `multipart/*` content type.
pub fn boundary_from_content_type(content_type: &str) -> Result<String> {
    let mut pieces = content_type.split(';');
    let media_type = pieces.next().unwrap_or_default().trim().to_ascii_lowercase();
    if !media_type.starts_with("multipart/") {
        return Err(malformed("expected a multipart/* content type"));
    }

    pieces
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("boundary"))
        .map(|(_, value)| unquote(value.trim()))
        .filter(|b| !b.is_empty())
        .ok_or_else(|| malformed("missing boundary parameter"))
}

struct Disposition {
    name: String,
    file_name: Option<String>,
}

fn parse_disposition(headers: &[u8]) -> Result<Disposition> {
    let headers = std::str::from_utf8(headers).map_err(|_| malformed("non-UTF-8 part headers"))?;

    for line in headers.split("\r\n") {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        if !key.trim().eq_ignore_ascii_case("content-disposition") {
            continue;
        }

        let mut name = None;
        let mut file_name = None;
        for param in split_params(value).into_iter().skip(1) {
            if let Some((k, v)) = param.split_once('=') {
                match k.trim().to_ascii_lowercase().as_str() {
                    "name" => name = Some(unquote(v.trim())),
                    "filename" => file_name = Some(unquote(v.trim())),
                    _ => {}
                }
            }
        }
        return Ok(Disposition {
            name: name.unwrap_or_default(),
            file_name,
        });
    }

    // A part without a disposition has no name and is skipped.
    Ok(Disposition {
        name: String::new(),
        file_name: None,
    })
}

/// Split a header value on `;` outside quoted strings.
fn split_params(value: &str) -> Vec<&str> {
    let mut params = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in value.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                params.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    params.push(&value[start..]);
    params
}

fn unquote(value: &str) -> String {
    let Some(inner) = value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) else {
        return value.to_string();
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn skip_line_break(rest: &[u8]) -> Result<&[u8]> {
    // Transport padding after the delimiter is allowed.
    let trimmed = {
        let pad = rest.iter().take_while(|b| **b == b' ' || **b == b'\t').count();
        &rest[pad..]
    };
    trimmed
        .strip_prefix(b"\r\n")
        .ok_or_else(|| malformed("expected line break after boundary"))
}

fn split_headers(rest: &[u8]) -> Result<(&[u8], &[u8])> {
    if let Some(after) = rest.strip_prefix(b"\r\n") {
        return Ok((&[][..], after));
    }
    let end = find(rest, b"\r\n\r\n").ok_or_else(|| malformed("part headers truncated"))?;
    Ok((&rest[..end], &rest[end + 4..]))
}

fn malformed(reason: &str) -> KeeperError {
    KeeperError::Multipart(reason.to_string())
}

/// Position of the first occurrence of `needle` in `haystack`.
pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
