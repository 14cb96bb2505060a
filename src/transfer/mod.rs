//! Transfer codec: moves a secret's payload and metadata over HTTP as a
//! `multipart/form-data` body.
//!
//! Every message carries exactly one `data` part and one `metadata` part
//! (pretty-printed JSON). Binary secrets add a `file` part holding the raw
//! bytes, with the source file's base name as its declared filename.

pub mod decode;
pub mod encode;

use serde::{Deserialize, Serialize};

pub use decode::{decode, DecodedParts};
pub use encode::{encode, encode_file, encode_with_boundary, metadata_json, Encoded, Envelope};

/// Part carrying the payload of non-binary secrets.
pub const DATA_PART: &str = "data";

/// Part carrying the JSON-encoded metadata map.
pub const METADATA_PART: &str = "metadata";

/// Part carrying the raw bytes of a binary secret.
pub const FILE_PART: &str = "file";

/// A file attached to a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// What the server does when a part body ends before its closing
/// boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TruncationPolicy {
    /// Reject the whole message.
    #[default]
    Strict,
    /// Keep whatever bytes arrived and stop reading.
    Lenient,
}
