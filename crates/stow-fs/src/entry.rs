//! Directory-entry views: file info, content etags, pagination cursors

use crate::{FsError, Name, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Derived view of one file or folder, joining the directory entry with
/// its blob link (absent for folders).
#[derive(Debug, Clone, Serialize)]
pub struct FileInfo {
    #[serde(rename = "fileId")]
    pub id: Uuid,
    /// Reference into the object-storage backend; never serialized.
    #[serde(skip)]
    pub blob_ref: Option<Uuid>,
    #[serde(rename = "filename")]
    pub name: Name,
    pub size: i64,
    #[serde(rename = "modifiedAt")]
    pub modified_at: DateTime<Utc>,
    #[serde(rename = "isDir")]
    pub is_dir: bool,
}

/// Cryptographic hash of a file's content, doubling as its strong
/// validator (ETag).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Etag(Vec<u8>);

impl Etag {
    pub fn new(sha: Vec<u8>) -> Self {
        Self(sha)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Etag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

/// Opaque pagination token wrapping the next entry id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub next: Uuid,
}

impl Cursor {
    /// Encode as an opaque base64 token.
    pub fn encode(&self) -> String {
        STANDARD.encode(self.next.to_string())
    }

    /// Decode a token produced by [`Cursor::encode`].
    pub fn parse(s: &str) -> Result<Self> {
        let raw = STANDARD
            .decode(s)
            .map_err(|err| FsError::InvalidArgument(format!("invalid cursor: {err}")))?;
        let text = std::str::from_utf8(&raw)
            .map_err(|err| FsError::InvalidArgument(format!("invalid cursor: {err}")))?;
        let next = Uuid::parse_str(text)
            .map_err(|err| FsError::InvalidArgument(format!("invalid cursor: {err}")))?;
        Ok(Self { next })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_roundtrip() {
        let cursor = Cursor { next: Uuid::now_v7() };
        let token = cursor.encode();
        assert_eq!(Cursor::parse(&token).unwrap(), cursor);
    }

    #[test]
    fn cursor_rejects_garbage() {
        assert!(Cursor::parse("not base64 !!").is_err());
        assert!(Cursor::parse(&STANDARD.encode("not a uuid")).is_err());
    }

    #[test]
    fn etag_displays_as_hex() {
        let etag = Etag::new(vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(etag.to_string(), "deadbeef");
    }

    #[test]
    fn file_info_serializes_wire_names() {
        let info = FileInfo {
            id: Uuid::nil(),
            blob_ref: Some(Uuid::nil()),
            name: Name::parse("hello.txt").unwrap(),
            size: 6,
            modified_at: DateTime::<Utc>::UNIX_EPOCH,
            is_dir: false,
        };
        let v = serde_json::to_value(&info).unwrap();
        assert_eq!(v["filename"], "hello.txt");
        assert_eq!(v["isDir"], false);
        assert!(v.get("blob_ref").is_none() && v.get("blobRef").is_none());
    }
}
