//! # Stow Blob
//!
//! Object-storage adapter for the stow file gateway.
//!
//! This crate provides:
//! - **Streamed uploads**: fixed-size multipart writes with a byte count
//!   taken from the bytes actually observed
//! - **Piped downloads**: a background producer feeding a bounded byte
//!   pipe, with a 512-byte peek for MIME sniffing before the caller
//!   sees the stream
//! - **Error translation**: backend "no such key" normalized to
//!   [`BlobError::NotExist`] at this boundary

pub mod error;
pub mod memory;
pub mod pipe;
pub mod sniff;
pub mod store;

pub use error::{BlobError, Result};
pub use memory::MemoryBlobStore;
pub use pipe::{BlobReader, SNIFF_LEN};
pub use store::{blob_key, S3BlobStore, S3Config};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use uuid::Uuid;

/// Default part size for multipart uploads (16 MiB).
pub const DEFAULT_PART_SIZE: usize = 1 << 24;

/// A fallible stream of body chunks flowing into or out of the adapter.
/// Carries a lifetime so callers can hand over streams borrowing from a
/// request body without collecting them first.
pub type ByteSource<'a> = BoxStream<'a, Result<Bytes>>;

/// Capability to write a byte stream to the backend.
#[async_trait]
pub trait BlobUpload: Send + Sync {
    /// Store the stream under a freshly allocated, time-ordered blob
    /// reference. Returns the reference and the number of bytes that
    /// flowed through the adapter.
    async fn upload(&self, body: ByteSource<'_>) -> Result<(Uuid, i64)>;
}

/// Capability to read stored bytes back out of the backend.
#[async_trait]
pub trait BlobDownload: Send + Sync {
    /// Open a sequential read of the blob. Returns the readable stream
    /// and the MIME type sniffed from its first bytes.
    async fn download(&self, id: Uuid) -> Result<(BlobReader, String)>;
}
