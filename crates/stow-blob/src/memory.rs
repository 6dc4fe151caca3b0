//! In-memory blob store for testing

use crate::pipe::BlobReader;
use crate::{BlobDownload, BlobError, BlobUpload, ByteSource, Result};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use dashmap::DashMap;
use futures::StreamExt;
use std::sync::Arc;
use uuid::Uuid;

/// Chunk size used when replaying a stored blob through the pipe, kept
/// small so tests exercise the peek/replay path over several chunks.
const REPLAY_CHUNK: usize = 128;

/// An in-memory blob store. Downloads go through the same pipe and
/// sniffing path as the S3 adapter.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<DashMap<Uuid, Bytes>>,
}

impl MemoryBlobStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blobs held
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl BlobUpload for MemoryBlobStore {
    async fn upload(&self, mut body: ByteSource<'_>) -> Result<(Uuid, i64)> {
        let id = Uuid::now_v7();
        let mut buf = BytesMut::new();
        while let Some(chunk) = body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        let size = buf.len() as i64;
        self.blobs.insert(id, buf.freeze());
        Ok((id, size))
    }
}

#[async_trait]
impl BlobDownload for MemoryBlobStore {
    async fn download(&self, id: Uuid) -> Result<(BlobReader, String)> {
        let stored = self.blobs.get(&id).map(|entry| entry.value().clone());
        let (tx, rx) = BlobReader::pipe();
        let task = tokio::spawn(async move {
            let data = match stored {
                Some(data) => data,
                None => {
                    let _ = tx.send(Err(BlobError::NotExist)).await;
                    return;
                }
            };
            let mut rest = data;
            while !rest.is_empty() {
                let chunk = rest.split_to(rest.len().min(REPLAY_CHUNK));
                if tx.send(Ok(chunk)).await.is_err() {
                    return;
                }
            }
        });
        BlobReader::peek(rx, task).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn source(data: &'static [u8]) -> ByteSource<'static> {
        stream::iter(vec![Ok(Bytes::from_static(data))]).boxed()
    }

    #[tokio::test]
    async fn upload_counts_observed_bytes() {
        let store = MemoryBlobStore::new();
        let (id, size) = store.upload(source(b"hello\n")).await.unwrap();
        assert_eq!(size, 6);
        assert!(store.blobs.contains_key(&id));
    }

    #[test_log::test(tokio::test)]
    async fn roundtrip_sniffs_plain_text() {
        let store = MemoryBlobStore::new();
        let (id, _) = store.upload(source(b"hello\n")).await.unwrap();

        let (mut reader, mime) = store.download(id).await.unwrap();
        assert_eq!(mime, "text/plain; charset=utf-8");

        let mut out = Vec::new();
        while let Some(chunk) = reader.next().await {
            out.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(out, b"hello\n");
    }

    #[tokio::test]
    async fn download_missing_is_not_exist() {
        let store = MemoryBlobStore::new();
        let err = store.download(Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, BlobError::NotExist));
    }

    #[tokio::test]
    async fn roundtrip_preserves_binary_payloads() {
        let store = MemoryBlobStore::new();
        let body: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
        let leaked: &'static [u8] = body.clone().leak();
        let (id, size) = store.upload(source(leaked)).await.unwrap();
        assert_eq!(size, 4096);

        let (mut reader, mime) = store.download(id).await.unwrap();
        assert_eq!(mime, "application/octet-stream");
        let mut out = Vec::new();
        while let Some(chunk) = reader.next().await {
            out.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(out, body);
    }
}
