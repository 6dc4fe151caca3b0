//! Producer/consumer byte pipe with peek-before-serve semantics
//!
//! A download spawns one background task that pulls from the backend
//! and pushes into a bounded channel; the channel depth is what bounds
//! memory use, a slow consumer blocks the producer. The consumer side
//! peeks a fixed prefix for MIME sniffing, then replays it ahead of the
//! rest of the stream as if no peek occurred.

use crate::{sniff, BlobError, Result};
use bytes::{Bytes, BytesMut};
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Number of in-flight chunks the pipe will hold.
pub(crate) const PIPE_DEPTH: usize = 8;

/// Number of bytes peeked for content-type sniffing.
pub const SNIFF_LEN: usize = 512;

/// Consumer end of a download pipe.
///
/// Dropping the reader aborts the producer task, so cancellation closes
/// both ends and never leaks a background task.
pub struct BlobReader {
    prefix: Bytes,
    rx: mpsc::Receiver<Result<Bytes>>,
    task: JoinHandle<()>,
}

impl BlobReader {
    /// Buffer up to [`SNIFF_LEN`] bytes from the pipe, classify them,
    /// and return the reader with the peeked bytes still in front.
    ///
    /// A short stream is fine; only an error before the peek completes
    /// tears the pipe down. Errors arriving after the prefix surface
    /// later, while streaming.
    pub(crate) async fn peek(
        mut rx: mpsc::Receiver<Result<Bytes>>,
        task: JoinHandle<()>,
    ) -> Result<(Self, String)> {
        let mut prefix = BytesMut::with_capacity(SNIFF_LEN);
        while prefix.len() < SNIFF_LEN {
            match rx.recv().await {
                Some(Ok(chunk)) => prefix.extend_from_slice(&chunk),
                Some(Err(err)) => {
                    rx.close();
                    task.abort();
                    return Err(err);
                }
                // clean end of stream, smaller than the sniff window
                None => break,
            }
        }
        let mime = sniff::detect(&prefix).to_owned();
        let prefix = prefix.freeze();
        Ok((Self { prefix, rx, task }, mime))
    }

    /// Open a pipe of the default depth for a producer to feed.
    pub(crate) fn pipe() -> (mpsc::Sender<Result<Bytes>>, mpsc::Receiver<Result<Bytes>>) {
        mpsc::channel(PIPE_DEPTH)
    }
}

impl Stream for BlobReader {
    type Item = Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if !self.prefix.is_empty() {
            let replay = std::mem::take(&mut self.prefix);
            return Poll::Ready(Some(Ok(replay)));
        }
        self.rx.poll_recv(cx)
    }
}

impl Drop for BlobReader {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl std::fmt::Debug for BlobReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobReader")
            .field("peeked", &self.prefix.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn spawn_chunks(chunks: Vec<Result<Bytes>>) -> (mpsc::Receiver<Result<Bytes>>, JoinHandle<()>) {
        let (tx, rx) = BlobReader::pipe();
        let task = tokio::spawn(async move {
            for chunk in chunks {
                if tx.send(chunk).await.is_err() {
                    return;
                }
            }
        });
        (rx, task)
    }

    async fn collect(mut reader: BlobReader) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(chunk) = reader.next().await {
            out.extend_from_slice(&chunk.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn short_stream_replays_exactly() {
        let (rx, task) = spawn_chunks(vec![Ok(Bytes::from_static(b"hello\n"))]);
        let (reader, mime) = BlobReader::peek(rx, task).await.unwrap();
        assert_eq!(mime, "text/plain; charset=utf-8");
        assert_eq!(collect(reader).await, b"hello\n");
    }

    #[tokio::test]
    async fn long_stream_keeps_bytes_past_the_peek() {
        let body = vec![b'x'; 4 * SNIFF_LEN];
        let chunks = body
            .chunks(100)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        let (rx, task) = spawn_chunks(chunks);
        let (reader, mime) = BlobReader::peek(rx, task).await.unwrap();
        assert_eq!(mime, "text/plain; charset=utf-8");
        assert_eq!(collect(reader).await, body);
    }

    #[tokio::test]
    async fn error_during_peek_closes_the_pipe() {
        let (rx, task) = spawn_chunks(vec![Err(BlobError::NotExist)]);
        let err = BlobReader::peek(rx, task).await.unwrap_err();
        assert!(matches!(err, BlobError::NotExist));
    }

    #[tokio::test]
    async fn empty_stream_is_plain_text() {
        let (rx, task) = spawn_chunks(vec![]);
        let (reader, mime) = BlobReader::peek(rx, task).await.unwrap();
        assert_eq!(mime, "text/plain; charset=utf-8");
        assert!(collect(reader).await.is_empty());
    }
}
