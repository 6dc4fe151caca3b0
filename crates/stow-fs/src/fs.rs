//! FS coordinator: the facade composing metadata and blob storage

use crate::{Etag, FileInfo, FsError, MetadataOps, Name, Result, Stat};
use futures::StreamExt;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use stow_blob::{BlobDownload, BlobReader, BlobUpload, ByteSource};
use uuid::Uuid;

/// MIME marker attached to an opened directory, which carries no bytes.
pub const DIRECTORY_MIME: &str = "inode/directory";

/// The file system facade. Holds its three collaborators behind small
/// capability interfaces; orchestration only, no storage of its own.
#[derive(Clone)]
pub struct Fs {
    db: Arc<dyn MetadataOps>,
    uploader: Arc<dyn BlobUpload>,
    downloader: Arc<dyn BlobDownload>,
}

/// Result of [`Fs::open`]. Directories carry no reader and no etag.
#[derive(Debug)]
pub struct OpenFile {
    pub reader: Option<BlobReader>,
    pub info: FileInfo,
    pub etag: Option<Etag>,
    pub mime: String,
}

impl Fs {
    pub fn new(
        db: Arc<dyn MetadataOps>,
        uploader: Arc<dyn BlobUpload>,
        downloader: Arc<dyn BlobDownload>,
    ) -> Self {
        Self {
            db,
            uploader,
            downloader,
        }
    }

    /// Create a file: register the entry, stream the body into the blob
    /// store while hashing the same bytes, then link blob to entry at
    /// the version the entry was created with.
    ///
    /// If the upload fails the entry stays behind unlinked, and if the
    /// link fails the blob stays behind unreferenced. Neither window is
    /// reconciled here; the caller sees the first error.
    pub async fn create(
        &self,
        name: &Name,
        parent: Option<Uuid>,
        body: ByteSource<'_>,
    ) -> Result<Uuid> {
        let file = self.db.touch(name, parent).await?;

        let hasher = Arc::new(Mutex::new(Sha256::new()));
        let tee = {
            let hasher = Arc::clone(&hasher);
            body.map(move |chunk| {
                if let Ok(bytes) = &chunk {
                    hasher.lock().update(bytes);
                }
                chunk
            })
            .boxed()
        };
        let (blob, size) = self.uploader.upload(tee).await?;
        let sha = hasher.lock().finalize_reset().to_vec();

        self.db.link_blob(blob, size, &sha, file, 0).await?;
        tracing::debug!(file = %file, blob = %blob, size, "created file");
        Ok(file)
    }

    /// Open a file for reading. A directory target yields no stream and
    /// no content hash, only the marker MIME type; the caller decides
    /// what to do with it.
    pub async fn open(&self, file: Uuid) -> Result<OpenFile> {
        let Stat { info, etag, .. } = self.db.stat(file).await?;
        if info.is_dir {
            return Ok(OpenFile {
                reader: None,
                info,
                etag: None,
                mime: DIRECTORY_MIME.to_owned(),
            });
        }
        // a linked blob is what made this a file in the first place
        let blob = info.blob_ref.ok_or(FsError::NotExist)?;
        let (reader, mime) = self.downloader.download(blob).await?;
        Ok(OpenFile {
            reader: Some(reader),
            info,
            etag,
            mime,
        })
    }

    /// Create a folder: an entry with no blob link.
    pub async fn mkdir(&self, name: &Name, parent: Option<Uuid>) -> Result<Uuid> {
        self.db.mkdir(name, parent).await
    }

    /// Read-only fetch of an entry's view, version, and content hash.
    pub async fn stat(&self, file: Uuid) -> Result<Stat> {
        self.db.stat(file).await
    }

    /// Conditionally rename an entry. The caller retries with a fresh
    /// version on conflict; nothing is retried here.
    pub async fn rename(&self, file: Uuid, name: &Name, expected_v: i64) -> Result<()> {
        self.db.rename(file, name, expected_v).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryMetadata;
    use bytes::Bytes;
    use futures::stream;
    use stow_blob::MemoryBlobStore;

    fn fixture() -> Fs {
        let db = Arc::new(MemoryMetadata::new());
        let blobs = Arc::new(MemoryBlobStore::new());
        Fs::new(db, blobs.clone(), blobs)
    }

    fn name(s: &str) -> Name {
        Name::parse(s).unwrap()
    }

    fn body(data: &'static [u8]) -> ByteSource<'static> {
        stream::iter(vec![Ok(Bytes::from_static(data))]).boxed()
    }

    #[tokio::test]
    async fn create_then_stat_agrees_on_size_and_hash() {
        let fs = fixture();
        let file = fs.create(&name("hello.txt"), None, body(b"hello\n")).await.unwrap();

        let stat = fs.stat(file).await.unwrap();
        assert_eq!(stat.info.size, 6);
        assert!(!stat.info.is_dir);
        assert_eq!(stat.version, 1);

        let expected = Sha256::digest(b"hello\n").to_vec();
        assert_eq!(stat.etag.unwrap().as_bytes(), expected.as_slice());
    }

    #[test_log::test(tokio::test)]
    async fn open_roundtrips_content_and_mime() {
        let fs = fixture();
        let file = fs.create(&name("hello.txt"), None, body(b"hello\n")).await.unwrap();

        let mut opened = fs.open(file).await.unwrap();
        assert_eq!(opened.mime, "text/plain; charset=utf-8");
        assert!(opened.etag.is_some());

        let mut out = Vec::new();
        let reader = opened.reader.as_mut().unwrap();
        while let Some(chunk) = reader.next().await {
            out.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(out, b"hello\n");
    }

    #[tokio::test]
    async fn open_directory_has_no_body_and_no_etag() {
        let fs = fixture();
        let dir = fs.mkdir(&name("src"), None).await.unwrap();

        let opened = fs.open(dir).await.unwrap();
        assert!(opened.info.is_dir);
        assert!(opened.reader.is_none());
        assert!(opened.etag.is_none());
        assert_eq!(opened.mime, DIRECTORY_MIME);
    }

    #[tokio::test]
    async fn concurrent_create_same_name_yields_one_winner() {
        let fs = fixture();
        let name_a = name("same.txt");
        let name_b = name("same.txt");
        let (a, b) = tokio::join!(
            fs.create(&name_a, None, body(b"one")),
            fs.create(&name_b, None, body(b"two")),
        );
        let wins = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1);
        let conflict = [a, b]
            .into_iter()
            .filter(|r| matches!(r, Err(FsError::AlreadyExists)))
            .count();
        assert_eq!(conflict, 1);
    }

    #[tokio::test]
    async fn stale_rename_leaves_version_untouched() {
        let fs = fixture();
        let file = fs.create(&name("a.txt"), None, body(b"x")).await.unwrap();
        assert_eq!(fs.stat(file).await.unwrap().version, 1);

        let err = fs.rename(file, &name("b.txt"), 0).await.unwrap_err();
        assert!(matches!(err, FsError::Conflict));

        let stat = fs.stat(file).await.unwrap();
        assert_eq!(stat.version, 1);
        assert_eq!(stat.info.name.as_str(), "a.txt");
    }

    #[tokio::test]
    async fn open_unknown_is_not_exist() {
        let fs = fixture();
        let err = fs.open(Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, FsError::NotExist));
    }
}
