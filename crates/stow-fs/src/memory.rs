//! In-memory metadata store for testing
//!
//! Honors the same uniqueness and version-CAS semantics as the
//! PostgreSQL implementation, behind one mutex so concurrent writers
//! serialize the way conflicting statements would.

use crate::{Etag, FileInfo, FsError, MetadataOps, Name, Result, Stat};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct EntryRow {
    name: Name,
    parent: Option<Uuid>,
    version: i64,
    modified_at: DateTime<Utc>,
    blob: Option<BlobRow>,
}

#[derive(Debug, Clone)]
struct BlobRow {
    blob: Uuid,
    size: i64,
    sha: Vec<u8>,
}

/// Mutex-protected map implementing [`MetadataOps`].
#[derive(Clone, Default)]
pub struct MemoryMetadata {
    entries: Arc<Mutex<HashMap<Uuid, EntryRow>>>,
}

impl MemoryMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn insert_entry(&self, name: &Name, parent: Option<Uuid>) -> Result<Uuid> {
        let mut entries = self.entries.lock();
        let taken = entries
            .values()
            .any(|row| row.parent == parent && row.name == *name);
        if taken {
            return Err(FsError::AlreadyExists);
        }
        let file = Uuid::now_v7();
        entries.insert(
            file,
            EntryRow {
                name: name.clone(),
                parent,
                version: 0,
                modified_at: Utc::now(),
                blob: None,
            },
        );
        Ok(file)
    }
}

#[async_trait]
impl MetadataOps for MemoryMetadata {
    async fn touch(&self, name: &Name, parent: Option<Uuid>) -> Result<Uuid> {
        self.insert_entry(name, parent)
    }

    async fn link_blob(
        &self,
        blob: Uuid,
        size: i64,
        sha: &[u8],
        file: Uuid,
        expected_v: i64,
    ) -> Result<()> {
        let mut entries = self.entries.lock();
        let row = entries.get_mut(&file).ok_or(FsError::Conflict)?;
        if row.version != expected_v {
            return Err(FsError::Conflict);
        }
        row.version += 1;
        row.modified_at = Utc::now();
        row.blob = Some(BlobRow {
            blob,
            size,
            sha: sha.to_vec(),
        });
        Ok(())
    }

    async fn stat(&self, file: Uuid) -> Result<Stat> {
        let entries = self.entries.lock();
        let row = entries.get(&file).ok_or(FsError::NotExist)?;
        Ok(Stat {
            info: FileInfo {
                id: file,
                blob_ref: row.blob.as_ref().map(|b| b.blob),
                name: row.name.clone(),
                size: row.blob.as_ref().map(|b| b.size).unwrap_or_default(),
                modified_at: row.modified_at,
                is_dir: row.blob.is_none(),
            },
            version: row.version,
            etag: row.blob.as_ref().map(|b| Etag::new(b.sha.clone())),
        })
    }

    async fn mkdir(&self, name: &Name, parent: Option<Uuid>) -> Result<Uuid> {
        self.insert_entry(name, parent)
    }

    async fn rename(&self, file: Uuid, name: &Name, expected_v: i64) -> Result<()> {
        let mut entries = self.entries.lock();
        let (parent, version) = {
            let row = entries.get(&file).ok_or(FsError::NotExist)?;
            (row.parent, row.version)
        };
        if version != expected_v {
            return Err(FsError::Conflict);
        }
        let taken = entries
            .iter()
            .any(|(id, row)| *id != file && row.parent == parent && row.name == *name);
        if taken {
            return Err(FsError::AlreadyExists);
        }
        let row = entries.get_mut(&file).ok_or(FsError::NotExist)?;
        row.name = name.clone();
        row.version += 1;
        row.modified_at = Utc::now();
        Ok(())
    }
}
