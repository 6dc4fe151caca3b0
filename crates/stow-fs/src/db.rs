//! Relational metadata store over PostgreSQL
//!
//! Concurrency correctness is delegated to the database: every mutation
//! that must not race is a single version-conditioned statement, and a
//! zero affected-row count is the conflict signal. No application-level
//! locking.

use crate::{Etag, FileInfo, FsError, Name, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Result of a metadata read: the derived view plus the version token
/// and, for files, the content hash.
#[derive(Debug, Clone)]
pub struct Stat {
    pub info: FileInfo,
    pub version: i64,
    pub etag: Option<Etag>,
}

/// CRUD over directory-entry and blob-link records.
#[async_trait]
pub trait MetadataOps: Send + Sync {
    /// Register a new entry for a file. `parent` of `None` means root.
    async fn touch(&self, name: &Name, parent: Option<Uuid>) -> Result<Uuid>;

    /// Atomically link a stored blob to an entry, conditioned on the
    /// entry still being at `expected_v`.
    async fn link_blob(
        &self,
        blob: Uuid,
        size: i64,
        sha: &[u8],
        file: Uuid,
        expected_v: i64,
    ) -> Result<()>;

    /// Read-only fetch of one entry.
    async fn stat(&self, file: Uuid) -> Result<Stat>;

    /// Register a new entry for a folder.
    async fn mkdir(&self, name: &Name, parent: Option<Uuid>) -> Result<Uuid>;

    /// Conditionally rename an entry, bumping its version.
    async fn rename(&self, file: Uuid, name: &Name, expected_v: i64) -> Result<()>;
}

/// PostgreSQL-backed implementation of [`MetadataOps`].
///
/// Expects the schema in `schema.sql` (the `fs.dir_entry` and
/// `fs.blob_link` tables) to be applied; schema management itself is
/// out of scope here.
#[derive(Clone)]
pub struct PgMetadata {
    pool: PgPool,
}

impl PgMetadata {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_entry(&self, name: &Name, parent: Option<Uuid>) -> Result<Uuid> {
        let file = Uuid::now_v7();
        sqlx::query("insert into fs.dir_entry (id, name, root) values ($1, $2, $3)")
            .bind(file)
            .bind(name.as_str())
            .bind(parent)
            .execute(&self.pool)
            .await?;
        Ok(file)
    }
}

#[async_trait]
impl MetadataOps for PgMetadata {
    async fn touch(&self, name: &Name, parent: Option<Uuid>) -> Result<Uuid> {
        self.insert_entry(name, parent).await
    }

    async fn link_blob(
        &self,
        blob: Uuid,
        size: i64,
        sha: &[u8],
        file: Uuid,
        expected_v: i64,
    ) -> Result<()> {
        // bump the entry version and insert the link in one statement
        const QUERY: &str = "
with entry as (
    update fs.dir_entry
    set v = v + 1, mod_at = now()
    where id = $1 and v = $2
    returning id, mod_at, v
)
insert into fs.blob_link (id, dir_entry, sz, sha, mod_at, v)
select $3, id, $4, $5, mod_at, v from entry
";
        let done = sqlx::query(QUERY)
            .bind(file)
            .bind(expected_v)
            .bind(blob)
            .bind(size)
            .bind(sha)
            .execute(&self.pool)
            .await?;
        if done.rows_affected() == 0 {
            return Err(FsError::Conflict);
        }
        Ok(())
    }

    async fn stat(&self, file: Uuid) -> Result<Stat> {
        const QUERY: &str = "
select f.name, f.mod_at, f.v, b.id, b.sz, b.sha
from fs.dir_entry f
left join fs.blob_link b on f.id = b.dir_entry
where f.id = $1
limit 1
";
        type Row = (
            String,
            DateTime<Utc>,
            i64,
            Option<Uuid>,
            Option<i64>,
            Option<Vec<u8>>,
        );
        let (name, mod_at, v, blob, size, sha): Row = sqlx::query_as(QUERY)
            .bind(file)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(FsError::NotExist)?;
        Ok(Stat {
            info: FileInfo {
                id: file,
                blob_ref: blob,
                name: Name::from_stored(name),
                size: size.unwrap_or_default(),
                modified_at: mod_at,
                is_dir: blob.is_none(),
            },
            version: v,
            etag: sha.map(Etag::new),
        })
    }

    async fn mkdir(&self, name: &Name, parent: Option<Uuid>) -> Result<Uuid> {
        self.insert_entry(name, parent).await
    }

    async fn rename(&self, file: Uuid, name: &Name, expected_v: i64) -> Result<()> {
        let done =
            sqlx::query("update fs.dir_entry set name = $2, v = v + 1, mod_at = now() where id = $1 and v = $3")
                .bind(file)
                .bind(name.as_str())
                .bind(expected_v)
                .execute(&self.pool)
                .await?;
        if done.rows_affected() == 0 {
            // disambiguate a missing row from a stale version token
            let exists: (bool,) =
                sqlx::query_as("select exists(select 1 from fs.dir_entry where id = $1)")
                    .bind(file)
                    .fetch_one(&self.pool)
                    .await?;
            return Err(if exists.0 {
                FsError::Conflict
            } else {
                FsError::NotExist
            });
        }
        Ok(())
    }
}
