//! # Stow FS
//!
//! File and folder semantics over a relational metadata store and an
//! object-storage blob adapter.
//!
//! This crate provides:
//! - **Name validation**: the small fixed charset file names must use
//! - **Metadata store**: directory-entry and blob-link records with
//!   optimistic-concurrency (version token) updates
//! - **FS coordinator**: the facade composing metadata and blob storage
//!   into create, open, stat, mkdir, and rename

pub mod db;
pub mod entry;
pub mod error;
pub mod fs;
pub mod memory;
pub mod name;

pub use db::{MetadataOps, PgMetadata, Stat};
pub use entry::{Cursor, Etag, FileInfo};
pub use error::{FsError, Result};
pub use fs::{Fs, OpenFile};
pub use memory::MemoryMetadata;
pub use name::Name;
