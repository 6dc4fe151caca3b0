//! Application state

use crate::config::GatewayConfig;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use stow_blob::{S3BlobStore, S3Config};
use stow_fs::{Fs, PgMetadata};
use tracing::info;

/// Application state shared across handlers
pub struct AppState {
    /// Gateway configuration
    pub config: GatewayConfig,
    /// File system facade over metadata and blob storage
    pub fs: Fs,
}

impl AppState {
    /// Create a new application state, connecting both backends
    pub async fn new(config: GatewayConfig) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_db_connections)
            .connect(&config.database_url)
            .await?;
        info!("connected to metadata store");

        let store = Arc::new(
            S3BlobStore::new(S3Config {
                bucket: config.s3_bucket.clone(),
                region: config.s3_region.clone(),
                endpoint: config.s3_endpoint.clone(),
                force_path_style: config.s3_force_path_style,
                ..Default::default()
            })
            .await?,
        );
        info!(bucket = %config.s3_bucket, "connected to blob store");

        let fs = Fs::new(Arc::new(PgMetadata::new(pool)), store.clone(), store);
        Ok(Self { config, fs })
    }

    /// Build state around an existing file system, used by tests to
    /// inject in-memory backends.
    pub fn with_fs(config: GatewayConfig, fs: Fs) -> Self {
        Self { config, fs }
    }
}
