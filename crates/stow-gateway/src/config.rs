//! Gateway configuration

use crate::decode::DecodeLimits;
use std::time::Duration;

/// Gateway server configuration
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// PostgreSQL connection string
    pub database_url: String,
    /// Maximum metadata connections held open
    pub max_db_connections: u32,
    /// Object-storage bucket holding file content
    pub s3_bucket: String,
    /// AWS region (optional, the default chain applies when unset)
    pub s3_region: Option<String>,
    /// Custom object-storage endpoint (e.g. for MinIO)
    pub s3_endpoint: Option<String>,
    /// Force path-style object keys (required by some S3-compatibles)
    pub s3_force_path_style: bool,
    /// Token bucket capacity for the request limiter
    pub rate_limit_burst: u32,
    /// One limiter token refills per this interval
    pub rate_limit_interval: Duration,
    /// Maximum request body size (bytes), uploads included
    pub max_body_size: usize,
    /// Maximum JSON request body size (bytes)
    pub json_max_bytes: usize,
    /// Deadline for reading a JSON request body
    pub json_read_deadline: Option<Duration>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_url: "postgres://localhost:5432/stow".to_string(),
            max_db_connections: 10,
            s3_bucket: "stow".to_string(),
            s3_region: None,
            s3_endpoint: None,
            s3_force_path_style: false,
            rate_limit_burst: 1000,
            rate_limit_interval: Duration::from_millis(60),
            max_body_size: 1024 * 1024 * 1024, // 1 GiB
            json_max_bytes: 1024 * 1024,       // 1 MiB
            json_read_deadline: Some(Duration::from_secs(100)),
        }
    }
}

impl GatewayConfig {
    /// Get the bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Limits applied when decoding JSON request bodies
    pub fn decode_limits(&self) -> DecodeLimits {
        DecodeLimits {
            max_bytes: self.json_max_bytes,
            deadline: self.json_read_deadline,
        }
    }
}
