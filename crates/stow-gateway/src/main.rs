//! Stow Gateway - HTTP file storage gateway

use clap::Parser;
use std::time::Duration;
use stow_gateway::{run_server_with_shutdown, GatewayConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "stow-gateway")]
#[command(about = "HTTP gateway for stow file storage")]
#[command(version)]
struct Args {
    /// Host to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0", env = "STOW_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "STOW_PORT")]
    port: u16,

    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Object-storage bucket for file content
    #[arg(long, default_value = "stow", env = "STOW_S3_BUCKET")]
    s3_bucket: String,

    /// AWS region
    #[arg(long, env = "AWS_REGION")]
    s3_region: Option<String>,

    /// Custom object-storage endpoint (e.g. for MinIO)
    #[arg(long, env = "STOW_S3_ENDPOINT")]
    s3_endpoint: Option<String>,

    /// Force path-style object keys
    #[arg(long, env = "STOW_S3_FORCE_PATH_STYLE")]
    s3_force_path_style: bool,

    /// Rate limiter burst capacity
    #[arg(long, default_value = "1000", env = "STOW_RATE_LIMIT_BURST")]
    rate_limit_burst: u32,

    /// Rate limiter refill interval in milliseconds
    #[arg(long, default_value = "60", env = "STOW_RATE_LIMIT_INTERVAL_MS")]
    rate_limit_interval_ms: u64,

    /// Enable debug logging
    #[arg(short, long, env = "STOW_DEBUG")]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("stow_gateway={},tower_http=debug", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("starting stow gateway on {}:{}", args.host, args.port);

    let config = GatewayConfig {
        host: args.host,
        port: args.port,
        database_url: args.database_url,
        s3_bucket: args.s3_bucket,
        s3_region: args.s3_region,
        s3_endpoint: args.s3_endpoint,
        s3_force_path_style: args.s3_force_path_style,
        rate_limit_burst: args.rate_limit_burst,
        rate_limit_interval: Duration::from_millis(args.rate_limit_interval_ms),
        ..Default::default()
    };

    run_server_with_shutdown(config, async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutdown signal received");
    })
    .await
}
