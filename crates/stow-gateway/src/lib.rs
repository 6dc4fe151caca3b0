//! # Stow Gateway
//!
//! HTTP front end for the stow file storage service.
//!
//! This crate provides:
//! - **File API**: upload, download, folder creation, metadata, rename
//! - **Content negotiation**: JSON and HTML offers, refused up front
//!   with 406 when neither fits
//! - **Rate limiting**: process-wide token bucket with RateLimit
//!   response headers
//! - **Bounded decoding**: JSON bodies read under a byte ceiling and a
//!   deadline, one value per request

pub mod config;
pub mod decode;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::GatewayConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use server::{run_server, run_server_with_shutdown};
pub use state::AppState;
