//! HTTP route definitions

use crate::{handlers, middleware, AppState};
use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

/// Create the main router
pub fn create_router(state: Arc<AppState>) -> Router {
    let rate_limiter = middleware::create_rate_limiter(
        state.config.rate_limit_burst,
        state.config.rate_limit_interval,
    );

    Router::new()
        .route("/ready", get(handlers::ready))
        .route("/touch/files", post(handlers::upload_file))
        .route("/mkdir/files", post(handlers::create_folder))
        .route(
            "/files/{file}",
            get(handlers::download_file).patch(handlers::rename_file),
        )
        .route("/info/files/{file}", get(handlers::file_info))
        // the last layer added runs first, so throttling happens
        // before negotiation and logging wraps both
        .layer(axum_middleware::from_fn(middleware::accept_middleware))
        .layer(axum_middleware::from_fn_with_state(
            rate_limiter,
            middleware::rate_limit_middleware,
        ))
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .with_state(state)
}
