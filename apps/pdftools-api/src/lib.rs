//! PDF toolbox API
//!
//! Provides REST endpoints for:
//! - Merge, split, reorder and compress
//! - Password protection and removal
//! - Watermarks, signature stamps and images to PDF

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod state;

use state::AppState;

/// Build the router with every tool endpoint
pub fn app(state: AppState) -> Router {
    let body_limit = state.config.max_body_bytes;

    // CORS configuration for web clients
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/merge", post(handlers::merge))
        .route("/api/split", post(handlers::split))
        .route("/api/reorder", post(handlers::reorder))
        .route("/api/compress", post(handlers::compress))
        .route("/api/protect", post(handlers::protect))
        .route("/api/unlock", post(handlers::unlock))
        .route("/api/watermark", post(handlers::watermark))
        .route("/api/sign", post(handlers::sign))
        .route("/api/images-to-pdf", post(handlers::convert_images))
        .route("/api/page-count", post(handlers::count_pages))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}
