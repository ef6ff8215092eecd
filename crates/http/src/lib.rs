//! HTTP API server for portal-sessions.

#![allow(missing_docs, reason = "Internal crate with self-explanatory API")]
#![allow(unreachable_pub, reason = "pub items are re-exported")]
#![allow(missing_debug_implementations, reason = "Internal types")]
#![allow(clippy::missing_docs_in_private_items, reason = "Internal crate")]
#![allow(clippy::implicit_return, reason = "Implicit return is idiomatic Rust")]
#![allow(clippy::question_mark_used, reason = "? operator is idiomatic Rust")]
#![allow(clippy::exhaustive_structs, reason = "HTTP types are stable")]

pub mod api_error;
mod handlers;
mod query_types;
mod response_types;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};

use portal_sessions_service::SessionService;

pub use response_types::{DeleteResponse, SessionIdResponse};

/// Shared application state for all HTTP handlers.
pub struct AppState {
    pub session_service: Arc<SessionService>,
}

/// Build the API router.
///
/// Request bodies above `max_body_bytes` are rejected with 413 before they
/// reach a handler.
pub fn create_router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/info", get(info))
        .route(
            "/api/sessions/{source}/{type}",
            get(handlers::sessions::get_sessions).post(handlers::sessions::add_session),
        )
        .route("/api/sessions/{source}/{type}/new", post(handlers::sessions::create_new_session))
        .route("/api/sessions/{source}/{type}/query", get(handlers::sessions::query_sessions))
        .route(
            "/api/sessions/{source}/{type}/{id}",
            get(handlers::sessions::get_session)
                .put(handlers::sessions::update_session)
                .delete(handlers::sessions::delete_session),
        )
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(cors)
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn info() -> &'static str {
    concat!("portal-sessions ", env!("CARGO_PKG_VERSION"))
}
