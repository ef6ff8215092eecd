use std::sync::Arc;

use anyhow::{Context, Result};
use portal_sessions_core::{DEFAULT_MAX_BODY_BYTES, SessionTypes, env_parse_with_default};
use portal_sessions_http::{AppState, create_router};
use portal_sessions_service::SessionService;
use portal_sessions_storage::{PoolSettings, StorageBackend};

async fn build_storage() -> Result<StorageBackend> {
    match std::env::var("DATABASE_URL") {
        Ok(url) if !url.trim().is_empty() => {
            let storage = StorageBackend::new_postgres(&url, PoolSettings::from_env())
                .await
                .context("failed to connect to PostgreSQL")?;
            Ok(storage)
        },
        _ => {
            tracing::warn!("DATABASE_URL not set, sessions are kept in memory only");
            Ok(StorageBackend::new_memory())
        },
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

pub(crate) async fn run(port: u16, host: String) -> Result<()> {
    let types = SessionTypes::from_env().context("invalid SESSION_TYPES")?;
    let storage = Arc::new(build_storage().await?);
    tracing::info!(
        backend = storage.kind(),
        types = %types.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(","),
        "Session store ready"
    );

    let session_service = Arc::new(SessionService::new(storage, types));
    let state = Arc::new(AppState { session_service });
    let max_body_bytes = env_parse_with_default("MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES);

    let router = create_router(state, max_body_bytes);
    let addr = format!("{host}:{port}");
    tracing::info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;

    Ok(())
}
