//! PostgreSQL storage backend using sqlx.
//!
//! One table per session type, holding `data` as JSONB so that ad-hoc field
//! queries run inside the database.

mod collections;
mod sessions;

use std::time::Duration;

use crate::error::{StorageError, UNDEFINED_TABLE, sqlstate};
use crate::registry::CollectionRegistry;
use portal_sessions_core::{
    PG_POOL_ACQUIRE_TIMEOUT_SECS, PG_POOL_IDLE_TIMEOUT_SECS, PG_POOL_MAX_CONNECTIONS, Session,
    SessionType, env_parse_with_default,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

/// Connection pool tuning.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl PoolSettings {
    /// Read `PG_POOL_*` overrides, keeping defaults for unset or invalid values.
    pub fn from_env() -> Self {
        Self {
            max_connections: env_parse_with_default(
                "PG_POOL_MAX_CONNECTIONS",
                PG_POOL_MAX_CONNECTIONS,
            ),
            acquire_timeout_secs: env_parse_with_default(
                "PG_POOL_ACQUIRE_TIMEOUT_SECS",
                PG_POOL_ACQUIRE_TIMEOUT_SECS,
            ),
            idle_timeout_secs: env_parse_with_default(
                "PG_POOL_IDLE_TIMEOUT_SECS",
                PG_POOL_IDLE_TIMEOUT_SECS,
            ),
        }
    }
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: PG_POOL_MAX_CONNECTIONS,
            acquire_timeout_secs: PG_POOL_ACQUIRE_TIMEOUT_SECS,
            idle_timeout_secs: PG_POOL_IDLE_TIMEOUT_SECS,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PgStorage {
    pool: PgPool,
    collections: CollectionRegistry,
}

impl PgStorage {
    pub async fn new(database_url: &str, settings: PoolSettings) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(settings.idle_timeout_secs))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;
        tracing::info!(max_connections = settings.max_connections, "PgStorage initialized");
        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing pool. Collections are still provisioned lazily.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool, collections: CollectionRegistry::default() }
    }
}

pub(crate) const SESSION_COLUMNS: &str = "id, source, type, checksum, data";

/// Quoted table identifier for a session type.
///
/// `SessionType` names are restricted to `[a-z][a-z0-9_]*`, so quoting
/// cannot be escaped from.
pub(crate) fn table_name(session_type: &SessionType) -> String {
    format!("\"{}\"", session_type.as_str())
}

/// Whether the store reported that the collection does not exist yet.
pub(crate) fn is_undefined_table(err: &sqlx::Error) -> bool {
    sqlstate(err).is_some_and(|code| code == UNDEFINED_TABLE)
}

pub(crate) fn row_to_session(
    row: &sqlx::postgres::PgRow,
    session_type: &SessionType,
) -> Result<Session, StorageError> {
    let stored_type: String = row.try_get("type")?;
    if stored_type != session_type.as_str() {
        return Err(StorageError::DataCorruption {
            context: format!(
                "row in collection {session_type} has type '{stored_type}'"
            ),
            source: "type column does not match collection".into(),
        });
    }
    let data: serde_json::Value = row.try_get("data")?;
    Ok(Session::restore(
        row.try_get("id")?,
        row.try_get("source")?,
        session_type.clone(),
        data,
        row.try_get("checksum")?,
    ))
}
