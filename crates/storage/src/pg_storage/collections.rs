//! Lazy, race-safe provisioning of per-type session tables.

use super::{PgStorage, table_name};

use crate::error::{DUPLICATE_OBJECT, DUPLICATE_TABLE, StorageError, UNIQUE_VIOLATION, sqlstate};
use portal_sessions_core::SessionType;
use sqlx::PgPool;

impl PgStorage {
    /// Create the table and indexes for `session_type` unless this instance
    /// already did so.
    pub(crate) async fn provision(&self, session_type: &SessionType) -> Result<(), StorageError> {
        if self.collections.is_provisioned(session_type).await {
            return Ok(());
        }
        create_collection(&self.pool, session_type).await?;
        if self.collections.mark_provisioned(session_type).await {
            tracing::info!(session_type = %session_type, "session collection provisioned");
        }
        Ok(())
    }
}

async fn create_collection(pool: &PgPool, session_type: &SessionType) -> Result<(), StorageError> {
    let table = table_name(session_type);
    let name = session_type.as_str();
    let statements = [
        format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                seq BIGSERIAL NOT NULL,
                id TEXT PRIMARY KEY,
                source TEXT NOT NULL,
                type TEXT NOT NULL,
                checksum TEXT NOT NULL,
                data JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"
        ),
        format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS \"{name}_source_type_checksum_key\"
             ON {table} (source, type, checksum)"
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS \"{name}_source_type_seq_idx\"
             ON {table} (source, type, seq)"
        ),
    ];
    for statement in &statements {
        match sqlx::query(statement).execute(pool).await {
            Ok(_) => {},
            Err(err) if lost_creation_race(&err) => {
                tracing::debug!(
                    session_type = %session_type,
                    "collection created concurrently by another writer"
                );
            },
            Err(err) => return Err(provisioning_error(session_type, err)),
        }
    }
    Ok(())
}

/// `IF NOT EXISTS` is not atomic in PostgreSQL: two sessions creating the
/// same table can both pass the check, and the loser fails on the catalog.
fn lost_creation_race(err: &sqlx::Error) -> bool {
    sqlstate(err).is_some_and(|code| {
        code == DUPLICATE_TABLE || code == DUPLICATE_OBJECT || code == UNIQUE_VIOLATION
    })
}

fn provisioning_error(session_type: &SessionType, err: sqlx::Error) -> StorageError {
    match StorageError::from(err) {
        unavailable @ StorageError::Unavailable(_) => unavailable,
        other => StorageError::Provisioning {
            collection: session_type.to_string(),
            message: other.to_string(),
        },
    }
}
