use async_trait::async_trait;
use portal_sessions_core::{Session, SessionType};

use crate::error::StorageError;

/// Per-type session collections with a unique `(source, type, checksum)` index.
///
/// Writes provision the target collection on first use. Reads never create
/// anything: a type that was never written simply has no sessions.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Make sure the collection for `session_type` and its unique index exist.
    ///
    /// Idempotent, and safe to race with other instances doing the same.
    async fn ensure_collection(&self, session_type: &SessionType) -> Result<(), StorageError>;

    /// Persist a session, assigning an id when it has none.
    ///
    /// A session that already has an id replaces the `data` of the stored row
    /// with that id (source and type are never changed). Returns the stored
    /// session. A `(source, type, checksum)` collision with another row
    /// yields `StorageError::Duplicate`.
    async fn upsert_session(&self, session: &Session) -> Result<Session, StorageError>;

    /// Persist a new session strictly: never replaces an existing row.
    ///
    /// Uses the caller's id when present. A collision on `id` or on
    /// `(source, type, checksum)` yields `StorageError::Duplicate`.
    async fn insert_session(&self, session: &Session) -> Result<Session, StorageError>;

    /// Replace `data` and `checksum` of the existing row with this session's
    /// `(source, type, id)`. Never inserts.
    ///
    /// Returns the number of rows changed (0 or 1). A checksum collision with
    /// another row yields `StorageError::Duplicate`.
    async fn replace_data(&self, session: &Session) -> Result<u64, StorageError>;

    /// Get the session with the given checksum.
    async fn find_by_checksum(
        &self,
        source: &str,
        session_type: &SessionType,
        checksum: &str,
    ) -> Result<Option<Session>, StorageError>;

    /// Get session by ID.
    async fn find_by_id(
        &self,
        source: &str,
        session_type: &SessionType,
        id: &str,
    ) -> Result<Option<Session>, StorageError>;

    /// All sessions of a source and type, in insertion order.
    async fn list_by_source_and_type(
        &self,
        source: &str,
        session_type: &SessionType,
    ) -> Result<Vec<Session>, StorageError>;

    /// Sessions whose `data` has `value` at `field` (see [`crate::FieldFilter`]).
    async fn query_by_source_and_type(
        &self,
        source: &str,
        session_type: &SessionType,
        field: &str,
        value: &str,
    ) -> Result<Vec<Session>, StorageError>;

    /// Delete session. Returns the number of rows removed (0 or 1).
    async fn delete_by_id(
        &self,
        source: &str,
        session_type: &SessionType,
        id: &str,
    ) -> Result<u64, StorageError>;
}
