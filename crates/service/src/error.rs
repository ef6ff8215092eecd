//! Typed error enum for the service layer.
//!
//! The five kinds callers see, independent of transport. Storage failures are
//! folded into them here so that handlers never inspect raw store errors.

use portal_sessions_core::ValidationError;
use portal_sessions_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Payload failed validation, or the store rejected the write for a
    /// reason other than the dedup index.
    #[error("invalid session: {0}")]
    SessionInvalid(String),

    /// Strict create hit an existing `id` or `(source, type, checksum)`.
    #[error("session already exists: {0}")]
    SessionAlreadyExists(String),

    /// No session with this `(source, type, id)`.
    #[error("session not found: {session_source}/{session_type}/{id}")]
    SessionNotFound { session_source: String, session_type: String, id: String },

    /// Ad-hoc filter is malformed or not supported by the store.
    #[error("invalid session query: {0}")]
    SessionQueryInvalid(String),

    /// The backing store could not be reached, provisioned or read back.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[source] StorageError),
}

impl ServiceError {
    pub fn not_found(source: &str, session_type: &str, id: &str) -> Self {
        Self::SessionNotFound {
            session_source: source.to_owned(),
            session_type: session_type.to_owned(),
            id: id.to_owned(),
        }
    }

    /// Whether this error is likely transient (worth retrying).
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::SessionNotFound { .. })
    }
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        Self::SessionInvalid(err.to_string())
    }
}

impl ServiceError {
    /// Classify a failed write. The store refusing the row (constraint
    /// violation, bad value) is the caller's fault; a store that cannot be
    /// reached, provisioned or decoded is not.
    pub fn from_write(err: StorageError) -> Self {
        match err {
            infra @ (StorageError::Unavailable(_)
            | StorageError::Provisioning { .. }
            | StorageError::DataCorruption { .. }) => Self::StoreUnavailable(infra),
            other => Self::SessionInvalid(other.to_string()),
        }
    }
}

/// Default folding of storage failures on reads: anything the store itself
/// got wrong is `StoreUnavailable`. Operations with their own meaning for
/// `Duplicate` match it first.
impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::QueryInvalid(msg) => Self::SessionQueryInvalid(msg),
            duplicate @ StorageError::Duplicate(_) => Self::SessionInvalid(duplicate.to_string()),
            infra @ (StorageError::Unavailable(_)
            | StorageError::Database(_)
            | StorageError::Provisioning { .. }
            | StorageError::DataCorruption { .. }) => Self::StoreUnavailable(infra),
        }
    }
}
