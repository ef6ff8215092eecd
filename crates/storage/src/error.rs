//! Typed error enum for the storage layer.
//!
//! Callers match on specific failure modes (duplicate key, malformed query,
//! unreachable store) instead of downcasting opaque boxes. The service layer
//! relies on `Duplicate` being reported as a value, not inferred from a
//! message, to drive its dedup-on-conflict step.

use thiserror::Error;

/// SQLSTATE `unique_violation`.
pub(crate) const UNIQUE_VIOLATION: &str = "23505";
/// SQLSTATE `undefined_table`.
pub(crate) const UNDEFINED_TABLE: &str = "42P01";
/// SQLSTATE `duplicate_table`.
pub(crate) const DUPLICATE_TABLE: &str = "42P07";
/// SQLSTATE `duplicate_object`.
pub(crate) const DUPLICATE_OBJECT: &str = "42710";

/// Storage-layer error with variants covering every expected failure mode.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Unique constraint violation: duplicate `id` or `(source, type, checksum)`.
    #[error("duplicate: {0}")]
    Duplicate(String),

    /// Ad-hoc filter is malformed or rejected by the query engine.
    #[error("invalid query: {0}")]
    QueryInvalid(String),

    /// The store could not be reached (pool timeout, I/O, TLS, closed pool).
    #[error("store unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),

    /// The store was reached but refused the statement.
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    /// Collection or index could not be provisioned.
    #[error("provisioning {collection} failed: {message}")]
    Provisioning { collection: String, message: String },

    /// Row data could not be deserialized into a session.
    #[error("data corruption: {context}")]
    DataCorruption {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl StorageError {
    /// Whether this error is likely transient (worth retrying by the caller).
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    /// Whether this error is a unique-constraint violation.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }

    /// Like `From<sqlx::Error>`, but data exceptions raised while evaluating
    /// an ad-hoc filter are reported as `QueryInvalid`.
    pub(crate) fn from_query(err: sqlx::Error) -> Self {
        if sqlstate(&err).is_some_and(|code| code.starts_with("22") || code == "42804") {
            return Self::QueryInvalid(err.to_string());
        }
        Self::from(err)
    }
}

/// SQLSTATE of a database error, if the store reported one.
pub(crate) fn sqlstate(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().map(|c| c.into_owned()),
        _ => None,
    }
}

/// Custom `From<sqlx::Error>`, not a blanket `#[from]`.
///
/// - SQLSTATE 23505 → `Duplicate`
/// - transport failures → `Unavailable`
/// - decode failures → `DataCorruption`
/// - everything else → `Database`
impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(ref db_err)
                if db_err.code().is_some_and(|c| c == UNIQUE_VIOLATION) =>
            {
                let constraint = db_err.constraint().unwrap_or("unique index").to_owned();
                Self::Duplicate(format!("{constraint}: {}", db_err.message()))
            },
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_) => Self::Unavailable(err),
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => Self::DataCorruption {
                context: "session row could not be decoded".to_owned(),
                source: Box::new(err),
            },
            _ => Self::Database(err),
        }
    }
}
