//! Shared constants for portal-sessions.

/// Session types recognized when `SESSION_TYPES` is not configured.
pub const DEFAULT_SESSION_TYPES: &[&str] = &["main_session", "virtual_cohort"];

/// Environment variable holding the comma-separated recognized session types.
pub const SESSION_TYPES_ENV: &str = "SESSION_TYPES";

/// Minimum length of a session `source`.
pub const MIN_SOURCE_LENGTH: usize = 3;

/// PostgreSQL connection pool: maximum connections.
pub const PG_POOL_MAX_CONNECTIONS: u32 = 20;

/// PostgreSQL connection pool: acquire timeout in seconds.
pub const PG_POOL_ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// PostgreSQL connection pool: idle timeout in seconds.
pub const PG_POOL_IDLE_TIMEOUT_SECS: u64 = 300;

/// Default request body limit for session payloads (2 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;
