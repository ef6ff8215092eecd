//! Storage layer for portal-sessions
//!
//! PostgreSQL storage with one JSONB table per session type, plus an
//! in-memory backend with the same uniqueness guarantees.

mod backend;
mod error;
mod filter;
mod memory;
mod pg_storage;
mod registry;
pub mod traits;

pub use backend::StorageBackend;
pub use error::StorageError;
pub use filter::FieldFilter;
pub use memory::MemoryStorage;
pub use pg_storage::{PgStorage, PoolSettings};
pub use traits::SessionRepository;
