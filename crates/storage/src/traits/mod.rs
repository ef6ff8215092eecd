//! Storage backend trait abstraction
//!
//! Defines the async repository contract every session backend implements,
//! enabling PostgreSQL in production and an in-process store for tests.

pub mod session;

pub use session::SessionRepository;
