//! Core types for portal-sessions
//!
//! Domain types shared across all other crates: the session entity, the
//! deployment-defined type registry and the canonical payload checksum.

mod checksum;
mod constants;
mod env_config;
mod error;
mod session;
mod session_type;

pub use checksum::*;
pub use constants::*;
pub use env_config::*;
pub use error::*;
pub use session::*;
pub use session_type::*;
