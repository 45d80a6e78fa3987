//! cf CLI core library
//!
//! Session and command infrastructure for a Cloud Foundry style command line
//! client: persisted targeting and tokens, command requirements, and an
//! authenticated session that renews its access token exactly once when the
//! backend rejects it.

pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
