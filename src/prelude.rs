//! Prelude module for the cf CLI core library
//!
//! This module re-exports the most commonly used items from the library,
//! providing a convenient way to import everything needed for typical usage
//! with a single `use cf_cli::prelude::*;` statement.
//!
//! # Usage
//!
//! ```rust,no_run
//! use cf_cli::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let mut session = AuthenticatedSession::open(EnvOverride::from_env())?;
//!     RequirementChain::targeted_space(None).evaluate(&mut session).await?;
//!
//!     let space_guid = session.state().space.guid.clone();
//!     for app in CloudController::new(&mut session).apps(&space_guid).await? {
//!         println!("{}", app.name);
//!     }
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, ErrorKind, Result};

// Session pipeline
pub use crate::app::{
    ApiRequest, ApiResponse, AuthenticatedSession, CloudController, Credentials, Requirement,
    RequirementChain, RootInfo, TokenRefresher,
};

// Persisted state
pub use crate::config::{ConfigStore, EnvOverride, GrantType, Organization, SessionState, Space};

// Common external crate re-exports for convenience
pub use semver::Version;
pub use tokio;
