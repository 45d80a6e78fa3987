//! Core application logic for the cf CLI
//!
//! This module contains the request/session pipeline every command goes
//! through: HTTP clients for the backend and the identity service, the
//! per-process authenticated session, command requirements, and the few
//! backend lookups the bundled commands need.
//!
//! # Examples
//!
//! ```rust,no_run
//! use cf_cli::app::{AuthenticatedSession, RequirementChain};
//! use cf_cli::config::EnvOverride;
//!
//! # async fn example() -> cf_cli::Result<()> {
//! let mut session = AuthenticatedSession::open(EnvOverride::from_env())?;
//!
//! // Fail early with the user-facing message if nothing is targeted
//! RequirementChain::logged_in().evaluate(&mut session).await?;
//!
//! let url = session.url_for("/v3/apps")?;
//! let apps: serde_json::Value = session.get_json(url).await?;
//! println!("{}", apps);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod cloud_controller;
pub mod requirements;
pub mod session;
pub mod token;

// Re-export main public API
pub use client::{
    ApiRequest, ApiResponse, ClientConfig, Credentials, HttpHandler, RequestOutcome, RootInfo,
    TokenRefresher,
};
pub use cloud_controller::{CloudController, Resource};
pub use requirements::{Requirement, RequirementChain};
pub use session::AuthenticatedSession;
pub use token::{decode_user, TokenUser};
