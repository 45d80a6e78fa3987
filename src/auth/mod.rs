//! Login credential sourcing
//!
//! Token handling lives with the identity service client in
//! [`crate::app::client::auth`]; this module only decides which username and
//! password (or client id and secret) a login uses.
//!
//! # Examples
//!
//! ```rust,no_run
//! use cf_cli::auth::resolve_auth_credentials;
//! use cf_cli::config::EnvOverride;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Falls back to CF_USERNAME / CF_PASSWORD
//! let credentials = resolve_auth_credentials(None, None, false, &EnvOverride::from_env())?;
//! println!("Authenticating as {}", credentials.identity());
//! # Ok(())
//! # }
//! ```

pub mod credentials;

// Re-export main public API
pub use credentials::{
    login_password, login_username, prompt_line, prompt_secret, resolve_auth_credentials,
    stdin_is_interactive, CredentialSource, Sourced,
};
