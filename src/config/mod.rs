//! Persisted session state and environment overrides
//!
//! - [`state`]: the [`SessionState`] record and the mutators that keep its
//!   targeting invariants
//! - [`store`]: [`ConfigStore`], atomic load/save of the state file
//! - [`env`]: [`EnvOverride`], environment variables and their precedence

pub mod env;
pub mod state;
pub mod store;

pub use env::{normalize_locale, EnvOverride};
pub use state::{GrantType, Organization, SessionState, Space, TargetInfo, TokenSet};
pub use store::ConfigStore;
