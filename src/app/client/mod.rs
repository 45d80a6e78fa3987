//! HTTP clients for the backend API and the identity service
//!
//! The module is organized into specialized components:
//! - `config`: HTTP client configuration and building
//! - `http`: single-attempt requests and response classification
//! - `auth`: identity service token grants
//! - `info`: unauthenticated root endpoint probe

pub mod auth;
pub mod config;
pub mod http;
pub mod info;

pub use auth::{Credentials, TokenRefresher};
pub use config::ClientConfig;
pub use http::{ApiRequest, ApiResponse, HttpHandler, RequestOutcome};
pub use info::RootInfo;
