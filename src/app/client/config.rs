//! HTTP client configuration and building logic
//!
//! Every network call made by the CLI goes through a client built here, so
//! the dial timeout and the SSL validation preference apply uniformly to the
//! backend and to the identity service.

use std::time::Duration;

use reqwest::Client;

use crate::app::client::http::HttpHandler;
use crate::config::{EnvOverride, SessionState};
use crate::constants::http;
use crate::errors::{NetworkError, NetworkResult};

/// Configuration for the shared HTTP client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Connection establishment timeout
    pub dial_timeout: Duration,
    /// Whole-request timeout
    pub request_timeout: Duration,
    /// Accept invalid TLS certificates
    pub skip_ssl_validation: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            dial_timeout: http::DEFAULT_DIAL_TIMEOUT,
            request_timeout: http::DEFAULT_TIMEOUT,
            skip_ssl_validation: false,
        }
    }
}

impl ClientConfig {
    /// Resolve the configuration from persisted preferences and the environment
    pub fn from_session(state: &SessionState, env: &EnvOverride) -> Self {
        Self {
            dial_timeout: env.dial_timeout(state),
            skip_ssl_validation: state.skip_ssl_validation,
            ..Default::default()
        }
    }

    /// Builds the HTTP client with the specified configuration
    pub fn build_http_client(&self) -> NetworkResult<Client> {
        Client::builder()
            .connect_timeout(self.dial_timeout)
            .timeout(self.request_timeout)
            .user_agent(http::user_agent())
            .danger_accept_invalid_certs(self.skip_ssl_validation)
            .build()
            .map_err(|e| NetworkError::ClientBuild {
                reason: e.to_string(),
            })
    }

    /// Builds the client and wraps it in a handler that reports these timeouts
    pub fn build_handler(&self) -> NetworkResult<HttpHandler> {
        let client = self.build_http_client()?;
        Ok(HttpHandler::new(
            client,
            self.dial_timeout,
            self.request_timeout,
        ))
    }
}
