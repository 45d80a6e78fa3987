//! Error types for the cf CLI core
//!
//! Errors are classified once, where they are detected, and are passed up
//! unchanged: the top-level [`AppError`] wraps every domain error with
//! `#[error(transparent)]` so the message a user sees is exactly the one the
//! detecting component produced. [`AppError::kind`] maps every error onto the
//! fixed taxonomy the command runner reports against.

use std::fmt;
use std::path::PathBuf;

use semver::Version;
use thiserror::Error;

use crate::constants::messages;

/// Which part of the target a requirement found missing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetScope {
    Organization,
    Space,
}

impl TargetScope {
    fn message(&self) -> &'static str {
        match self {
            TargetScope::Organization => messages::NO_ORG_TARGETED,
            TargetScope::Space => messages::NO_SPACE_TARGETED,
        }
    }
}

impl fmt::Display for TargetScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetScope::Organization => write!(f, "org"),
            TargetScope::Space => write!(f, "space"),
        }
    }
}

/// Precondition failures raised by a requirement chain before a command runs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequirementError {
    /// No backend endpoint is configured
    #[error("{}", messages::NO_API_ENDPOINT)]
    NoApiEndpoint,

    /// Neither an access token nor a refresh token is stored
    #[error("{}", messages::NOT_LOGGED_IN)]
    NotLoggedIn,

    /// The backend advertises an API version below the command's floor.
    /// `current` is `None` when the version was missing or unparsable.
    #[error("This command requires CF API version {required} or higher.")]
    MinApiVersionNotMet {
        required: Version,
        current: Option<Version>,
    },

    /// No organization or space is targeted
    #[error("{}", .0.message())]
    TargetNotSet(TargetScope),
}

/// Authentication and identity service errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// The identity service rejected the supplied credentials
    #[error("{}", messages::CREDENTIALS_REJECTED)]
    CredentialsRejected,

    /// Every interactive login attempt was rejected
    #[error("{}", messages::UNABLE_TO_AUTHENTICATE)]
    UnableToAuthenticate,

    /// The refresh was rejected, or the refreshed token was rejected again
    #[error("{}", messages::TOKEN_REJECTED)]
    TokenRejected,

    /// Password authentication attempted over an active client-credentials session
    #[error("{}", messages::SERVICE_ACCOUNT_LOGGED_IN)]
    ServiceAccountLoggedIn,

    /// No credentials were supplied and none could be prompted for
    #[error("Missing {what}. Pass it as an argument or set the {env_var} environment variable.")]
    MissingCredentials {
        what: &'static str,
        env_var: &'static str,
    },

    /// The identity service returned an error description
    #[error("{description}")]
    Uaa { description: String },

    /// The token endpoint answered with a body that is not a token
    #[error("Invalid response from the authentication server: {reason}")]
    InvalidTokenResponse { reason: String },

    /// No identity service endpoint is recorded for the target
    #[error("No authentication endpoint is known for {target}. Run 'cf api {target}' again.")]
    NoAuthorizationEndpoint { target: String },

    /// Reading credentials from the terminal failed
    #[error("Failed to read credentials from the terminal: {0}")]
    Prompt(#[from] std::io::Error),

    /// Transport failure while talking to the identity service
    #[error(transparent)]
    Network(#[from] NetworkError),
}

/// Transport level failures: nothing usable came back from the remote end
#[derive(Error, Debug)]
pub enum NetworkError {
    /// No connection could be established within the dial timeout
    #[error("Request error: timed out connecting to {endpoint} after {timeout_secs}s\n{}", messages::NETWORK_TIP)]
    Timeout { endpoint: String, timeout_secs: u64 },

    /// Connected, but the whole request did not finish within the request timeout
    #[error("Request error: no response from {endpoint} within {timeout_secs}s\n{}", messages::NETWORK_TIP)]
    ResponseTimeout { endpoint: String, timeout_secs: u64 },

    /// The request could not be sent or the response could not be read
    #[error("Request error: {reason}\n{}", messages::NETWORK_TIP)]
    Unreachable { endpoint: String, reason: String },

    /// TLS certificate validation failed
    #[error("Invalid SSL Cert for {host}\n{}", messages::SKIP_SSL_TIP)]
    InvalidSslCert { host: String },

    /// The remote end answered with a gateway or server failure
    #[error("{}", messages::ENDPOINT_UNREACHABLE)]
    EndpointUnavailable { endpoint: String, status: u16 },

    /// The configured endpoint is not a usable URL
    #[error("Invalid URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Building the HTTP client failed
    #[error("Failed to build HTTP client: {reason}")]
    ClientBuild { reason: String },
}

/// Business errors returned by the backend, passed through unchanged
#[derive(Error, Debug)]
pub enum ApiError {
    /// Backend answered with an error status
    #[error("Server error, status code: {status}, error code: {code}, message: {description}")]
    Http {
        status: u16,
        code: String,
        description: String,
    },

    /// Backend answered with a body that could not be decoded
    #[error("Unable to parse response from {url}: {reason}")]
    InvalidResponse { url: String, reason: String },

    /// Named resource does not exist
    #[error("{resource} '{name}' not found.")]
    NotFound { resource: &'static str, name: String },
}

/// Persisted state errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Neither CF_HOME nor a home directory is available
    #[error("Unable to determine the home directory. Set CF_HOME to choose where state is stored")]
    NoHomeDirectory,

    /// State file exists but could not be read
    #[error("Unable to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// State file is not valid JSON for the expected schema
    #[error("Invalid config file {path}: {source}")]
    InvalidFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// State could not be written
    #[error("Error writing config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// State could not be encoded
    #[error("Error encoding config: {0}")]
    Encode(#[from] serde_json::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// The fixed classification every reported failure falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NoApiEndpoint,
    NotLoggedIn,
    MinApiVersionNotMet,
    TargetNotSet,
    CredentialsRejected,
    NetworkError,
    ConfigWriteError,
    UsageError,
    InvalidConfig,
    ApiError,
    ResourceNotFound,
    Other,
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Command precondition not met
    #[error(transparent)]
    Requirement(#[from] RequirementError),

    /// Authentication error
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Network error
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// Backend business error
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Invalid command line
    #[error("Incorrect Usage: {message}")]
    Usage { message: String },

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("{message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Create a usage error naming the offending argument
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Requirement(err) => match err {
                RequirementError::NoApiEndpoint => ErrorKind::NoApiEndpoint,
                RequirementError::NotLoggedIn => ErrorKind::NotLoggedIn,
                RequirementError::MinApiVersionNotMet { .. } => ErrorKind::MinApiVersionNotMet,
                RequirementError::TargetNotSet(_) => ErrorKind::TargetNotSet,
            },
            AppError::Auth(err) => match err {
                AuthError::Network(_) => ErrorKind::NetworkError,
                AuthError::MissingCredentials { .. } | AuthError::ServiceAccountLoggedIn => {
                    ErrorKind::UsageError
                }
                AuthError::NoAuthorizationEndpoint { .. } => ErrorKind::NoApiEndpoint,
                AuthError::InvalidTokenResponse { .. } | AuthError::Prompt(_) => ErrorKind::Other,
                AuthError::CredentialsRejected
                | AuthError::UnableToAuthenticate
                | AuthError::TokenRejected
                | AuthError::Uaa { .. } => ErrorKind::CredentialsRejected,
            },
            AppError::Network(_) => ErrorKind::NetworkError,
            AppError::Api(ApiError::NotFound { .. }) => ErrorKind::ResourceNotFound,
            AppError::Api(_) => ErrorKind::ApiError,
            AppError::Config(ConfigError::Write { .. } | ConfigError::Encode(_)) => {
                ErrorKind::ConfigWriteError
            }
            AppError::Config(_) => ErrorKind::InvalidConfig,
            AppError::Usage { .. } => ErrorKind::UsageError,
            AppError::Io(_) | AppError::Generic { .. } => ErrorKind::Other,
        }
    }

    /// Check if the error is recoverable (transient)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::Network(NetworkError::Timeout { .. })
                | AppError::Network(NetworkError::ResponseTimeout { .. })
                | AppError::Network(NetworkError::Unreachable { .. })
                | AppError::Network(NetworkError::EndpointUnavailable { .. })
                | AppError::Auth(AuthError::Network(NetworkError::Timeout { .. }))
                | AppError::Auth(AuthError::Network(NetworkError::ResponseTimeout { .. }))
                | AppError::Auth(AuthError::Network(NetworkError::Unreachable { .. }))
                | AppError::Auth(AuthError::Network(NetworkError::EndpointUnavailable { .. }))
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Requirement(_) => "requirement",
            AppError::Auth(_) => "authentication",
            AppError::Network(_) => "network",
            AppError::Api(_) => "api",
            AppError::Config(_) => "config",
            AppError::Usage { .. } => "usage",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Convenience type alias for Results with AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Convenience type alias for authentication Results
pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// Convenience type alias for network Results
pub type NetworkResult<T> = std::result::Result<T, NetworkError>;

/// Convenience type alias for backend Results
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Convenience type alias for configuration Results
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
