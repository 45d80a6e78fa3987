//! Application constants for the cf CLI core
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain. User-facing message text lives here so
//! that the wording stays identical wherever an error is raised.

use std::time::Duration;

/// Environment variable names
pub mod env {
    /// Directory containing the `.cf` state directory (overrides the home directory)
    pub const CF_HOME: &str = "CF_HOME";

    /// Forces colour output on or off (`true`/`false`)
    pub const CF_COLOR: &str = "CF_COLOR";

    /// Connection establishment timeout, in whole seconds
    pub const CF_DIAL_TIMEOUT: &str = "CF_DIAL_TIMEOUT";

    /// Enables request/response tracing (`true`)
    pub const CF_TRACE: &str = "CF_TRACE";

    /// Username used by `auth` when no positional username is given
    pub const CF_USERNAME: &str = "CF_USERNAME";

    /// Password used by `auth` when no positional password is given
    pub const CF_PASSWORD: &str = "CF_PASSWORD";

    /// Locale override, takes precedence over `LANG`
    pub const LC_ALL: &str = "LC_ALL";

    /// Locale fallback
    pub const LANG: &str = "LANG";
}

/// Persisted state file layout
pub mod config {
    use super::Duration;

    /// Directory created under `CF_HOME` (or the home directory)
    pub const DIR_NAME: &str = ".cf";

    /// State file name inside [`DIR_NAME`]
    pub const FILE_NAME: &str = "config.json";

    /// Prefix for the temporary file written before the atomic rename
    pub const TEMP_FILE_PREFIX: &str = "temp-config";

    /// Temporary files older than this are left over from a killed save
    pub const STALE_TEMP_FILE_AGE: Duration = Duration::from_secs(600);

    /// Schema version written into every saved file
    pub const CURRENT_VERSION: u32 = 3;

    /// State file permissions (Unix only) - owner read/write only
    #[cfg(unix)]
    pub const FILE_PERMISSIONS: u32 = 0o600;

    /// State directory permissions (Unix only)
    #[cfg(unix)]
    pub const DIR_PERMISSIONS: u32 = 0o700;

    /// Locale value accepted by `cf config --locale` to remove the override
    pub const CLEAR_LOCALE: &str = "CLEAR";

    /// Locale used when nothing recognisable is configured
    pub const DEFAULT_LOCALE: &str = "en-US";

    /// Locales with translated output
    pub const SUPPORTED_LOCALES: &[&str] = &[
        "de-DE", "en-US", "es-ES", "fr-FR", "it-IT", "ja-JP", "ko-KR", "pt-BR", "zh-Hans",
        "zh-Hant",
    ];
}

/// OAuth client and token handling constants
pub mod auth {
    /// OAuth client id used for password and refresh grants
    pub const DEFAULT_CLIENT_ID: &str = "cf";

    /// OAuth client secret paired with [`DEFAULT_CLIENT_ID`]
    pub const DEFAULT_CLIENT_SECRET: &str = "";

    /// Token endpoint path on the identity service
    pub const TOKEN_PATH: &str = "/oauth/token";

    /// Number of attempts `login` allows when credentials are typed at a prompt
    pub const MAX_LOGIN_ATTEMPTS: usize = 3;

    /// Backend error code for an invalid bearer token
    pub const INVALID_TOKEN_CODE: u64 = 1000;

    /// Backend error name for an invalid bearer token
    pub const INVALID_TOKEN_ERROR_CODE: &str = "CF-InvalidAuthToken";

    /// Identity service error name for an invalid bearer token
    pub const UAA_INVALID_TOKEN: &str = "invalid_token";

    /// Replacement text for secrets in trace output
    pub const REDACTED: &str = "[PRIVATE DATA HIDDEN]";
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default dial (connection establishment) timeout
    pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(5);

    /// Overall per-request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Header carrying comma separated, URL-escaped backend warnings
    pub const WARNINGS_HEADER: &str = "x-cf-warnings";

    /// User agent sent with every request
    pub fn user_agent() -> String {
        format!(
            "cf/{} ({}; {})",
            env!("CARGO_PKG_VERSION"),
            std::env::consts::ARCH,
            std::env::consts::OS
        )
    }
}

/// API versions commands gate on
pub mod api_version {
    use semver::Version;

    /// Minimum API version for listing apps with their state
    pub const APPS_MIN_VERSION: Version = Version::new(3, 27, 0);
}

/// User-facing message text
pub mod messages {
    pub const NO_API_ENDPOINT: &str =
        "No API endpoint set. Use 'cf login' or 'cf api' to target an endpoint.";
    pub const NOT_LOGGED_IN: &str = "Not logged in. Use 'cf login' or 'cf login --sso' to log in.";
    pub const NO_ORG_TARGETED: &str = "No org targeted, use 'cf target -o ORG' to target an org.";
    pub const NO_SPACE_TARGETED: &str =
        "No space targeted, use 'cf target -s SPACE' to target a space.";
    pub const CREDENTIALS_REJECTED: &str = "Credentials were rejected, please try again.";
    pub const UNABLE_TO_AUTHENTICATE: &str = "Unable to authenticate.";
    pub const TOKEN_REJECTED: &str = "The token expired, was revoked, or the token ID is incorrect. Please log back in to re-authenticate.";
    pub const ENDPOINT_UNREACHABLE: &str = "The targeted API endpoint could not be reached.";
    pub const NETWORK_TIP: &str = "TIP: If you are behind a firewall and require an HTTP proxy, verify the https_proxy environment variable is correctly set. Else, check your network connection.";
    pub const SKIP_SSL_TIP: &str =
        "TIP: Use 'cf api --skip-ssl-validation' to continue with an insecure API endpoint";
    pub const INSECURE_ENDPOINT: &str = "Warning: Insecure http API endpoint detected: secure https API endpoints are recommended";
    pub const NO_TARGET_SET: &str = "No org or space targeted, use 'cf target -o ORG -s SPACE'";
    pub const NO_API_SET_SHORT: &str = "No api endpoint set. Use 'cf api' to set an endpoint";
    pub const SERVICE_ACCOUNT_LOGGED_IN: &str = "Service account currently logged in. Use 'cf logout' to log out service account and try again.";
    pub const OK: &str = "OK";
    pub const FAILED: &str = "FAILED";
}
