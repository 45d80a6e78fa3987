//! Where login credentials come from
//!
//! Credentials are taken from command-line arguments first, then from the
//! `CF_USERNAME`/`CF_PASSWORD` environment variables, and finally from an
//! interactive prompt when stdin is a terminal. The password prompt never
//! echoes.

use std::io::{self, BufRead, Write};

use tracing::debug;

use crate::app::client::Credentials;
use crate::config::EnvOverride;
use crate::constants::env as env_constants;
use crate::errors::{AuthError, AuthResult};

/// Where a credential value was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Argument,
    Environment,
    Prompt,
}

/// A resolved value and its origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sourced {
    pub value: String,
    pub source: CredentialSource,
}

fn from_argument_or_env(argument: Option<String>, env_value: Option<&String>) -> Option<Sourced> {
    argument
        .filter(|value| !value.is_empty())
        .map(|value| Sourced {
            value,
            source: CredentialSource::Argument,
        })
        .or_else(|| {
            env_value.map(|value| Sourced {
                value: value.clone(),
                source: CredentialSource::Environment,
            })
        })
}

/// Non-interactive credentials for `auth`
///
/// # Errors
///
/// Returns `AuthError::MissingCredentials` naming the first value that is
/// neither an argument nor set in the environment
pub fn resolve_auth_credentials(
    username: Option<String>,
    password: Option<String>,
    client_credentials: bool,
    env: &EnvOverride,
) -> AuthResult<Credentials> {
    let (user_label, secret_label) = if client_credentials {
        ("client id", "client secret")
    } else {
        ("username", "password")
    };

    let username = from_argument_or_env(username, env.cf_username.as_ref()).ok_or(
        AuthError::MissingCredentials {
            what: user_label,
            env_var: env_constants::CF_USERNAME,
        },
    )?;
    let password = from_argument_or_env(password, env.cf_password.as_ref()).ok_or(
        AuthError::MissingCredentials {
            what: secret_label,
            env_var: env_constants::CF_PASSWORD,
        },
    )?;
    debug!(
        "Using {} from {:?} and {} from {:?}",
        user_label, username.source, secret_label, password.source
    );

    Ok(if client_credentials {
        Credentials::ClientCredentials {
            client_id: username.value,
            client_secret: password.value,
        }
    } else {
        Credentials::Password {
            username: username.value,
            password: password.value,
        }
    })
}

/// Whether prompting is possible
pub fn stdin_is_interactive() -> bool {
    atty::is(atty::Stream::Stdin)
}

/// Prompt for a visible value on stdout and read one line from stdin
pub fn prompt_line(label: &str) -> AuthResult<String> {
    print!("{label}> ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Prompt for a secret without echo
pub fn prompt_secret(label: &str) -> AuthResult<String> {
    let secret = rpassword::prompt_password(format!("{label}> "))?;
    Ok(secret)
}

/// Username for `login`: the flag, otherwise a prompt
///
/// # Errors
///
/// Returns `AuthError::MissingCredentials` when no flag was given and stdin
/// is not a terminal
pub fn login_username(flag: Option<String>) -> AuthResult<Sourced> {
    if let Some(value) = flag.filter(|v| !v.is_empty()) {
        return Ok(Sourced {
            value,
            source: CredentialSource::Argument,
        });
    }
    if !stdin_is_interactive() {
        return Err(AuthError::MissingCredentials {
            what: "username",
            env_var: env_constants::CF_USERNAME,
        });
    }
    Ok(Sourced {
        value: prompt_line("Email")?,
        source: CredentialSource::Prompt,
    })
}

/// Password for `login`: the flag, otherwise a hidden prompt
pub fn login_password(flag: Option<String>) -> AuthResult<Sourced> {
    if let Some(value) = flag {
        return Ok(Sourced {
            value,
            source: CredentialSource::Argument,
        });
    }
    if !stdin_is_interactive() {
        return Err(AuthError::MissingCredentials {
            what: "password",
            env_var: env_constants::CF_PASSWORD,
        });
    }
    Ok(Sourced {
        value: prompt_secret("Password")?,
        source: CredentialSource::Prompt,
    })
}
