//! Environment variable overrides
//!
//! The environment is read once at startup into an [`EnvOverride`] and then
//! passed around explicitly, so precedence rules can be tested without
//! touching the process environment.

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::config::state::SessionState;
use crate::constants::{config, env, http};

/// Snapshot of the environment variables the CLI honours
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverride {
    pub cf_home: Option<PathBuf>,
    pub cf_color: Option<String>,
    pub cf_dial_timeout: Option<String>,
    pub cf_trace: Option<String>,
    pub cf_username: Option<String>,
    pub cf_password: Option<String>,
    pub lc_all: Option<String>,
    pub lang: Option<String>,
}

impl EnvOverride {
    /// Read the process environment. Empty values count as unset.
    pub fn from_env() -> Self {
        let read = |name: &str| std::env::var(name).ok().filter(|value| !value.is_empty());
        Self {
            cf_home: read(env::CF_HOME).map(PathBuf::from),
            cf_color: read(env::CF_COLOR),
            cf_dial_timeout: read(env::CF_DIAL_TIMEOUT),
            cf_trace: read(env::CF_TRACE),
            cf_username: read(env::CF_USERNAME),
            cf_password: read(env::CF_PASSWORD),
            lc_all: read(env::LC_ALL),
            lang: read(env::LANG),
        }
    }

    /// `CF_COLOR`, then the persisted preference, then whether stdout is a terminal
    pub fn color_enabled(&self, state: &SessionState, stdout_is_tty: bool) -> bool {
        if let Some(value) = self.cf_color.as_deref().and_then(parse_bool) {
            return value;
        }
        state.color_enabled.unwrap_or(stdout_is_tty)
    }

    /// `CF_DIAL_TIMEOUT` (whole seconds), then the persisted value, then the default
    pub fn dial_timeout(&self, state: &SessionState) -> Duration {
        if let Some(raw) = &self.cf_dial_timeout {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => return Duration::from_secs(secs),
                _ => warn!(
                    "Ignoring {}={}: expected a positive number of seconds",
                    env::CF_DIAL_TIMEOUT,
                    raw
                ),
            }
        }
        match state.dial_timeout_secs {
            Some(secs) if secs > 0 => Duration::from_secs(secs),
            _ => http::DEFAULT_DIAL_TIMEOUT,
        }
    }

    pub fn trace_enabled(&self) -> bool {
        self.cf_trace
            .as_deref()
            .and_then(parse_bool)
            .unwrap_or(false)
    }

    /// Persisted locale, then `LC_ALL`, then `LANG`. Anything that does not
    /// resolve to a supported locale falls back to the default.
    pub fn locale(&self, state: &SessionState) -> String {
        let candidates = [
            Some(state.locale.as_str()).filter(|l| !l.is_empty()),
            self.lc_all.as_deref(),
            self.lang.as_deref(),
        ];

        candidates
            .into_iter()
            .flatten()
            .next()
            .and_then(normalize_locale)
            .unwrap_or_else(|| config::DEFAULT_LOCALE.to_string())
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "t" | "yes" => Some(true),
        "false" | "0" | "f" | "no" => Some(false),
        _ => None,
    }
}

/// Map POSIX-style locale strings (`fr_FR.UTF-8`) onto a supported locale tag
pub fn normalize_locale(raw: &str) -> Option<String> {
    let tag = raw
        .split(['.', '@'])
        .next()
        .unwrap_or_default()
        .replace('_', "-");
    if tag.is_empty() {
        return None;
    }

    if let Some(exact) = config::SUPPORTED_LOCALES
        .iter()
        .find(|supported| supported.eq_ignore_ascii_case(&tag))
    {
        return Some(exact.to_string());
    }

    let mut parts = tag.splitn(2, '-');
    let language = parts.next().unwrap_or_default().to_ascii_lowercase();
    let region = parts.next().map(|r| r.to_ascii_uppercase());

    if language == "zh" {
        let script = match region.as_deref() {
            Some("TW") | Some("HK") | Some("MO") | Some("HANT") => "zh-Hant",
            _ => "zh-Hans",
        };
        return Some(script.to_string());
    }

    config::SUPPORTED_LOCALES
        .iter()
        .find(|supported| supported.split('-').next() == Some(language.as_str()))
        .map(|supported| supported.to_string())
}
