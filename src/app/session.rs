//! Per-process authenticated session
//!
//! [`AuthenticatedSession`] is the one context object every command works
//! through. It owns the loaded [`SessionState`], the [`ConfigStore`] it came
//! from and the HTTP clients, and it is the only place tokens are renewed.
//!
//! Each call to [`AuthenticatedSession::execute`] runs a two-step state
//! machine: send with the current token; on an invalid-token answer renew
//! once, checkpoint the new tokens to disk, then send again. A second
//! invalid-token answer ends the call with a credentials error.

use semver::Version;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use url::Url;

use crate::app::client::{
    ApiRequest, ApiResponse, ClientConfig, Credentials, HttpHandler, RequestOutcome, RootInfo,
    TokenRefresher,
};
use crate::config::{ConfigStore, EnvOverride, SessionState};
use crate::errors::{
    AppError, AuthError, AuthResult, ConfigError, NetworkError, RequirementError, Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    Initial,
    AfterRefresh,
}

/// Session state plus everything needed to talk to the target
#[derive(Debug)]
pub struct AuthenticatedSession {
    store: ConfigStore,
    state: SessionState,
    env: EnvOverride,
    http: HttpHandler,
    refresher: TokenRefresher,
    root_info: Option<RootInfo>,
    warnings: Vec<String>,
    write_failures: Vec<ConfigError>,
}

impl AuthenticatedSession {
    /// Creates a session over already loaded state
    ///
    /// # Errors
    ///
    /// Returns `NetworkError::ClientBuild` if the HTTP client cannot be built
    pub fn new(store: ConfigStore, state: SessionState, env: EnvOverride) -> Result<Self> {
        let http = ClientConfig::from_session(&state, &env).build_handler()?;
        let refresher = TokenRefresher::new(http.clone());
        Ok(Self {
            store,
            state,
            env,
            http,
            refresher,
            root_info: None,
            warnings: Vec::new(),
            write_failures: Vec::new(),
        })
    }

    /// Locate the state file from the environment, load it and create a session
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the state file cannot be located, read or parsed
    pub fn open(env: EnvOverride) -> Result<Self> {
        let store = ConfigStore::locate(&env)?;
        let state = store.load()?;
        debug!("Loaded session state from {}", store.path().display());
        Self::new(store, state, env)
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Mutable access for commands; call [`checkpoint`](Self::checkpoint) afterwards
    pub fn state_mut(&mut self) -> &mut SessionState {
        &mut self.state
    }

    pub fn env(&self) -> &EnvOverride {
        &self.env
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn http(&self) -> &HttpHandler {
        &self.http
    }

    pub fn refresher(&self) -> &TokenRefresher {
        &self.refresher
    }

    /// Rebuild the HTTP clients after the SSL or timeout preferences changed
    pub fn reconfigure_client(&mut self) -> Result<()> {
        self.http = ClientConfig::from_session(&self.state, &self.env).build_handler()?;
        self.refresher = TokenRefresher::new(self.http.clone());
        Ok(())
    }

    /// Persist the current state. A failure is recorded, not returned: the
    /// in-memory change it was persisting still stands.
    pub fn checkpoint(&mut self) {
        if let Err(e) = self.store.save(&self.state) {
            warn!("Failed to persist session state: {}", e);
            self.write_failures.push(e);
        }
    }

    /// Persistence failures seen so far
    pub fn write_failures(&self) -> &[ConfigError] {
        &self.write_failures
    }

    /// Drain backend warnings collected from responses
    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }

    /// The targeted API endpoint
    ///
    /// # Errors
    ///
    /// Returns `RequirementError::NoApiEndpoint` when nothing is targeted
    pub fn api_url(&self) -> Result<Url> {
        if !self.state.has_target() {
            return Err(RequirementError::NoApiEndpoint.into());
        }
        parse_url(&self.state.target)
    }

    /// Resolve `path` (which may carry a query string) against the target
    pub fn url_for(&self, path: &str) -> Result<Url> {
        let base = self.state.target.trim_end_matches('/');
        if base.is_empty() {
            return Err(RequirementError::NoApiEndpoint.into());
        }
        if path.starts_with("http://") || path.starts_with("https://") {
            return parse_url(path);
        }
        let separator = if path.starts_with('/') { "" } else { "/" };
        parse_url(&format!("{base}{separator}{path}"))
    }

    /// Root document of the target, fetched at most once per process
    pub async fn root_info(&mut self) -> Result<RootInfo> {
        if let Some(info) = &self.root_info {
            return Ok(info.clone());
        }
        let api = self.api_url()?;
        let info = RootInfo::fetch(&self.http, &api).await?;
        self.root_info = Some(info.clone());
        Ok(info)
    }

    /// Probe `api` (not necessarily the current target) and cache the answer
    pub async fn probe(&mut self, api: &Url) -> Result<RootInfo> {
        let info = RootInfo::fetch(&self.http, api).await?;
        self.root_info = Some(info.clone());
        Ok(info)
    }

    /// API version advertised by the target; `None` when missing or unparsable
    pub async fn api_version(&mut self) -> Result<Option<Version>> {
        let info = self.root_info().await?;
        let advertised = info.api_version_text();
        if !advertised.is_empty() && advertised != self.state.api_version {
            self.state.api_version = advertised;
        }
        Ok(info.api_version())
    }

    /// Send `request` with the stored access token, renewing it at most once
    ///
    /// Business errors come back as a normal [`ApiResponse`] for the caller to
    /// interpret.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenRejected` if the backend rejects the renewed
    /// token as well, the refresh error if renewal fails, and a network error
    /// if nothing came back
    pub async fn execute(&mut self, request: ApiRequest) -> Result<ApiResponse> {
        let mut attempt = Attempt::Initial;
        loop {
            let outcome = if self.state.access_token.is_empty() {
                debug!("No access token stored, renewing before first request");
                None
            } else {
                Some(
                    self.http
                        .send(&request, Some(self.state.access_token.as_str()))
                        .await,
                )
            };

            match outcome {
                Some(RequestOutcome::Success(response)) => {
                    self.warnings.extend(response.warnings.iter().cloned());
                    return Ok(response);
                }
                Some(RequestOutcome::TerminalFailure(e)) => return Err(e.into()),
                Some(RequestOutcome::RetryableAuthFailure(response)) => {
                    self.warnings.extend(response.warnings.iter().cloned());
                }
                None => {}
            }

            match attempt {
                Attempt::Initial => {
                    self.refresh_access_token().await?;
                    attempt = Attempt::AfterRefresh;
                }
                Attempt::AfterRefresh => {
                    warn!("Backend rejected the renewed access token");
                    return Err(AuthError::TokenRejected.into());
                }
            }
        }
    }

    /// `execute` a GET and decode a successful JSON body
    pub async fn get_json<T: DeserializeOwned>(&mut self, url: Url) -> Result<T> {
        let response = self.execute(ApiRequest::get(url)).await?;
        Ok(response.error_for_status()?.json()?)
    }

    /// Renew the access token and persist it before returning
    ///
    /// When the identity service refuses the renewal the stored tokens and
    /// targeting are cleared, so the user has to log in again.
    ///
    /// # Errors
    ///
    /// Returns the refresher's error unchanged
    pub async fn refresh_access_token(&mut self) -> AuthResult<()> {
        match self.refresher.refresh(&self.state).await {
            Ok(tokens) => {
                info!("Access token renewed");
                self.state.set_tokens(tokens);
                self.checkpoint();
                Ok(())
            }
            Err(e @ (AuthError::TokenRejected | AuthError::CredentialsRejected)) => {
                warn!("Identity service refused to renew the session");
                self.state.clear_rejected_session();
                self.checkpoint();
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Log in, replacing whatever session was active
    ///
    /// Organization and space targeting is cleared and persisted before the
    /// identity service is contacted, so a rejected login leaves nothing
    /// targeted.
    pub async fn authenticate(&mut self, credentials: &Credentials) -> AuthResult<()> {
        self.state.unset_organization_and_space();
        self.checkpoint();

        let mut candidate = self.state.clone();
        if let Credentials::ClientCredentials {
            client_id,
            client_secret,
        } = credentials
        {
            candidate.set_client_credentials(client_id.as_str(), client_secret.as_str());
        }

        let tokens = self.refresher.authenticate(&candidate, credentials).await?;

        match credentials {
            Credentials::Password { .. } => {
                self.state.unset_user_information();
            }
            Credentials::ClientCredentials {
                client_id,
                client_secret,
            } => {
                self.state.unset_user_information();
                self.state
                    .set_client_credentials(client_id.as_str(), client_secret.as_str());
            }
        }
        self.state.set_grant_type(credentials.grant_type());
        self.state.set_tokens(tokens);
        self.checkpoint();
        Ok(())
    }
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| {
        AppError::from(NetworkError::InvalidUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn session_with_target(target: &str) -> (TempDir, AuthenticatedSession) {
        let temp_dir = TempDir::new().unwrap();
        let store = ConfigStore::new(temp_dir.path().join("config.json"));
        let state = SessionState {
            target: target.to_string(),
            ..Default::default()
        };
        let session = AuthenticatedSession::new(store, state, EnvOverride::default()).unwrap();
        (temp_dir, session)
    }

    #[test]
    fn test_url_for() {
        let (_dir, session) = session_with_target("https://api.example.com/");
        assert_eq!(
            session.url_for("/v3/apps?names=web").unwrap().as_str(),
            "https://api.example.com/v3/apps?names=web"
        );
        assert_eq!(
            session.url_for("v3/spaces").unwrap().as_str(),
            "https://api.example.com/v3/spaces"
        );
        assert_eq!(
            session
                .url_for("https://api.example.com/v3/apps?page=2")
                .unwrap()
                .as_str(),
            "https://api.example.com/v3/apps?page=2"
        );
    }

    #[test]
    fn test_url_for_without_target() {
        let (_dir, session) = session_with_target("");
        let err = session.url_for("/v3/apps").unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::NoApiEndpoint);
    }

    #[test]
    fn test_checkpoint_failure_is_recorded() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join(".cf");
        std::fs::write(&blocker, "file, not a directory").unwrap();

        let store = ConfigStore::new(blocker.join("config.json"));
        let mut session =
            AuthenticatedSession::new(store, SessionState::default(), EnvOverride::default())
                .unwrap();

        session.state_mut().set_locale("de-DE");
        session.checkpoint();

        assert_eq!(session.write_failures().len(), 1);
        // The in-memory change stands
        assert_eq!(session.state().locale, "de-DE");
    }
}
