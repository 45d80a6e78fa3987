//! Identity service token operations
//!
//! [`TokenRefresher`] talks to the OAuth token endpoint of the identity
//! service. It obtains tokens for the three grants the CLI uses: password
//! login, client-credentials login and refresh. It never touches persisted
//! state itself; callers apply the returned [`TokenSet`] and checkpoint it.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use crate::app::client::http::{endpoint_of, HttpHandler};
use crate::config::{GrantType, SessionState, TokenSet};
use crate::constants::auth;
use crate::errors::{AuthError, AuthResult, NetworkError};

/// Credentials accepted by the identity service
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Password { username: String, password: String },
    ClientCredentials { client_id: String, client_secret: String },
}

impl Credentials {
    pub fn grant_type(&self) -> GrantType {
        match self {
            Credentials::Password { .. } => GrantType::Password,
            Credentials::ClientCredentials { .. } => GrantType::ClientCredentials,
        }
    }

    /// Name to show the user while authenticating
    pub fn identity(&self) -> &str {
        match self {
            Credentials::Password { username, .. } => username,
            Credentials::ClientCredentials { client_id, .. } => client_id,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("grant_type", &self.grant_type())
            .field("identity", &self.identity())
            .field("secret", &auth::REDACTED)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Obtains and renews tokens from the identity service
#[derive(Debug, Clone)]
pub struct TokenRefresher {
    http: HttpHandler,
}

impl TokenRefresher {
    pub fn new(http: HttpHandler) -> Self {
        Self { http }
    }

    /// Log in with the given credentials
    ///
    /// Password logins use the OAuth client stored in `state`; client
    /// credentials authenticate as themselves.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::CredentialsRejected` when the identity service
    /// refuses the credentials, `AuthError::Network` when it cannot be reached
    pub async fn authenticate(
        &self,
        state: &SessionState,
        credentials: &Credentials,
    ) -> AuthResult<TokenSet> {
        info!(
            "Authenticating {} with {:?} grant",
            credentials.identity(),
            credentials.grant_type()
        );

        match credentials {
            Credentials::Password { username, password } => {
                let form = [
                    ("grant_type", "password"),
                    ("username", username.as_str()),
                    ("password", password.as_str()),
                    ("scope", ""),
                ];
                self.request_token(
                    state,
                    &form,
                    (state.client_id.as_str(), state.client_secret.as_str()),
                    AuthError::CredentialsRejected,
                )
                .await
            }
            Credentials::ClientCredentials {
                client_id,
                client_secret,
            } => self.client_credentials(state, client_id, client_secret).await,
        }
    }

    /// Renew the access token using whatever the stored grant type allows
    ///
    /// Password sessions exchange the refresh token; client-credentials
    /// sessions authenticate again with the stored client id and secret.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenRejected` when a refresh token is missing or
    /// refused, `AuthError::CredentialsRejected` when stored client
    /// credentials are refused, `AuthError::Network` on transport failure
    pub async fn refresh(&self, state: &SessionState) -> AuthResult<TokenSet> {
        match state.grant_type {
            GrantType::Password => {
                if state.refresh_token.is_empty() {
                    debug!("No refresh token stored, cannot renew session");
                    return Err(AuthError::TokenRejected);
                }
                debug!("Refreshing access token");
                let form = [
                    ("grant_type", "refresh_token"),
                    ("refresh_token", state.refresh_token.as_str()),
                    ("scope", ""),
                ];
                self.request_token(
                    state,
                    &form,
                    (state.client_id.as_str(), state.client_secret.as_str()),
                    AuthError::TokenRejected,
                )
                .await
            }
            GrantType::ClientCredentials => {
                if state.client_id.is_empty() {
                    return Err(AuthError::CredentialsRejected);
                }
                debug!("Re-authenticating client {}", state.client_id);
                self.client_credentials(state, &state.client_id, &state.client_secret)
                    .await
            }
        }
    }

    async fn client_credentials(
        &self,
        state: &SessionState,
        client_id: &str,
        client_secret: &str,
    ) -> AuthResult<TokenSet> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ];
        self.request_token(
            state,
            &form,
            (client_id, client_secret),
            AuthError::CredentialsRejected,
        )
        .await
    }

    async fn request_token(
        &self,
        state: &SessionState,
        form: &[(&str, &str)],
        (client_id, client_secret): (&str, &str),
        rejection: AuthError,
    ) -> AuthResult<TokenSet> {
        let url = token_url(state)?;
        debug!("POST {} (form body {})", url, auth::REDACTED);

        let response = self
            .http
            .client()
            .post(url.clone())
            .basic_auth(client_id, Some(client_secret))
            .header(reqwest::header::ACCEPT, "application/json")
            .form(form)
            .send()
            .await
            .map_err(|e| self.http.network_error(&e, &url))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.http.network_error(&e, &url))?;
        debug!("Token endpoint answered {}", status);

        if status.is_server_error() {
            return Err(NetworkError::EndpointUnavailable {
                endpoint: endpoint_of(&url),
                status: status.as_u16(),
            }
            .into());
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::BAD_REQUEST {
            return Err(rejection);
        }

        let value: Value =
            serde_json::from_str(&body).map_err(|e| AuthError::InvalidTokenResponse {
                reason: e.to_string(),
            })?;

        if !status.is_success() || value.get("error").is_some() {
            return Err(AuthError::Uaa {
                description: error_description(&value, status),
            });
        }

        let token: TokenResponse =
            serde_json::from_value(value).map_err(|e| AuthError::InvalidTokenResponse {
                reason: e.to_string(),
            })?;
        if let Some(expires_in) = token.expires_in {
            debug!("Access token valid for {}s", expires_in);
        }

        let token_type = token.token_type.unwrap_or_else(|| "bearer".to_string());
        Ok(TokenSet {
            access_token: format!("{} {}", token_type, token.access_token),
            refresh_token: token.refresh_token,
        })
    }
}

/// Token endpoint for the targeted identity service
fn token_url(state: &SessionState) -> AuthResult<Url> {
    let base = [&state.uaa_endpoint, &state.authorization_endpoint]
        .into_iter()
        .find(|endpoint| !endpoint.is_empty())
        .ok_or_else(|| AuthError::NoAuthorizationEndpoint {
            target: state.target.clone(),
        })?;

    let raw = format!("{}{}", base.trim_end_matches('/'), auth::TOKEN_PATH);
    Url::parse(&raw).map_err(|e| {
        AuthError::Network(NetworkError::InvalidUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })
    })
}

fn error_description(value: &Value, status: StatusCode) -> String {
    let error = &value["error"];
    let description = value["error_description"]
        .as_str()
        .or_else(|| error["message"].as_str())
        .or_else(|| error.as_str());
    match description {
        Some(text) => text.to_string(),
        None => format!("Authentication server returned HTTP {}", status.as_u16()),
    }
}
