//! Persisted session state
//!
//! [`SessionState`] is the single record the CLI keeps between invocations.
//! All changes go through the mutators below so the targeting invariants
//! hold no matter which command made the change:
//!
//! - a space can only be targeted while an organization is targeted
//! - changing the organization clears the space
//! - changing the backend endpoint clears organization and space

use serde::{Deserialize, Serialize};

use crate::constants::{auth, config};
use crate::errors::{RequirementError, TargetScope};

/// OAuth grant used to obtain the stored tokens
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrantType {
    /// Interactive user; refreshed with the stored refresh token
    #[default]
    #[serde(rename = "password", alias = "")]
    Password,

    /// Service account; re-authenticated with the stored client id and secret
    #[serde(rename = "client_credentials")]
    ClientCredentials,
}

/// Targeted organization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    #[serde(rename = "GUID", default)]
    pub guid: String,
    #[serde(rename = "Name", default)]
    pub name: String,
}

impl Organization {
    pub fn new(guid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            name: name.into(),
        }
    }

    pub fn is_set(&self) -> bool {
        !self.guid.is_empty()
    }
}

/// Targeted space
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
    #[serde(rename = "GUID", default)]
    pub guid: String,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "AllowSSH", default)]
    pub allow_ssh: bool,
}

impl Space {
    pub fn new(guid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            name: name.into(),
            allow_ssh: false,
        }
    }

    pub fn is_set(&self) -> bool {
        !self.guid.is_empty()
    }
}

/// Tokens issued by the identity service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSet {
    /// Full `Authorization` header value, e.g. `bearer eyJ...`
    pub access_token: String,
    /// `None` keeps the stored refresh token unchanged
    pub refresh_token: Option<String>,
}

/// Everything learned about a backend when it is targeted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetInfo {
    pub api: String,
    pub api_version: String,
    pub authorization_endpoint: String,
    pub uaa_endpoint: String,
    pub min_cli_version: String,
    pub skip_ssl_validation: bool,
}

/// The persisted record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    #[serde(rename = "ConfigVersion")]
    pub config_version: u32,

    /// Backend API endpoint, empty when unset
    #[serde(rename = "Target")]
    pub target: String,

    /// Last API version advertised by the target
    #[serde(rename = "APIVersion")]
    pub api_version: String,

    #[serde(rename = "AuthorizationEndpoint")]
    pub authorization_endpoint: String,

    #[serde(rename = "UaaEndpoint")]
    pub uaa_endpoint: String,

    #[serde(rename = "MinCLIVersion")]
    pub min_cli_version: String,

    #[serde(rename = "AccessToken")]
    pub access_token: String,

    #[serde(rename = "RefreshToken")]
    pub refresh_token: String,

    #[serde(rename = "UAAOAuthClient")]
    pub client_id: String,

    #[serde(rename = "UAAOAuthClientSecret")]
    pub client_secret: String,

    #[serde(rename = "UAAGrantType")]
    pub grant_type: GrantType,

    #[serde(rename = "OrganizationFields")]
    pub organization: Organization,

    #[serde(rename = "SpaceFields")]
    pub space: Space,

    #[serde(rename = "SSLDisabled")]
    pub skip_ssl_validation: bool,

    #[serde(rename = "Locale")]
    pub locale: String,

    #[serde(rename = "ColorEnabled", skip_serializing_if = "Option::is_none")]
    pub color_enabled: Option<bool>,

    #[serde(rename = "DialTimeout", skip_serializing_if = "Option::is_none")]
    pub dial_timeout_secs: Option<u64>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            config_version: config::CURRENT_VERSION,
            target: String::new(),
            api_version: String::new(),
            authorization_endpoint: String::new(),
            uaa_endpoint: String::new(),
            min_cli_version: String::new(),
            access_token: String::new(),
            refresh_token: String::new(),
            client_id: auth::DEFAULT_CLIENT_ID.to_string(),
            client_secret: auth::DEFAULT_CLIENT_SECRET.to_string(),
            grant_type: GrantType::Password,
            organization: Organization::default(),
            space: Space::default(),
            skip_ssl_validation: false,
            locale: String::new(),
            color_enabled: None,
            dial_timeout_secs: None,
        }
    }
}

impl SessionState {
    pub fn has_target(&self) -> bool {
        !self.target.is_empty()
    }

    /// Logged in means some token is available, possibly only a refresh token
    pub fn is_logged_in(&self) -> bool {
        !self.access_token.is_empty() || !self.refresh_token.is_empty()
    }

    pub fn has_organization(&self) -> bool {
        self.organization.is_set()
    }

    pub fn has_space(&self) -> bool {
        self.space.is_set()
    }

    /// Point the state at a backend. Organization and space are always
    /// cleared; tokens are cleared when the endpoint actually changes.
    pub fn set_target_information(&mut self, info: TargetInfo) {
        if self.target != info.api {
            self.unset_tokens();
        }
        self.target = info.api;
        self.api_version = info.api_version;
        self.authorization_endpoint = info.authorization_endpoint;
        self.uaa_endpoint = info.uaa_endpoint;
        self.min_cli_version = info.min_cli_version;
        self.skip_ssl_validation = info.skip_ssl_validation;
        self.unset_organization_and_space();
    }

    /// Forget the backend entirely. Preferences survive.
    pub fn unset_target_information(&mut self) {
        let preferences = (
            self.locale.clone(),
            self.color_enabled,
            self.dial_timeout_secs,
        );
        *self = Self::default();
        (self.locale, self.color_enabled, self.dial_timeout_secs) = preferences;
    }

    pub fn set_tokens(&mut self, tokens: TokenSet) {
        self.access_token = tokens.access_token;
        if let Some(refresh_token) = tokens.refresh_token {
            self.refresh_token = refresh_token;
        }
    }

    pub fn set_client_credentials(
        &mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) {
        self.client_id = client_id.into();
        self.client_secret = client_secret.into();
    }

    pub fn set_grant_type(&mut self, grant_type: GrantType) {
        self.grant_type = grant_type;
    }

    /// Target an organization; any targeted space belongs to the old one
    pub fn set_organization(&mut self, organization: Organization) {
        if self.organization.guid != organization.guid {
            self.space = Space::default();
        }
        self.organization = organization;
    }

    /// Target a space within the targeted organization
    pub fn set_space(&mut self, space: Space) -> Result<(), RequirementError> {
        if !self.has_organization() {
            return Err(RequirementError::TargetNotSet(TargetScope::Organization));
        }
        self.space = space;
        Ok(())
    }

    pub fn unset_space(&mut self) {
        self.space = Space::default();
    }

    pub fn unset_organization_and_space(&mut self) {
        self.organization = Organization::default();
        self.space = Space::default();
    }

    fn unset_tokens(&mut self) {
        self.access_token.clear();
        self.refresh_token.clear();
    }

    /// Logout: tokens, grant, client credentials and targeting are reset
    pub fn unset_user_information(&mut self) {
        self.unset_tokens();
        self.grant_type = GrantType::Password;
        self.client_id = auth::DEFAULT_CLIENT_ID.to_string();
        self.client_secret = auth::DEFAULT_CLIENT_SECRET.to_string();
        self.unset_organization_and_space();
    }

    /// The identity service refused to renew the session
    pub fn clear_rejected_session(&mut self) {
        self.unset_tokens();
        self.unset_organization_and_space();
    }

    /// Set the preferred locale; `CLEAR` removes the preference
    pub fn set_locale(&mut self, locale: &str) {
        if locale == config::CLEAR_LOCALE {
            self.locale.clear();
        } else {
            self.locale = locale.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targeted_state() -> SessionState {
        let mut state = SessionState::default();
        state.set_target_information(TargetInfo {
            api: "https://api.example.com".to_string(),
            ..Default::default()
        });
        state.set_tokens(TokenSet {
            access_token: "bearer access".to_string(),
            refresh_token: Some("refresh".to_string()),
        });
        state.set_organization(Organization::new("org-guid", "my-org"));
        state.set_space(Space::new("space-guid", "dev")).unwrap();
        state
    }

    #[test]
    fn test_default_state() {
        let state = SessionState::default();
        assert_eq!(state.config_version, 3);
        assert_eq!(state.client_id, "cf");
        assert_eq!(state.client_secret, "");
        assert_eq!(state.grant_type, GrantType::Password);
        assert!(!state.has_target());
        assert!(!state.is_logged_in());
    }

    #[test]
    fn test_space_requires_organization() {
        let mut state = SessionState::default();
        let result = state.set_space(Space::new("space-guid", "dev"));
        assert_eq!(
            result,
            Err(RequirementError::TargetNotSet(TargetScope::Organization))
        );
        assert!(!state.has_space());
    }

    #[test]
    fn test_changing_organization_clears_space() {
        let mut state = targeted_state();

        // Re-targeting the same org keeps the space
        state.set_organization(Organization::new("org-guid", "my-org"));
        assert!(state.has_space());

        state.set_organization(Organization::new("other-guid", "other-org"));
        assert!(!state.has_space());
        assert_eq!(state.organization.name, "other-org");
    }

    #[test]
    fn test_changing_target_clears_org_space_and_tokens() {
        let mut state = targeted_state();
        state.set_target_information(TargetInfo {
            api: "https://api.other.example.com".to_string(),
            ..Default::default()
        });

        assert!(!state.has_organization());
        assert!(!state.has_space());
        assert!(!state.is_logged_in());
    }

    #[test]
    fn test_retargeting_same_endpoint_keeps_tokens() {
        let mut state = targeted_state();
        state.set_target_information(TargetInfo {
            api: "https://api.example.com".to_string(),
            api_version: "3.85.0".to_string(),
            ..Default::default()
        });

        assert!(state.is_logged_in());
        assert!(!state.has_organization());
        assert_eq!(state.api_version, "3.85.0");
    }

    #[test]
    fn test_refresh_token_alone_counts_as_logged_in() {
        let mut state = SessionState::default();
        state.refresh_token = "refresh".to_string();
        assert!(state.is_logged_in());
    }

    #[test]
    fn test_set_tokens_keeps_refresh_token_when_absent() {
        let mut state = targeted_state();
        state.set_tokens(TokenSet {
            access_token: "bearer new".to_string(),
            refresh_token: None,
        });
        assert_eq!(state.access_token, "bearer new");
        assert_eq!(state.refresh_token, "refresh");
    }

    #[test]
    fn test_unset_user_information() {
        let mut state = targeted_state();
        state.set_grant_type(GrantType::ClientCredentials);
        state.set_client_credentials("my-client", "my-secret");

        state.unset_user_information();

        assert!(!state.is_logged_in());
        assert_eq!(state.grant_type, GrantType::Password);
        assert_eq!(state.client_id, "cf");
        assert_eq!(state.client_secret, "");
        assert!(!state.has_organization());
        assert!(state.has_target());
    }

    #[test]
    fn test_unset_target_keeps_preferences() {
        let mut state = targeted_state();
        state.set_locale("fr-FR");
        state.color_enabled = Some(false);
        state.dial_timeout_secs = Some(9);

        state.unset_target_information();

        assert!(!state.has_target());
        assert!(!state.is_logged_in());
        assert_eq!(state.locale, "fr-FR");
        assert_eq!(state.color_enabled, Some(false));
        assert_eq!(state.dial_timeout_secs, Some(9));
    }

    #[test]
    fn test_locale_clear() {
        let mut state = SessionState::default();
        state.set_locale("ja-JP");
        assert_eq!(state.locale, "ja-JP");
        state.set_locale("CLEAR");
        assert_eq!(state.locale, "");
    }

    #[test]
    fn test_json_field_names() {
        let state = targeted_state();
        let json = serde_json::to_value(&state).unwrap();

        assert_eq!(json["Target"], "https://api.example.com");
        assert_eq!(json["AccessToken"], "bearer access");
        assert_eq!(json["UAAOAuthClient"], "cf");
        assert_eq!(json["UAAGrantType"], "password");
        assert_eq!(json["OrganizationFields"]["GUID"], "org-guid");
        assert_eq!(json["SpaceFields"]["Name"], "dev");
        assert!(json.get("ColorEnabled").is_none());
    }

    #[test]
    fn test_legacy_empty_grant_type_is_password() {
        let json = r#"{"Target": "https://api.example.com", "UAAGrantType": ""}"#;
        let state: SessionState = serde_json::from_str(json).unwrap();
        assert_eq!(state.grant_type, GrantType::Password);
        // Missing fields take defaults
        assert_eq!(state.client_id, "cf");

        let json = r#"{"UAAGrantType": "client_credentials"}"#;
        let state: SessionState = serde_json::from_str(json).unwrap();
        assert_eq!(state.grant_type, GrantType::ClientCredentials);
    }
}
