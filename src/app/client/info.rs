//! Unauthenticated root endpoint probe
//!
//! `GET /` on the backend advertises its API versions and where its identity
//! service lives. Nothing here needs a token.

use semver::Version;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::app::client::http::{ApiRequest, HttpHandler, RequestOutcome};
use crate::config::TargetInfo;
use crate::errors::{ApiError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LinkMeta {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub min_cli_version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Link {
    #[serde(default)]
    pub href: String,
    #[serde(default)]
    pub meta: LinkMeta,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RootLinks {
    #[serde(default)]
    pub cloud_controller_v2: Option<Link>,
    #[serde(default)]
    pub cloud_controller_v3: Option<Link>,
    #[serde(default)]
    pub login: Option<Link>,
    #[serde(default)]
    pub uaa: Option<Link>,
}

/// What the backend says about itself
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RootInfo {
    #[serde(default)]
    pub links: RootLinks,
}

impl RootInfo {
    /// Fetch the root document of `api`
    ///
    /// # Errors
    ///
    /// Returns a network error when the endpoint cannot be reached and an API
    /// error when it answers with something other than a root document
    pub async fn fetch(http: &HttpHandler, api: &Url) -> Result<Self> {
        debug!("Probing root endpoint {}", api);
        let response = match http.send(&ApiRequest::get(api.clone()), None).await {
            RequestOutcome::Success(response) | RequestOutcome::RetryableAuthFailure(response) => {
                response
            }
            RequestOutcome::TerminalFailure(e) => return Err(e.into()),
        };

        let info: RootInfo = response.error_for_status()?.json()?;
        if info.links.cloud_controller_v3.is_none() && info.links.cloud_controller_v2.is_none() {
            return Err(ApiError::InvalidResponse {
                url: api.to_string(),
                reason: "not a Cloud Foundry API endpoint".to_string(),
            }
            .into());
        }
        Ok(info)
    }

    /// Advertised API version as text, empty when not advertised
    pub fn api_version_text(&self) -> String {
        self.links
            .cloud_controller_v3
            .as_ref()
            .and_then(|link| link.meta.version.clone())
            .unwrap_or_default()
    }

    /// Advertised API version; `None` when missing or not semver
    pub fn api_version(&self) -> Option<Version> {
        parse_lenient(&self.api_version_text())
    }

    pub fn min_cli_version(&self) -> Option<Version> {
        self.links
            .cloud_controller_v2
            .as_ref()
            .and_then(|link| link.meta.min_cli_version.as_deref())
            .and_then(parse_lenient)
    }

    /// Identity service endpoint, preferring the token issuer over the login server
    pub fn uaa_endpoint(&self) -> String {
        self.links
            .uaa
            .as_ref()
            .or(self.links.login.as_ref())
            .map(|link| link.href.clone())
            .unwrap_or_default()
    }

    pub fn authorization_endpoint(&self) -> String {
        self.links
            .login
            .as_ref()
            .or(self.links.uaa.as_ref())
            .map(|link| link.href.clone())
            .unwrap_or_default()
    }

    /// Everything the session state records when this backend is targeted
    pub fn target_info(&self, api: &str, skip_ssl_validation: bool) -> TargetInfo {
        TargetInfo {
            api: api.to_string(),
            api_version: self.api_version_text(),
            authorization_endpoint: self.authorization_endpoint(),
            uaa_endpoint: self.uaa_endpoint(),
            min_cli_version: self
                .min_cli_version()
                .map(|v| v.to_string())
                .unwrap_or_default(),
            skip_ssl_validation,
        }
    }
}

/// Accept `3.85` as well as `3.85.0`
pub fn parse_lenient(raw: &str) -> Option<Version> {
    let raw = raw.trim().trim_start_matches('v');
    if raw.is_empty() {
        return None;
    }
    Version::parse(raw)
        .ok()
        .or_else(|| Version::parse(&format!("{raw}.0")).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use httpmock::prelude::*;
    use reqwest::Client;
    use serde_json::json;

    fn root_document(base: &str) -> serde_json::Value {
        json!({
            "links": {
                "self": {"href": base},
                "cloud_controller_v2": {
                    "href": format!("{base}/v2"),
                    "meta": {"version": "2.150.0", "min_cli_version": "6.22.0"}
                },
                "cloud_controller_v3": {
                    "href": format!("{base}/v3"),
                    "meta": {"version": "3.85.0"}
                },
                "login": {"href": "https://login.example.com"},
                "uaa": {"href": "https://uaa.example.com"}
            }
        })
    }

    #[test]
    fn test_parse_root_document() {
        let info: RootInfo =
            serde_json::from_value(root_document("https://api.example.com")).unwrap();

        assert_eq!(info.api_version(), Some(Version::new(3, 85, 0)));
        assert_eq!(info.min_cli_version(), Some(Version::new(6, 22, 0)));
        assert_eq!(info.uaa_endpoint(), "https://uaa.example.com");
        assert_eq!(info.authorization_endpoint(), "https://login.example.com");

        let target = info.target_info("https://api.example.com", true);
        assert_eq!(target.api_version, "3.85.0");
        assert!(target.skip_ssl_validation);
    }

    #[test]
    fn test_missing_version() {
        let info: RootInfo = serde_json::from_value(json!({
            "links": {"cloud_controller_v3": {"href": "https://api.example.com/v3"}}
        }))
        .unwrap();
        assert_eq!(info.api_version(), None);
        assert_eq!(info.api_version_text(), "");
    }

    #[test]
    fn test_parse_lenient() {
        assert_eq!(parse_lenient("3.11"), Some(Version::new(3, 11, 0)));
        assert_eq!(parse_lenient("v3.11.2"), Some(Version::new(3, 11, 2)));
        assert_eq!(parse_lenient("banana"), None);
        assert_eq!(parse_lenient(""), None);
    }

    #[tokio::test]
    async fn test_fetch_root_info() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/");
            then.status(200).json_body(root_document(&server.base_url()));
        });

        let http = HttpHandler::new(
            Client::new(),
            Duration::from_secs(5),
            Duration::from_secs(60),
        );
        let api = Url::parse(&server.base_url()).unwrap();
        let info = RootInfo::fetch(&http, &api).await.unwrap();

        assert_eq!(info.api_version_text(), "3.85.0");
        mock.assert_calls(1);
    }

    #[tokio::test]
    async fn test_fetch_rejects_non_api_document() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/");
            then.status(200).json_body(json!({"hello": "world"}));
        });

        let http = HttpHandler::new(
            Client::new(),
            Duration::from_secs(5),
            Duration::from_secs(60),
        );
        let api = Url::parse(&server.base_url()).unwrap();
        assert!(RootInfo::fetch(&http, &api).await.is_err());
    }
}
