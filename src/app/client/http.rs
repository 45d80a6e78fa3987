//! Core HTTP operations and response classification
//!
//! [`HttpHandler::send`] performs exactly one attempt and classifies what came
//! back. It never retries on its own: whether an authentication failure is
//! worth a token refresh is decided by the session that owns the tokens.

use std::error::Error as StdError;
use std::time::Duration;

use reqwest::header::{HeaderMap, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::constants::{auth, http};
use crate::errors::{ApiError, ApiResult, NetworkError};

/// A request that can be sent more than once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// A fully read response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    /// Decoded `X-Cf-Warnings` entries
    pub warnings: Vec<String>,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> ApiResult<T> {
        serde_json::from_str(&self.body).map_err(|e| ApiError::InvalidResponse {
            url: self.url.clone(),
            reason: e.to_string(),
        })
    }

    /// Turn a non-2xx response into the backend's own error description
    pub fn error_for_status(self) -> ApiResult<Self> {
        if self.is_success() {
            return Ok(self);
        }
        let (code, description) = parse_error_body(&self.body);
        Err(ApiError::Http {
            status: self.status,
            code,
            description,
        })
    }

    /// 401 whose body says the bearer token itself is no good
    pub fn is_invalid_token(&self) -> bool {
        self.status == 401 && body_signals_invalid_token(&self.body)
    }
}

/// What a single attempt produced
#[derive(Debug)]
pub enum RequestOutcome {
    /// Any response that does not signal an invalid token, including
    /// business errors for the caller to interpret
    Success(ApiResponse),
    /// The backend rejected the access token; a refresh may help
    RetryableAuthFailure(ApiResponse),
    /// Nothing usable came back
    TerminalFailure(NetworkError),
}

/// Sends requests with the shared client
#[derive(Debug, Clone)]
pub struct HttpHandler {
    client: Client,
    dial_timeout: Duration,
    request_timeout: Duration,
}

impl HttpHandler {
    /// Creates a new HttpHandler
    ///
    /// # Arguments
    ///
    /// * `client` - The HTTP client to use for requests
    /// * `dial_timeout` - Connect timeout the client was built with, reported in errors
    /// * `request_timeout` - Whole-request timeout the client was built with
    pub fn new(client: Client, dial_timeout: Duration, request_timeout: Duration) -> Self {
        Self {
            client,
            dial_timeout,
            request_timeout,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Send one attempt, with `authorization` as the verbatim header value
    pub async fn send(&self, request: &ApiRequest, authorization: Option<&str>) -> RequestOutcome {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone());
        if let Some(token) = authorization.filter(|t| !t.is_empty()) {
            builder = builder.header(AUTHORIZATION, token);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            let has_content_type = request
                .headers
                .iter()
                .any(|(name, _)| name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()));
            if !has_content_type {
                builder = builder.header(CONTENT_TYPE, "application/json");
            }
            builder = builder.body(body.clone());
        }

        let mut sent_headers = request.headers.clone();
        if let Some(token) = authorization.filter(|t| !t.is_empty()) {
            sent_headers.push((AUTHORIZATION.to_string(), token.to_string()));
        }
        debug!(
            "REQUEST: {} {} headers=[{}]",
            request.method,
            request.url,
            redacted_headers(&sent_headers)
        );

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => return RequestOutcome::TerminalFailure(self.network_error(&e, &request.url)),
        };

        let status = response.status().as_u16();
        let headers = header_pairs(response.headers());
        let warnings = parse_warnings(response.headers());
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return RequestOutcome::TerminalFailure(self.network_error(&e, &request.url)),
        };

        debug!(
            "RESPONSE: {} {} ({} bytes) headers=[{}]",
            status,
            request.url,
            body.len(),
            redacted_headers(&headers)
        );

        let response = ApiResponse {
            url: request.url.to_string(),
            status,
            headers,
            body,
            warnings,
        };

        if response.is_invalid_token() {
            debug!("Backend rejected the access token");
            RequestOutcome::RetryableAuthFailure(response)
        } else {
            RequestOutcome::Success(response)
        }
    }

    /// Classify a transport failure, keeping the endpoint and timeout for the message
    pub fn network_error(&self, error: &reqwest::Error, url: &Url) -> NetworkError {
        let endpoint = endpoint_of(url);

        if error.is_timeout() {
            return if error.is_connect() {
                NetworkError::Timeout {
                    endpoint,
                    timeout_secs: self.dial_timeout.as_secs(),
                }
            } else {
                NetworkError::ResponseTimeout {
                    endpoint,
                    timeout_secs: self.request_timeout.as_secs(),
                }
            };
        }

        let reason = error_chain(error);
        if reason.to_ascii_lowercase().contains("certificate") {
            return NetworkError::InvalidSslCert {
                host: url.host_str().unwrap_or_default().to_string(),
            };
        }

        NetworkError::Unreachable { endpoint, reason }
    }
}

/// Scheme, host and port of a URL
pub fn endpoint_of(url: &Url) -> String {
    url.origin().ascii_serialization()
}

fn error_chain(error: &reqwest::Error) -> String {
    let mut parts = vec![error.to_string()];
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if parts.last() != Some(&text) {
            parts.push(text);
        }
        source = cause.source();
    }
    parts.join(": ")
}

/// `name: value` pairs for logging, with credentials hidden
pub fn redacted_headers(headers: &[(String, String)]) -> String {
    headers
        .iter()
        .map(|(name, value)| {
            if name.eq_ignore_ascii_case(AUTHORIZATION.as_str()) {
                format!("{}: {}", name, auth::REDACTED)
            } else {
                format!("{}: {}", name, value)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn header_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}

/// Split and unescape `X-Cf-Warnings`
pub fn parse_warnings(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(http::WARNINGS_HEADER)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|warning| !warning.is_empty())
        .map(|warning| {
            let query = format!("w={warning}");
            url::form_urlencoded::parse(query.as_bytes())
                .next()
                .map(|(_, decoded)| decoded.into_owned())
                .unwrap_or_else(|| warning.to_string())
        })
        .collect()
}

fn body_signals_invalid_token(body: &str) -> bool {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return false;
    };

    let matches_entry = |entry: &Value| {
        entry["code"].as_u64() == Some(auth::INVALID_TOKEN_CODE)
            || entry["error_code"].as_str() == Some(auth::INVALID_TOKEN_ERROR_CODE)
            || entry["title"].as_str() == Some(auth::INVALID_TOKEN_ERROR_CODE)
    };

    matches_entry(&value)
        || value["error"].as_str() == Some(auth::UAA_INVALID_TOKEN)
        || value["errors"]
            .as_array()
            .map(|errors| errors.iter().any(matches_entry))
            .unwrap_or(false)
}

/// Pull a code and a description out of a backend error body
fn parse_error_body(body: &str) -> (String, String) {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return (String::new(), body.trim().to_string());
    };

    if let Some(first) = value["errors"].as_array().and_then(|e| e.first()) {
        return (
            json_text(&first["code"]),
            first["detail"].as_str().unwrap_or_default().to_string(),
        );
    }

    if value.get("description").is_some() {
        return (
            json_text(&value["code"]),
            value["description"].as_str().unwrap_or_default().to_string(),
        );
    }

    if let Some(error) = value["error"].as_str() {
        let description = value["error_description"].as_str().unwrap_or(error);
        return (error.to_string(), description.to_string());
    }

    (String::new(), body.trim().to_string())
}

fn json_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
