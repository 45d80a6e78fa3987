//! Identity carried inside the access token
//!
//! The access token is a JWT. Only its claims are read, to show who is logged
//! in; the signature is the backend's business.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
struct Claims {
    #[serde(default)]
    user_name: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    origin: Option<String>,
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    exp: Option<i64>,
}

/// Who the access token was issued to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenUser {
    pub name: String,
    pub guid: String,
    pub origin: String,
    /// Issued to a client (client-credentials grant), not a person
    pub is_client: bool,
    /// Expiry as seconds since the epoch
    pub expires_at: Option<i64>,
}

/// Decode the user from a stored access token (`bearer <jwt>` or a bare JWT)
pub fn decode_user(access_token: &str) -> Option<TokenUser> {
    let jwt = strip_scheme(access_token);
    let payload = jwt.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;

    match (claims.user_name, claims.client_id) {
        (Some(name), _) => Some(TokenUser {
            name,
            guid: claims.user_id.unwrap_or_default(),
            origin: claims.origin.unwrap_or_default(),
            is_client: false,
            expires_at: claims.exp,
        }),
        (None, Some(client_id)) => Some(TokenUser {
            guid: client_id.clone(),
            name: client_id,
            origin: String::new(),
            is_client: true,
            expires_at: claims.exp,
        }),
        (None, None) => None,
    }
}

fn strip_scheme(token: &str) -> &str {
    let token = token.trim();
    match token.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        _ => token,
    }
}

#[cfg(test)]
pub(crate) fn encode_test_token(claims: serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("bearer {header}.{payload}.signature")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_user_token() {
        let token = encode_test_token(json!({
            "user_name": "admin",
            "user_id": "user-guid",
            "origin": "uaa",
            "client_id": "cf",
            "exp": 1700000000
        }));

        let user = decode_user(&token).unwrap();
        assert_eq!(user.name, "admin");
        assert_eq!(user.guid, "user-guid");
        assert_eq!(user.origin, "uaa");
        assert!(!user.is_client);
        assert_eq!(user.expires_at, Some(1700000000));
    }

    #[test]
    fn test_decode_client_token() {
        let token = encode_test_token(json!({"client_id": "deployer"}));
        let user = decode_user(&token).unwrap();
        assert_eq!(user.name, "deployer");
        assert!(user.is_client);
    }

    #[test]
    fn test_garbage_tokens() {
        assert_eq!(decode_user(""), None);
        assert_eq!(decode_user("bearer not-a-jwt"), None);
        assert_eq!(decode_user("bearer a.!!!.c"), None);
    }
}
