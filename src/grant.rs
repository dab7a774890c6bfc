//! Grant strategies for the token endpoint.
//!
//! A grant knows which `grant_type` it sends, which extra parameters it needs
//! and how to read the token endpoint's answer. The client never inspects the
//! grant beyond this trait, so new grants can be added without touching it.

use std::collections::BTreeMap;

use crate::{AccessToken, OAuthError};

pub type Params = BTreeMap<String, String>;

pub trait Grant: Send + Sync {
    fn grant_type(&self) -> &'static str;

    /// Grant-specific request parameters, `grant_type` excluded.
    fn params(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Merges `defaults`, the grant's own parameters and `overrides`, later
    /// sources winning. `grant_type` is always present in the result.
    fn prep_request_params(&self, defaults: Params, overrides: Params) -> Params {
        let mut params = defaults;
        params.insert("grant_type".to_string(), self.grant_type().to_string());
        params.extend(self.params());
        params.extend(overrides);
        params
    }

    fn handle_response(&self, raw: serde_json::Value) -> Result<AccessToken, OAuthError> {
        parse_token_response(raw)
    }
}

/// Reads a token endpoint response, rejecting it when `access_token` is
/// missing or empty.
pub fn parse_token_response(raw: serde_json::Value) -> Result<AccessToken, OAuthError> {
    let has_token = raw
        .get("access_token")
        .and_then(serde_json::Value::as_str)
        .is_some_and(|token| !token.is_empty());
    if !has_token {
        return Err(OAuthError::InvalidResponse {
            message: "token response has no access_token".to_string(),
            body: raw.to_string(),
        });
    }

    serde_json::from_value(raw.clone()).map_err(|err| OAuthError::InvalidResponse {
        message: err.to_string(),
        body: raw.to_string(),
    })
}

#[derive(Debug, Clone)]
pub struct AuthorizationCode {
    pub code: String,
}

impl AuthorizationCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

impl Grant for AuthorizationCode {
    fn grant_type(&self) -> &'static str {
        "authorization_code"
    }

    fn params(&self) -> Vec<(String, String)> {
        vec![("code".to_string(), self.code.clone())]
    }
}

#[derive(Debug, Clone)]
pub struct RefreshToken {
    pub refresh_token: String,
}

impl RefreshToken {
    pub fn new(refresh_token: impl Into<String>) -> Self {
        Self {
            refresh_token: refresh_token.into(),
        }
    }
}

impl Grant for RefreshToken {
    fn grant_type(&self) -> &'static str {
        "refresh_token"
    }

    fn params(&self) -> Vec<(String, String)> {
        vec![("refresh_token".to_string(), self.refresh_token.clone())]
    }

    // refresh responses often omit the refresh token; keep the one we sent
    fn handle_response(&self, raw: serde_json::Value) -> Result<AccessToken, OAuthError> {
        let mut token = parse_token_response(raw)?;
        if token.refresh_token.is_none() {
            token.refresh_token = Some(self.refresh_token.clone());
        }
        Ok(token)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ClientCredentials;

impl Grant for ClientCredentials {
    fn grant_type(&self) -> &'static str {
        "client_credentials"
    }

    fn prep_request_params(&self, defaults: Params, overrides: Params) -> Params {
        let mut params = defaults;
        // no user is redirected in this grant
        params.remove("redirect_uri");
        params.insert("grant_type".to_string(), self.grant_type().to_string());
        params.extend(overrides);
        params
    }
}
