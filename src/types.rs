use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::OAuthError;

/// Result of [`crate::OAuthClient::authorize`]: where to send the user agent and
/// the state that has to come back on the callback.
#[derive(Debug, Clone)]
pub struct AuthorizationRedirect {
    pub authorization_url: String,
    pub state: String,
    pub state_key: String,
    pub scope: String,
}

impl AuthorizationRedirect {
    /// Value for the `Location` header of the redirect response.
    pub fn location(&self) -> &str {
        &self.authorization_url
    }

    /// `Set-Cookie` header value storing the state under the provider's key.
    pub fn set_cookie_header(&self) -> String {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            self.state_key, self.state
        )
    }
}

#[derive(Debug, Clone)]
pub struct AuthorizationResponse {
    pub code: String,
    pub state: Option<String>,
}

impl AuthorizationResponse {
    pub fn from_callback(code: &str, state: Option<&str>) -> Self {
        Self {
            code: code.to_string(),
            state: state.map(str::to_string),
        }
    }

    pub fn from_url(callback_url: &str) -> Result<Self, OAuthError> {
        let url = Url::parse(callback_url)?;
        let mut code = None;
        let mut state = None;
        let mut error = None;
        let mut description = None;

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => code = Some(value.to_string()),
                "state" => state = Some(value.to_string()),
                "error" => error = Some(value.to_string()),
                "error_description" => description = Some(value.to_string()),
                _ => {}
            }
        }

        if let Some(error) = error {
            return Err(OAuthError::AuthorizationDenied { error, description });
        }

        let code = code.ok_or(OAuthError::MissingAuthorizationCode)?;
        Ok(Self::from_callback(&code, state.as_deref()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_u64"
    )]
    pub expires_in: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_string"
    )]
    pub uid: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl AccessToken {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: None,
            refresh_token: None,
            expires_in: None,
            scope: None,
            uid: None,
            extra: HashMap::new(),
        }
    }
}

// some token endpoints send the expiry as a string
fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(number)) => number.as_u64(),
        Some(serde_json::Value::String(text)) => text.parse().ok(),
        _ => None,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(crate::providers::field_string))
}

/// Normalized user profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub uid: String,
    pub nickname: Option<String>,
    pub name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub urls: BTreeMap<String, Option<String>>,
}

impl User {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            ..Self::default()
        }
    }

    pub fn url(&self, label: &str) -> Option<&str> {
        self.urls.get(label).and_then(|url| url.as_deref())
    }
}

/// Outcome of [`crate::OAuthClient::call_api`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ApiResponse {
    Json(serde_json::Value),
    /// The body did not decode as JSON.
    Raw { status: u16, body: String },
}

impl ApiResponse {
    pub fn json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Raw { .. } => None,
        }
    }
}
