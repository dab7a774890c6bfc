use std::collections::HashMap;

use serde_json::Value;

use crate::providers::{field, require_uid};
use crate::{AccessToken, IdentityProvider, OAuthError, User};

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/auth";
const TOKEN_URL: &str = "https://accounts.google.com/o/oauth2/token";
const USER_DETAILS_URL: &str = "https://www.googleapis.com/oauth2/v1/userinfo?alt=json";
const PICTURE_BASE_URL: &str = "https://www.google.com/s2/photos/profile/";

const DEFAULT_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/userinfo.profile",
    "https://www.googleapis.com/auth/userinfo.email",
];
const DEFAULT_ACCESS_TYPE: &str = "online";
const DEFAULT_APPROVAL_PROMPT: &str = "force";

#[derive(Debug, Clone)]
pub struct GoogleProvider {
    access_type: Option<String>,
    approval_prompt: Option<String>,
    login_hint: Option<String>,
}

impl Default for GoogleProvider {
    fn default() -> Self {
        Self {
            access_type: Some(DEFAULT_ACCESS_TYPE.to_string()),
            approval_prompt: Some(DEFAULT_APPROVAL_PROMPT.to_string()),
            login_hint: None,
        }
    }
}

impl GoogleProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `access_type`, `approval_prompt` and `login_hint`; other keys
    /// belong to [`crate::ProviderConfig::from_options`] and are skipped.
    pub fn from_options(options: &HashMap<String, String>) -> Self {
        let mut provider = Self::default();
        if let Some(value) = options.get("access_type") {
            provider.access_type = Some(value.clone());
        }
        if let Some(value) = options.get("approval_prompt") {
            provider.approval_prompt = Some(value.clone());
        }
        if let Some(value) = options.get("login_hint") {
            provider.login_hint = Some(value.clone());
        }
        provider
    }

    /// `offline` makes Google return a refresh token.
    pub fn with_access_type(mut self, access_type: impl Into<String>) -> Self {
        self.access_type = Some(access_type.into());
        self
    }

    pub fn with_approval_prompt(mut self, approval_prompt: impl Into<String>) -> Self {
        self.approval_prompt = Some(approval_prompt.into());
        self
    }

    pub fn with_login_hint(mut self, login_hint: impl Into<String>) -> Self {
        self.login_hint = Some(login_hint.into());
        self
    }

    pub fn without_approval_prompt(mut self) -> Self {
        self.approval_prompt = None;
        self
    }
}

impl IdentityProvider for GoogleProvider {
    fn id(&self) -> &'static str {
        "google"
    }

    fn authorize_url(&self) -> &str {
        AUTHORIZE_URL
    }

    fn token_url(&self) -> &str {
        TOKEN_URL
    }

    fn user_details_url(&self, _token: &AccessToken) -> String {
        USER_DETAILS_URL.to_string()
    }

    fn default_scopes(&self) -> &'static [&'static str] {
        DEFAULT_SCOPES
    }

    fn scope_separator(&self) -> &'static str {
        " "
    }

    fn authorize_params(&self) -> Vec<(String, String)> {
        [
            ("approval_prompt", &self.approval_prompt),
            ("access_type", &self.access_type),
            ("login_hint", &self.login_hint),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_ref().map(|value| (key.to_string(), value.clone())))
        .collect()
    }

    fn user_details_headers(&self, token: &AccessToken) -> Vec<(String, String)> {
        vec![(
            "Authorization".to_string(),
            format!("Bearer {}", token.access_token),
        )]
    }

    fn user_details(&self, raw: &Value, _token: &AccessToken) -> Result<User, OAuthError> {
        let mut user = User::new(require_uid(raw)?);
        user.name = field(raw, &["name"]);
        user.first_name = field(raw, &["given_name"]);
        user.last_name = field(raw, &["family_name"]);
        user.email = field(raw, &["email"]);
        user.image_url = field(raw, &["picture"]);
        Ok(user)
    }

    fn picture_url(&self, user: &User, _token: &AccessToken) -> Option<String> {
        Some(format!("{PICTURE_BASE_URL}{}", user.uid))
    }
}
