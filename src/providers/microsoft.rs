use serde_json::Value;

use crate::providers::{field, require_uid, with_access_token};
use crate::{AccessToken, IdentityProvider, OAuthError, User};

const AUTHORIZE_URL: &str = "https://oauth.live.com/authorize";
const TOKEN_URL: &str = "https://oauth.live.com/token";
const USER_DETAILS_URL: &str = "https://apis.live.net/v5.0/me";
const API_BASE_URL: &str = "https://apis.live.net/v5.0/";

const DEFAULT_SCOPES: &[&str] = &["wl.basic", "wl.emails"];

#[derive(Debug, Clone, Copy, Default)]
pub struct MicrosoftProvider;

impl IdentityProvider for MicrosoftProvider {
    fn id(&self) -> &'static str {
        "microsoft"
    }

    fn authorize_url(&self) -> &str {
        AUTHORIZE_URL
    }

    fn token_url(&self) -> &str {
        TOKEN_URL
    }

    fn user_details_url(&self, token: &AccessToken) -> String {
        with_access_token(USER_DETAILS_URL, &token.access_token)
    }

    fn authenticate_url(&self, url: &str, token: &AccessToken) -> String {
        with_access_token(url, &token.access_token)
    }

    fn default_scopes(&self) -> &'static [&'static str] {
        DEFAULT_SCOPES
    }

    fn user_details(&self, raw: &Value, _token: &AccessToken) -> Result<User, OAuthError> {
        let uid = require_uid(raw)?;
        let profile = field(raw, &["link"]).map(|link| format!("{link}/cid-{uid}"));

        let mut user = User::new(uid);
        user.name = field(raw, &["name"]);
        user.first_name = field(raw, &["first_name"]);
        user.last_name = field(raw, &["last_name"]);
        user.email = field(raw, &["emails", "preferred"]);
        user.urls.insert("profile".to_string(), profile);
        Ok(user)
    }

    fn picture_url(&self, user: &User, _token: &AccessToken) -> Option<String> {
        Some(format!("{API_BASE_URL}{}/picture", user.uid))
    }
}
