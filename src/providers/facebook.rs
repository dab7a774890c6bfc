use serde_json::Value;

use crate::providers::{field, require_uid, with_access_token};
use crate::{AccessToken, IdentityProvider, OAuthError, User};

const AUTHORIZE_URL: &str = "https://www.facebook.com/dialog/oauth";
const TOKEN_URL: &str = "https://graph.facebook.com/oauth/access_token";
const USER_DETAILS_URL: &str = "https://graph.facebook.com/me?fields=id,username,name,first_name,last_name,email,hometown,bio,link";
const PICTURE_URL: &str = "https://graph.facebook.com/me/picture?type=normal";

const DEFAULT_SCOPES: &[&str] = &["email", "user_about_me"];

#[derive(Debug, Clone, Copy, Default)]
pub struct FacebookProvider;

impl IdentityProvider for FacebookProvider {
    fn id(&self) -> &'static str {
        "facebook"
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
        let mut user = User::new(require_uid(raw)?);
        user.nickname = field(raw, &["username"]);
        user.name = field(raw, &["name"]);
        user.first_name = field(raw, &["first_name"]);
        user.last_name = field(raw, &["last_name"]);
        user.email = field(raw, &["email"]);
        user.location = field(raw, &["hometown", "name"]);
        user.description = field(raw, &["bio"]);
        user.urls.insert("profile".to_string(), field(raw, &["link"]));
        Ok(user)
    }

    fn picture_url(&self, _user: &User, token: &AccessToken) -> Option<String> {
        Some(with_access_token(PICTURE_URL, &token.access_token))
    }
}
