use serde_json::Value;

use crate::providers::{field, require_uid};
use crate::{AccessToken, IdentityProvider, OAuthError, User};

const AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
const TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const USER_DETAILS_URL: &str = "https://api.github.com/user";
const PROFILE_BASE_URL: &str = "https://github.com/";

// api.github.com rejects requests without a user agent
const USER_AGENT: &str = concat!("idp-connect/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, Default)]
pub struct GithubProvider;

impl IdentityProvider for GithubProvider {
    fn id(&self) -> &'static str {
        "github"
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

    fn user_details_headers(&self, token: &AccessToken) -> Vec<(String, String)> {
        vec![
            (
                "Authorization".to_string(),
                format!("token {}", token.access_token),
            ),
            ("User-Agent".to_string(), USER_AGENT.to_string()),
        ]
    }

    fn user_details(&self, raw: &Value, _token: &AccessToken) -> Result<User, OAuthError> {
        let login = field(raw, &["login"]);

        let mut user = User::new(require_uid(raw)?);
        user.name = field(raw, &["name"]);
        user.email = field(raw, &["email"]);
        user.urls.insert(
            "profile".to_string(),
            login.as_ref().map(|login| format!("{PROFILE_BASE_URL}{login}")),
        );
        user.urls.insert("site".to_string(), field(raw, &["blog"]));
        user.nickname = login;
        Ok(user)
    }
}
