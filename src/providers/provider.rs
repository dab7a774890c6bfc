use std::fmt;
use std::str::FromStr;

use crate::{AccessToken, OAuthError, User};

/// How the token endpoint expects its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenMethod {
    /// Parameters in the query string.
    Get,
    /// Parameters as a form body.
    #[default]
    Post,
}

impl FromStr for TokenMethod {
    type Err = OAuthError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "get" => Ok(Self::Get),
            "post" => Ok(Self::Post),
            _ => Err(OAuthError::InvalidOption {
                key: "method".to_string(),
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for TokenMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => f.write_str("get"),
            Self::Post => f.write_str("post"),
        }
    }
}

/// An OAuth2 authorization server together with its profile API.
///
/// Implementors supply endpoints and the mapping from the raw profile JSON to
/// [`User`]; [`crate::OAuthClient`] drives the HTTP exchange.
pub trait IdentityProvider: Send + Sync {
    /// Short lowercase name, also used in the state storage key.
    fn id(&self) -> &'static str;

    fn authorize_url(&self) -> &str;

    fn token_url(&self) -> &str;

    /// Profile endpoint. Providers that take the token as a query parameter
    /// embed it here; the others send it from [`Self::user_details_headers`].
    fn user_details_url(&self, token: &AccessToken) -> String;

    fn default_scopes(&self) -> &'static [&'static str] {
        &[]
    }

    fn scope_separator(&self) -> &'static str {
        ","
    }

    /// Optional provider fields added to the authorize query when set.
    fn authorize_params(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    fn token_method(&self) -> TokenMethod {
        TokenMethod::Post
    }

    fn user_details_headers(&self, _token: &AccessToken) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Adds the token to an arbitrary API URL for providers that authenticate
    /// through the query string. Header-based providers return `url` unchanged.
    fn authenticate_url(&self, url: &str, _token: &AccessToken) -> String {
        url.to_string()
    }

    /// Normalizes a profile response. Must not perform I/O.
    fn user_details(&self, raw: &serde_json::Value, token: &AccessToken)
    -> Result<User, OAuthError>;

    /// Endpoint that redirects to the user's picture, looked up when
    /// [`Self::user_details`] left `image_url` unset.
    fn picture_url(&self, _user: &User, _token: &AccessToken) -> Option<String> {
        None
    }
}

impl<P: IdentityProvider + ?Sized> IdentityProvider for Box<P> {
    fn id(&self) -> &'static str {
        (**self).id()
    }

    fn authorize_url(&self) -> &str {
        (**self).authorize_url()
    }

    fn token_url(&self) -> &str {
        (**self).token_url()
    }

    fn user_details_url(&self, token: &AccessToken) -> String {
        (**self).user_details_url(token)
    }

    fn default_scopes(&self) -> &'static [&'static str] {
        (**self).default_scopes()
    }

    fn scope_separator(&self) -> &'static str {
        (**self).scope_separator()
    }

    fn authorize_params(&self) -> Vec<(String, String)> {
        (**self).authorize_params()
    }

    fn token_method(&self) -> TokenMethod {
        (**self).token_method()
    }

    fn user_details_headers(&self, token: &AccessToken) -> Vec<(String, String)> {
        (**self).user_details_headers(token)
    }

    fn authenticate_url(&self, url: &str, token: &AccessToken) -> String {
        (**self).authenticate_url(url, token)
    }

    fn user_details(
        &self,
        raw: &serde_json::Value,
        token: &AccessToken,
    ) -> Result<User, OAuthError> {
        (**self).user_details(raw, token)
    }

    fn picture_url(&self, user: &User, token: &AccessToken) -> Option<String> {
        (**self).picture_url(user, token)
    }
}

#[cfg(test)]
mod tests {
    use super::{IdentityProvider, TokenMethod};
    use crate::{AccessToken, FacebookProvider, GithubProvider, GoogleProvider};

    #[test]
    fn parses_token_method_case_insensitively() {
        assert_eq!("GET".parse::<TokenMethod>().unwrap(), TokenMethod::Get);
        assert_eq!("post".parse::<TokenMethod>().unwrap(), TokenMethod::Post);
        assert!("head".parse::<TokenMethod>().is_err());
    }

    #[test]
    fn boxed_providers_delegate() {
        let providers: Vec<Box<dyn IdentityProvider>> =
            vec![Box::new(GithubProvider), Box::new(GoogleProvider::new())];
        let ids: Vec<_> = providers.iter().map(|provider| provider.id()).collect();
        assert_eq!(ids, ["github", "google"]);

        let token = AccessToken::new("t");
        assert_eq!(providers[0].user_details_url(&token), "https://api.github.com/user");
        assert_eq!(providers[1].scope_separator(), " ");
        assert_eq!(providers[1].token_method(), TokenMethod::Post);
        assert_eq!(
            providers[0].authenticate_url("https://api.github.com/user/repos", &token),
            "https://api.github.com/user/repos"
        );

        let facebook: Box<dyn IdentityProvider> = Box::new(FacebookProvider);
        assert_eq!(
            facebook.authenticate_url("https://graph.facebook.com/me/friends", &token),
            "https://graph.facebook.com/me/friends?access_token=t"
        );
    }
}
