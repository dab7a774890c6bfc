//! Sign users in through third-party OAuth 2.0 identity providers.
//!
//! Every provider (Facebook, Google, GitHub, Microsoft, or your own
//! [`IdentityProvider`]) is driven through the same three steps: redirect for
//! authorization, exchange a [`Grant`] for an [`AccessToken`], and fetch a
//! normalized [`User`].

mod client;
mod error;
mod grant;
mod http;
#[cfg(feature = "local-server")]
mod local_server;
mod providers;
mod state;
mod types;

pub use client::{AuthorizeOptions, OAuthClient, ProviderConfig};
pub use error::{ErrorBody, OAuthError};
pub use grant::{
    AuthorizationCode, ClientCredentials, Grant, Params, RefreshToken, parse_token_response,
};
pub use http::ApiMethod;
#[cfg(feature = "local-server")]
pub use local_server::{LocalServer, LocalServerConfig};
pub use providers::{
    FacebookProvider, GithubProvider, GoogleProvider, IdentityProvider, MicrosoftProvider,
    TokenMethod,
};
pub use state::{MemoryStateStore, StateStore, generate_state, state_from_cookie_header, state_key};
pub use types::{AccessToken, ApiResponse, AuthorizationRedirect, AuthorizationResponse, User};
