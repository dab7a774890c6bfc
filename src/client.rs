use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use url::Url;

use crate::grant::Params;
use crate::http::{
    ApiMethod, accept_json, apply_headers, build_client, resolve_location, send_json,
};
use crate::state::{generate_state, state_key};
use crate::{
    AccessToken, ApiResponse, AuthorizationRedirect, Grant, IdentityProvider, OAuthError,
    StateStore, TokenMethod, User,
};
#[cfg(feature = "local-server")]
use crate::{AuthorizationCode, LocalServer, LocalServerConfig, MemoryStateStore};

const DEFAULT_RESPONSE_TYPE: &str = "code";

/// Client credentials and transport settings for one provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    /// `None` requests the provider's default scopes.
    pub scopes: Option<Vec<String>>,
    pub response_type: String,
    /// `None` uses the provider's token method.
    pub method: Option<TokenMethod>,
    pub timeout: Option<Duration>,
    /// Any proxy URL reqwest understands, e.g. `socks5://127.0.0.1:1080`.
    pub proxy: Option<String>,
    #[cfg(feature = "local-server")]
    pub local_server: Option<LocalServerConfig>,
}

impl ProviderConfig {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            scopes: None,
            response_type: DEFAULT_RESPONSE_TYPE.to_string(),
            method: None,
            timeout: None,
            proxy: None,
            #[cfg(feature = "local-server")]
            local_server: None,
        }
    }

    /// Builds a config from loosely typed options.
    ///
    /// Recognized keys: `client_id`, `client_secret`, `redirect_uri`, `scopes`
    /// (separated by commas or whitespace), `response_type`, `method`,
    /// `timeout` (seconds) and `proxy`. Unknown keys are ignored; a recognized
    /// key with an unusable value is an error.
    pub fn from_options(options: &HashMap<String, String>) -> Result<Self, OAuthError> {
        let mut config = Self::new("", "", "");
        for (key, value) in options {
            match key.as_str() {
                "client_id" => config.client_id = value.clone(),
                "client_secret" => config.client_secret = value.clone(),
                "redirect_uri" => config.redirect_uri = value.clone(),
                "scopes" => {
                    config.scopes = Some(
                        value
                            .split(|c: char| c == ',' || c.is_whitespace())
                            .filter(|scope| !scope.is_empty())
                            .map(str::to_string)
                            .collect(),
                    );
                }
                "response_type" => config.response_type = value.clone(),
                "method" => config.method = Some(value.parse()?),
                "timeout" => {
                    let seconds = value.parse().map_err(|_| OAuthError::InvalidOption {
                        key: key.clone(),
                        value: value.clone(),
                    })?;
                    config.timeout = Some(Duration::from_secs(seconds));
                }
                "proxy" => config.proxy = Some(value.clone()),
                _ => tracing::debug!(option = %key, "ignoring unknown provider option"),
            }
        }
        Ok(config)
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = Some(scopes.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_response_type(mut self, response_type: impl Into<String>) -> Self {
        self.response_type = response_type.into();
        self
    }

    pub fn with_method(mut self, method: TokenMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    #[cfg(feature = "local-server")]
    pub fn with_local_server_config(mut self, local_server: LocalServerConfig) -> Self {
        self.redirect_uri = local_server.redirect_uri();
        self.local_server = Some(local_server);
        self
    }
}

/// Per-call options for [`OAuthClient::authorize`].
#[derive(Debug, Clone, Default)]
pub struct AuthorizeOptions {
    pub response_type: Option<String>,
    /// Use this state instead of generating one.
    pub state: Option<String>,
    pub params: Vec<(String, String)>,
}

impl AuthorizeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response_type(mut self, response_type: impl Into<String>) -> Self {
        self.response_type = Some(response_type.into());
        self
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }
}

#[derive(Debug, Clone)]
pub struct OAuthClient<P: IdentityProvider> {
    provider: P,
    config: ProviderConfig,
    http: Client,
    // picture lookups must see the redirect instead of following it
    lookup: Client,
}

impl<P: IdentityProvider> OAuthClient<P> {
    pub fn new(provider: P, config: ProviderConfig) -> Result<Self, OAuthError> {
        let http = build_client(&config, true)?;
        Self::with_http_client(provider, config, http)
    }

    pub fn with_http_client(
        provider: P,
        config: ProviderConfig,
        http: Client,
    ) -> Result<Self, OAuthError> {
        let lookup = build_client(&config, false)?;
        Ok(Self {
            provider,
            config,
            http,
            lookup,
        })
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn scope(&self) -> String {
        let separator = self.provider.scope_separator();
        match &self.config.scopes {
            Some(scopes) => scopes.join(separator),
            None => self.provider.default_scopes().join(separator),
        }
    }

    /// Builds the consent URL with a fresh CSRF state.
    ///
    /// The caller sends the user agent to [`AuthorizationRedirect::location`]
    /// and keeps [`AuthorizationRedirect::state`] to compare with the callback.
    pub fn authorize(
        &self,
        options: AuthorizeOptions,
    ) -> Result<AuthorizationRedirect, OAuthError> {
        let state = match options.state {
            Some(state) => state,
            None => generate_state()?,
        };
        let scope = self.scope();
        let response_type = options
            .response_type
            .unwrap_or_else(|| self.config.response_type.clone());

        let mut url = Url::parse(self.provider.authorize_url())?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("client_id", &self.config.client_id);
            pairs.append_pair("redirect_uri", &self.config.redirect_uri);
            pairs.append_pair("state", &state);
            pairs.append_pair("scope", &scope);
            pairs.append_pair("response_type", &response_type);
            for (key, value) in self.provider.authorize_params().iter().chain(&options.params) {
                pairs.append_pair(key, value);
            }
        }

        tracing::debug!(provider = self.provider.id(), "built authorization url");

        Ok(AuthorizationRedirect {
            authorization_url: url.to_string(),
            state,
            state_key: state_key(self.provider.id()),
            scope,
        })
    }

    /// [`Self::authorize`], saving the state in `store` under the provider's key.
    pub fn authorize_with_store(
        &self,
        options: AuthorizeOptions,
        store: &dyn StateStore,
    ) -> Result<AuthorizationRedirect, OAuthError> {
        let redirect = self.authorize(options)?;
        store.save(&redirect.state_key, &redirect.state)?;
        Ok(redirect)
    }

    pub async fn get_access_token<G>(
        &self,
        grant: &G,
        params: Params,
    ) -> Result<AccessToken, OAuthError>
    where
        G: Grant + ?Sized,
    {
        let defaults = Params::from([
            ("client_id".to_string(), self.config.client_id.clone()),
            ("client_secret".to_string(), self.config.client_secret.clone()),
            ("redirect_uri".to_string(), self.config.redirect_uri.clone()),
            ("grant_type".to_string(), grant.grant_type().to_string()),
        ]);
        let request_params = grant.prep_request_params(defaults, params);

        let method = self.config.method.unwrap_or(self.provider.token_method());
        let url = self.provider.token_url();
        tracing::debug!(
            provider = self.provider.id(),
            grant_type = grant.grant_type(),
            %method,
            "requesting access token"
        );

        let builder = match method {
            TokenMethod::Get => self.http.get(url).query(&request_params),
            TokenMethod::Post => self.http.post(url).form(&request_params),
        };
        let raw = send_json(accept_json(builder)).await?;
        grant.handle_response(raw)
    }

    pub async fn get_user_details(&self, token: &AccessToken) -> Result<User, OAuthError> {
        let url = self.provider.user_details_url(token);
        let headers = self.provider.user_details_headers(token);
        let builder = apply_headers(accept_json(self.http.get(url)), &headers)?;

        let raw = send_json(builder).await?;
        let mut user = self.provider.user_details(&raw, token)?;

        if user.image_url.is_none() {
            if let Some(picture_url) = self.provider.picture_url(&user, token) {
                user.image_url = resolve_location(&self.lookup, &picture_url).await;
            }
        }

        Ok(user)
    }

    /// Calls any REST endpoint of the provider.
    ///
    /// Unlike the token and profile calls this never fails on the response:
    /// a JSON body (error bodies included) comes back as
    /// [`ApiResponse::Json`], anything else as [`ApiResponse::Raw`].
    pub async fn call_api(
        &self,
        method: &str,
        url: &str,
        params: &Params,
    ) -> Result<ApiResponse, OAuthError> {
        self.call_api_with_token(method, url, params, None).await
    }

    /// [`Self::call_api`] authenticated the same way as the profile request.
    pub async fn call_api_with_token(
        &self,
        method: &str,
        url: &str,
        params: &Params,
        token: Option<&AccessToken>,
    ) -> Result<ApiResponse, OAuthError> {
        let method: ApiMethod = method.parse()?;
        let url = match token {
            Some(token) => self.provider.authenticate_url(url, token),
            None => url.to_string(),
        };

        let mut builder = self.http.request(method.into(), &url);
        builder = match method {
            ApiMethod::Get => builder.query(params),
            _ => builder.form(params),
        };
        builder = accept_json(builder);
        if let Some(token) = token {
            builder = apply_headers(builder, &self.provider.user_details_headers(token))?;
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        match serde_json::from_str(&body) {
            Ok(value) => Ok(ApiResponse::Json(value)),
            Err(err) => {
                tracing::debug!(status, error = %err, "api response is not json");
                Ok(ApiResponse::Raw { status, body })
            }
        }
    }

    /// Runs the whole authorization code flow through a loopback server.
    ///
    /// `on_authorize` gets the consent URL, typically to open a browser.
    #[cfg(feature = "local-server")]
    pub async fn run_local_flow<F>(&self, on_authorize: F) -> Result<AccessToken, OAuthError>
    where
        F: FnOnce(&AuthorizationRedirect) -> Result<(), OAuthError>,
    {
        let store = MemoryStateStore::new();
        let redirect = self.authorize_with_store(AuthorizeOptions::default(), &store)?;
        let server = match &self.config.local_server {
            Some(config) => LocalServer::from_config(config.clone())?,
            None => LocalServer::new(self.config.redirect_uri.clone())?,
        };
        let listener = server.bind()?;

        let handle = tokio::task::spawn_blocking(move || server.listen_with(listener));

        on_authorize(&redirect)?;

        let response = handle.await.map_err(|err| OAuthError::InvalidResponse {
            message: err.to_string(),
            body: String::new(),
        })??;

        let received = response.state.as_deref().unwrap_or_default();
        store.verify(&redirect.state_key, received)?;

        self.get_access_token(&AuthorizationCode::new(response.code), Params::new())
            .await
    }
}
