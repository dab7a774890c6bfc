use std::str::FromStr;

use reqwest::{
    Client, Method, RequestBuilder,
    header::{ACCEPT, HeaderName, HeaderValue, LOCATION},
    redirect::Policy,
};
use url::Url;

use crate::{ErrorBody, OAuthError, ProviderConfig};

const ACCEPT_JSON: &str = "application/json";

/// Methods accepted by [`crate::OAuthClient::call_api`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl FromStr for ApiMethod {
    type Err = OAuthError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "get" => Ok(Self::Get),
            "post" => Ok(Self::Post),
            "put" => Ok(Self::Put),
            "delete" => Ok(Self::Delete),
            "patch" => Ok(Self::Patch),
            _ => Err(OAuthError::UnsupportedMethod(value.to_string())),
        }
    }
}

impl From<ApiMethod> for Method {
    fn from(method: ApiMethod) -> Self {
        match method {
            ApiMethod::Get => Self::GET,
            ApiMethod::Post => Self::POST,
            ApiMethod::Put => Self::PUT,
            ApiMethod::Delete => Self::DELETE,
            ApiMethod::Patch => Self::PATCH,
        }
    }
}

pub(crate) fn build_client(
    config: &ProviderConfig,
    follow_redirects: bool,
) -> Result<Client, OAuthError> {
    let mut builder = Client::builder();
    if let Some(timeout) = config.timeout {
        builder = builder.timeout(timeout);
    }
    if let Some(proxy) = &config.proxy {
        builder = builder.proxy(reqwest::Proxy::all(proxy.as_str())?);
    }
    if !follow_redirects {
        builder = builder.redirect(Policy::none());
    }
    Ok(builder.build()?)
}

pub(crate) fn accept_json(builder: RequestBuilder) -> RequestBuilder {
    builder.header(ACCEPT, ACCEPT_JSON)
}

/// Sends the request and decodes a JSON body. 4xx/5xx responses become
/// [`OAuthError::IdentityProvider`].
pub(crate) async fn send_json(builder: RequestBuilder) -> Result<serde_json::Value, OAuthError> {
    let response = builder.send().await?;
    let status = response.status();
    let url = redact(response.url());
    let body = response.text().await?;

    if !status.is_client_error() && !status.is_server_error() {
        tracing::debug!(%url, status = status.as_u16(), "provider responded");
        return serde_json::from_str(&body).map_err(|err| OAuthError::InvalidResponse {
            message: err.to_string(),
            body,
        });
    }

    let body = ErrorBody::decode(&body);
    tracing::warn!(
        %url,
        status = status.as_u16(),
        error = body.error_code().unwrap_or("unknown"),
        "provider returned an error response"
    );
    Err(OAuthError::IdentityProvider {
        status: status.as_u16(),
        body,
    })
}

/// HEAD request whose `Location` header is the answer. Never fails; any
/// problem yields `None`.
pub(crate) async fn resolve_location(client: &Client, url: &str) -> Option<String> {
    let response = match accept_json(client.head(url)).send().await {
        Ok(response) => response,
        Err(err) => {
            tracing::debug!(error = %err, "picture lookup failed");
            return None;
        }
    };

    let location = response.headers().get(LOCATION)?.to_str().ok()?;
    if location.is_empty() {
        return None;
    }

    // relative redirects are resolved against the lookup url
    match Url::parse(url).and_then(|base| base.join(location)) {
        Ok(resolved) => Some(resolved.to_string()),
        Err(_) => Some(location.to_string()),
    }
}

pub(crate) fn apply_headers(
    mut builder: RequestBuilder,
    headers: &[(String, String)],
) -> Result<RequestBuilder, OAuthError> {
    for (name, value) in headers {
        let name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|_| OAuthError::InvalidHeader {
                name: name.clone(),
                value: value.clone(),
            })?;
        let value = HeaderValue::from_str(value).map_err(|_| OAuthError::InvalidHeader {
            name: name.to_string(),
            value: value.clone(),
        })?;
        builder = builder.header(name, value);
    }
    Ok(builder)
}

/// Drops the query so access tokens never reach the logs.
pub(crate) fn redact(url: &Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}
