use std::net::IpAddr;

use url::{Host, Url};

use crate::OAuthError;

/// The part of the redirect uri the local server listens on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct RedirectTarget {
    pub(super) host: String,
    pub(super) port: u16,
    pub(super) path: String,
}

impl RedirectTarget {
    pub(super) fn parse(redirect_uri: &str) -> Result<Self, OAuthError> {
        let url = Url::parse(redirect_uri)?;
        if url.scheme() != "http" {
            return Err(OAuthError::InvalidRedirectUri(format!(
                "{redirect_uri}: local redirect uri must use http"
            )));
        }

        let host = match url.host() {
            Some(Host::Domain(domain)) if domain.eq_ignore_ascii_case("localhost") => {
                domain.to_string()
            }
            Some(Host::Ipv4(ip)) if ip.is_loopback() => ip.to_string(),
            Some(Host::Ipv6(ip)) if IpAddr::from(ip).is_loopback() => ip.to_string(),
            _ => {
                return Err(OAuthError::InvalidRedirectUri(format!(
                    "{redirect_uri}: local redirect uri must point at a loopback host"
                )));
            }
        };

        let port = url.port_or_known_default().ok_or_else(|| {
            OAuthError::InvalidRedirectUri(format!("{redirect_uri}: missing port"))
        })?;

        Ok(Self {
            host,
            port,
            path: url.path().to_string(),
        })
    }

    /// Rebuilds the full callback url from the query the server received.
    pub(super) fn callback_url(&self, query: &str) -> Result<String, OAuthError> {
        let host = if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        let mut url = Url::parse(&format!("http://{host}:{}{}", self.port, self.path))?;
        if !query.is_empty() {
            url.set_query(Some(query));
        }
        Ok(url.to_string())
    }
}
