use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("os rng error: {message}")]
    OsRng { message: String },

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid redirect uri: {0}")]
    InvalidRedirectUri(String),

    #[error("invalid header: {name}={value}")]
    InvalidHeader { name: String, value: String },

    #[error("invalid option: {key}={value}")]
    InvalidOption { key: String, value: String },

    /// The token or user-info endpoint answered with a 4xx/5xx status.
    #[error("identity provider returned {status}: {body}")]
    IdentityProvider { status: u16, body: ErrorBody },

    #[error("http method {0} is not supported")]
    UnsupportedMethod(String),

    #[error("invalid response: {message}")]
    InvalidResponse { message: String, body: String },

    #[error("missing authorization code in callback url")]
    MissingAuthorizationCode,

    #[error("authorization denied: {error}")]
    AuthorizationDenied {
        error: String,
        description: Option<String>,
    },

    #[error("no authorization state stored under {key}")]
    MissingState { key: String },

    #[error("state mismatch (expected={expected}, received={received})")]
    StateMismatch { expected: String, received: String },

    #[cfg(feature = "local-server")]
    #[error("local server timed out after {timeout:?}")]
    LocalServerTimeout { timeout: std::time::Duration },
}

/// Body of a failed provider response, decoded as far as it allows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ErrorBody {
    Json(serde_json::Value),
    Form(BTreeMap<String, String>),
    Text(String),
}

impl ErrorBody {
    /// JSON `null` is treated as undecodable and falls through to form/text.
    pub fn decode(body: &str) -> Self {
        match serde_json::from_str::<serde_json::Value>(body) {
            Ok(serde_json::Value::Null) | Err(_) => {}
            Ok(value) => return Self::Json(value),
        }

        let trimmed = body.trim();
        if is_form_encoded(trimmed) {
            let pairs: BTreeMap<String, String> = url::form_urlencoded::parse(trimmed.as_bytes())
                .into_owned()
                .collect();
            return Self::Form(pairs);
        }

        Self::Text(body.to_string())
    }

    /// The OAuth2 `error` code, when the provider sent one.
    pub fn error_code(&self) -> Option<&str> {
        match self {
            Self::Json(value) => value.get("error").and_then(|error| match error {
                serde_json::Value::String(code) => Some(code.as_str()),
                // facebook nests the error object
                serde_json::Value::Object(object) => {
                    object.get("type").and_then(serde_json::Value::as_str)
                }
                _ => None,
            }),
            Self::Form(pairs) => pairs.get("error").map(String::as_str),
            Self::Text(_) => None,
        }
    }
}

// every `&`-separated segment must be `key=value` with a plain key
fn is_form_encoded(body: &str) -> bool {
    let mut segments = body.split('&').filter(|segment| !segment.is_empty()).peekable();
    segments.peek().is_some()
        && segments.all(|segment| {
            segment
                .split_once('=')
                .is_some_and(|(key, _)| !key.is_empty() && !key.contains(char::is_whitespace))
        })
}

impl fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(value) => write!(f, "{value}"),
            Self::Form(pairs) => {
                let encoded: String = url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(pairs)
                    .finish();
                f.write_str(&encoded)
            }
            Self::Text(text) => f.write_str(text),
        }
    }
}
