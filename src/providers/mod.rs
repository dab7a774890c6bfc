mod facebook;
mod github;
mod google;
mod microsoft;
mod provider;

pub use facebook::FacebookProvider;
pub use github::GithubProvider;
pub use google::GoogleProvider;
pub use microsoft::MicrosoftProvider;
pub use provider::{IdentityProvider, TokenMethod};

use serde_json::Value;

use crate::OAuthError;

/// Reads a profile field as a string if it holds a truthy value.
///
/// Empty strings, `0`, `false`, `null`, arrays and objects all count as unset.
pub(crate) fn field_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) if number.as_f64() != Some(0.0) => Some(number.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

/// Looks up `path` (e.g. `["hometown", "name"]`) and applies [`field_string`].
pub(crate) fn field(raw: &Value, path: &[&str]) -> Option<String> {
    path.iter()
        .try_fold(raw, |value, key| value.get(key))
        .and_then(field_string)
}

pub(crate) fn require_uid(raw: &Value) -> Result<String, OAuthError> {
    field(raw, &["id"]).ok_or_else(|| OAuthError::InvalidResponse {
        message: "profile response has no id".to_string(),
        body: raw.to_string(),
    })
}

pub(crate) fn with_access_token(base: &str, token: &str) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    let encoded: String = url::form_urlencoded::byte_serialize(token.as_bytes()).collect();
    format!("{base}{separator}access_token={encoded}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn falsy_values_are_unset() {
        for value in [json!(""), json!(null), json!(0), json!(false), json!([]), json!({})] {
            assert_eq!(field_string(&value), None, "{value} should be unset");
        }
        assert_eq!(field_string(&json!(42)), Some("42".to_string()));
        assert_eq!(field_string(&json!("x")), Some("x".to_string()));
    }

    #[test]
    fn reads_nested_fields() {
        let raw = json!({"hometown": {"name": "Oslo"}, "emails": {"preferred": ""}});
        assert_eq!(field(&raw, &["hometown", "name"]).as_deref(), Some("Oslo"));
        assert_eq!(field(&raw, &["emails", "preferred"]), None);
        assert_eq!(field(&raw, &["missing", "name"]), None);
    }

    #[test]
    fn requires_uid() {
        assert!(matches!(
            require_uid(&json!({"name": "x"})),
            Err(OAuthError::InvalidResponse { .. })
        ));
        assert_eq!(require_uid(&json!({"id": 7})).unwrap(), "7");
    }

    #[test]
    fn appends_encoded_access_token() {
        assert_eq!(
            with_access_token("https://example.com/me", "a b&c"),
            "https://example.com/me?access_token=a+b%26c"
        );
        assert_eq!(
            with_access_token("https://example.com/me?fields=id", "t"),
            "https://example.com/me?fields=id&access_token=t"
        );
    }
}
