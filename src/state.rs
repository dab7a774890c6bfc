use std::collections::HashMap;
use std::sync::Mutex;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{TryRngCore, rngs::OsRng};

use crate::OAuthError;

const STATE_BYTES: usize = 32;

/// An unguessable value to round-trip through the authorization redirect.
pub fn generate_state() -> Result<String, OAuthError> {
    let mut bytes = [0u8; STATE_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|err| OAuthError::OsRng {
            message: err.to_string(),
        })?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Storage key for a provider's pending state, e.g. `github_authorize_state`.
pub fn state_key(provider_id: &str) -> String {
    format!("{provider_id}_authorize_state")
}

/// Reads a provider's state back out of a `Cookie` request header.
pub fn state_from_cookie_header(header: &str, provider_id: &str) -> Option<String> {
    let key = state_key(provider_id);
    header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == key && !value.is_empty()).then(|| value.to_string())
    })
}

/// Where the caller keeps the state between `authorize` and the callback.
///
/// Comparing the callback's `state` against the saved one is the caller's
/// responsibility; `verify` is the hook for it.
pub trait StateStore: Send + Sync {
    fn save(&self, key: &str, state: &str) -> Result<(), OAuthError>;

    fn verify(&self, key: &str, received: &str) -> Result<(), OAuthError>;
}

/// In-process store. Each saved state can be verified once.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    states: Mutex<HashMap<String, String>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn save(&self, key: &str, state: &str) -> Result<(), OAuthError> {
        let mut states = self
            .states
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        states.insert(key.to_string(), state.to_string());
        Ok(())
    }

    fn verify(&self, key: &str, received: &str) -> Result<(), OAuthError> {
        let expected = self
            .states
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(key)
            .ok_or_else(|| OAuthError::MissingState {
                key: key.to_string(),
            })?;

        if expected != received {
            return Err(OAuthError::StateMismatch {
                expected,
                received: received.to_string(),
            });
        }
        Ok(())
    }
}
