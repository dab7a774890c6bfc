use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{RawQuery, State},
    http::StatusCode,
    response::{Html, IntoResponse},
};
use tokio::sync::oneshot;

use crate::{AuthorizationResponse, OAuthError};

use super::target::RedirectTarget;

type CallbackResult = Result<AuthorizationResponse, OAuthError>;
type CallbackSender = oneshot::Sender<CallbackResult>;
type CallbackReceiver = oneshot::Receiver<CallbackResult>;
type SharedCallbackSender = Arc<Mutex<Option<CallbackSender>>>;

#[derive(Clone)]
pub(super) struct CallbackState {
    pub(super) target: RedirectTarget,
    pub(super) success_html: String,
    pub(super) error_html: String,
    pub(super) callback_tx: SharedCallbackSender,
}

/// Hands the first result to the waiting flow; later ones are dropped.
pub(super) fn deliver(callback_tx: &SharedCallbackSender, result: CallbackResult) {
    if let Ok(mut guard) = callback_tx.lock() {
        if let Some(sender) = guard.take() {
            let _ = sender.send(result);
        }
    }
}

pub(super) async fn callback_handler(
    State(state): State<CallbackState>,
    RawQuery(query): RawQuery,
) -> impl IntoResponse {
    let CallbackState {
        target,
        success_html,
        error_html,
        callback_tx,
    } = state;

    let result = target
        .callback_url(&query.unwrap_or_default())
        .and_then(|url| AuthorizationResponse::from_url(&url));

    match result {
        Ok(response) => {
            deliver(&callback_tx, Ok(response));
            (StatusCode::OK, Html(success_html))
        }
        // stray requests (favicon prefetch, reloads) keep the server waiting
        Err(OAuthError::MissingAuthorizationCode) => (StatusCode::BAD_REQUEST, Html(error_html)),
        Err(error @ OAuthError::AuthorizationDenied { .. }) => {
            tracing::warn!(%error, "provider denied authorization");
            deliver(&callback_tx, Err(error));
            (StatusCode::BAD_REQUEST, Html(error_html))
        }
        Err(error) => {
            deliver(&callback_tx, Err(error));
            (StatusCode::INTERNAL_SERVER_ERROR, Html(error_html))
        }
    }
}

pub(super) async fn fallback_handler(State(state): State<CallbackState>) -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Html(state.error_html))
}

pub(super) async fn wait_for_callback(
    callback_rx: CallbackReceiver,
    timeout: Option<Duration>,
) -> CallbackResult {
    let closed = || OAuthError::InvalidResponse {
        message: "local server callback channel closed".to_string(),
        body: String::new(),
    };

    match timeout {
        Some(timeout) => tokio::time::timeout(timeout, callback_rx)
            .await
            .map_err(|_| OAuthError::LocalServerTimeout { timeout })?
            .map_err(|_| closed())?,
        None => callback_rx.await.map_err(|_| closed())?,
    }
}
