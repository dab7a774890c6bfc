use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

use axum::{Router, routing::get};
use tokio::net::TcpListener as TokioTcpListener;
use tokio::runtime::Builder;
use tokio::sync::oneshot;

use crate::{AuthorizationResponse, OAuthError};

use super::config::LocalServerConfig;
use super::http::{CallbackState, callback_handler, deliver, fallback_handler, wait_for_callback};
use super::target::RedirectTarget;

#[derive(Debug, Clone)]
pub struct LocalServer {
    target: RedirectTarget,
    config: LocalServerConfig,
}

impl LocalServer {
    pub fn new(redirect_uri: impl Into<String>) -> Result<Self, OAuthError> {
        let redirect_uri: String = redirect_uri.into();
        Self::from_config(LocalServerConfig::from_redirect_uri(&redirect_uri)?)
    }

    pub fn from_config(config: LocalServerConfig) -> Result<Self, OAuthError> {
        Ok(Self {
            target: RedirectTarget::parse(&config.redirect_uri())?,
            config,
        })
    }

    pub fn redirect_uri(&self) -> String {
        self.config.redirect_uri()
    }

    pub fn bind(&self) -> Result<TcpListener, OAuthError> {
        TcpListener::bind((self.target.host.as_str(), self.target.port)).map_err(OAuthError::from)
    }

    /// Blocking variant for callers outside a runtime; serves on its own thread.
    pub fn listen_with(&self, listener: TcpListener) -> Result<AuthorizationResponse, OAuthError> {
        let server = self.clone();
        let handle = thread::spawn(move || -> Result<AuthorizationResponse, OAuthError> {
            let runtime = Builder::new_current_thread().enable_all().build()?;
            runtime.block_on(server.listen_with_async(listener))
        });

        handle.join().unwrap_or_else(|_| {
            Err(OAuthError::InvalidResponse {
                message: "local server thread panicked".to_string(),
                body: String::new(),
            })
        })
    }

    pub fn listen_once(&self) -> Result<AuthorizationResponse, OAuthError> {
        let listener = self.bind()?;
        self.listen_with(listener)
    }

    /// Serves until the first callback carrying a code (or a provider error)
    /// arrives, then shuts down.
    pub async fn listen_with_async(
        &self,
        listener: TcpListener,
    ) -> Result<AuthorizationResponse, OAuthError> {
        let (callback_tx, callback_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let callback_tx = Arc::new(Mutex::new(Some(callback_tx)));

        let state = CallbackState {
            target: self.target.clone(),
            success_html: self.config.success_html.clone(),
            error_html: self.config.error_html.clone(),
            callback_tx: callback_tx.clone(),
        };

        let app = Router::new()
            .route(&self.target.path, get(callback_handler))
            .fallback(fallback_handler)
            .with_state(state);

        listener.set_nonblocking(true)?;
        let listener = TokioTcpListener::from_std(listener)?;
        tracing::debug!(redirect_uri = %self.redirect_uri(), "waiting for provider redirect");

        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });

        let server_handle = tokio::spawn(async move {
            if let Err(err) = server.await {
                let error = OAuthError::InvalidResponse {
                    message: err.to_string(),
                    body: String::new(),
                };
                deliver(&callback_tx, Err(error));
            }
        });

        let result = wait_for_callback(callback_rx, self.config.timeout).await;

        let _ = shutdown_tx.send(());
        let _ = server_handle.await;

        result
    }

    pub async fn listen_once_async(&self) -> Result<AuthorizationResponse, OAuthError> {
        let listener = self.bind()?;
        self.listen_with_async(listener).await
    }
}
