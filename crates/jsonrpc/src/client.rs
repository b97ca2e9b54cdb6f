//! JSON-RPC client for the management API.
//!
//! The client owns one login session. Calls are plain request/response
//! round trips; nothing is retried.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

use crate::api::{RemoteApi, Verb};
use crate::config::ConnectionConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::protocol::{self, RpcOutcome};

const LOGIN_URL: &str = "/sys/login/user";
const LOGOUT_URL: &str = "/sys/logout";

/// Longest HTTP error body quoted in an error message.
const MAX_ERROR_BODY: usize = 200;

/// Session-based JSON-RPC client.
pub struct JsonRpcClient {
    /// Connection settings.
    config: Arc<ConnectionConfig>,
    /// Resolved JSON-RPC endpoint.
    endpoint: Url,
    /// HTTP client.
    http_client: reqwest::Client,
    /// Session token, set by `login`.
    session: RwLock<Option<String>>,
    /// Request id counter.
    next_id: AtomicU64,
}

impl JsonRpcClient {
    /// Create a client. No request is sent until [`login`](Self::login).
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        let endpoint = config.endpoint()?;
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()?;

        if !config.verify_tls {
            warn!(url = %config.url, "TLS certificate verification disabled");
        }

        Ok(Self {
            config: Arc::new(config),
            endpoint,
            http_client,
            session: RwLock::new(None),
            next_id: AtomicU64::new(1),
        })
    }

    /// Connection settings in use.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Whether a session is held.
    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_some()
    }

    /// Exchange the configured credentials for a session.
    pub async fn login(&self) -> Result<()> {
        let data = json!({
            "user": self.config.username,
            "passwd": self.config.password,
        });

        let outcome = self
            .send(Verb::Exec, LOGIN_URL, &data, None)
            .await
            .map_err(|e| match e {
                Error::HttpStatus {
                    status: 401 | 403, ..
                } => Error::auth_failed(e.to_string()),
                _ => match e.kind() {
                    ErrorKind::Api | ErrorKind::Auth => Error::auth_failed(e.to_string()),
                    ErrorKind::Transport | ErrorKind::Config => e,
                },
            })?;

        let token = outcome
            .session
            .ok_or_else(|| Error::auth_failed("login response carried no session"))?;

        *self.session.write().await = Some(token);
        info!(url = %self.config.url, user = %self.config.username, "Logged in");
        Ok(())
    }

    /// End the session. Does nothing when not logged in.
    pub async fn logout(&self) -> Result<()> {
        let Some(token) = self.session.write().await.take() else {
            return Ok(());
        };
        self.send(Verb::Exec, LOGOUT_URL, &Value::Null, Some(&token))
            .await?;
        debug!("Logged out");
        Ok(())
    }

    /// Issue an authenticated call and return the result `data`.
    async fn call(&self, verb: Verb, url: &str, payload: Value) -> Result<Value> {
        let token = self
            .session
            .read()
            .await
            .clone()
            .ok_or(Error::NotAuthenticated)?;
        self.send(verb, url, &payload, Some(&token))
            .await
            .map(|outcome| outcome.data)
    }

    /// Send one request and interpret the response.
    async fn send(
        &self,
        verb: Verb,
        url: &str,
        payload: &Value,
        session: Option<&str>,
    ) -> Result<RpcOutcome> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = protocol::request_body(id, verb, url, payload, session);
        debug!(id, method = %verb, url, "Sending request");

        let response = self
            .http_client
            .post(self.endpoint.as_str())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| protocol::extract_error_message(&v))
                .unwrap_or_else(|| text.chars().take(MAX_ERROR_BODY).collect());
            return Err(Error::http_status(status.as_u16(), url, message));
        }

        let decoded: Value = serde_json::from_str(&text)
            .map_err(|e| Error::malformed_response(url, format!("invalid JSON: {e}")))?;

        protocol::interpret(&decoded, url)
    }
}

#[async_trait]
impl RemoteApi for JsonRpcClient {
    async fn get(&self, url: &str, params: Value) -> Result<Value> {
        self.call(Verb::Get, url, params).await
    }

    async fn add(&self, url: &str, data: Value) -> Result<Value> {
        self.call(Verb::Add, url, data).await
    }

    async fn update(&self, url: &str, data: Value) -> Result<Value> {
        self.call(Verb::Update, url, data).await
    }

    async fn exec(&self, url: &str, data: Value) -> Result<Value> {
        self.call(Verb::Exec, url, data).await
    }
}
