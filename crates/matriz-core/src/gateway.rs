//! HTTP access to the middleware.
//!
//! Every call carries an explicit timeout and returns a [`GatewayError`]
//! instead of propagating transport panics. Nothing here retries; the
//! schedulers retry by ticking again.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_MIDDLEWARE_URL: &str = "http://localhost:4000";

const BODY_SNIPPET_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorKind {
    Network,
    Protocol,
    Application,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Middleware unreachable or the call exceeded its timeout.
    #[error("network error on {path}: {message}")]
    Network {
        path: String,
        message: String,
        timed_out: bool,
    },
    /// Non-2xx status without an error payload, or a body that is not JSON.
    #[error("protocol error on {path}: {message}")]
    Protocol {
        path: String,
        status: Option<u16>,
        message: String,
    },
    /// Well-formed `{"error": "..."}` payload from the middleware.
    #[error("{message}")]
    Application { path: String, message: String },
}

impl GatewayError {
    pub fn kind(&self) -> GatewayErrorKind {
        match self {
            GatewayError::Network { .. } => GatewayErrorKind::Network,
            GatewayError::Protocol { .. } => GatewayErrorKind::Protocol,
            GatewayError::Application { .. } => GatewayErrorKind::Application,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            GatewayError::Network { path, .. }
            | GatewayError::Protocol { path, .. }
            | GatewayError::Application { path, .. } => path,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, GatewayError::Network { timed_out: true, .. })
    }

    pub fn protocol(path: &str, message: impl Into<String>) -> Self {
        GatewayError::Protocol {
            path: path.to_string(),
            status: None,
            message: message.into(),
        }
    }

    /// Short text for status lines; application errors show the server's
    /// own message verbatim.
    pub fn user_message(&self) -> String {
        match self {
            GatewayError::Application { message, .. } => message.clone(),
            GatewayError::Network {
                timed_out: true, ..
            } => "middleware did not answer in time".to_string(),
            GatewayError::Network { .. } => "middleware unreachable".to_string(),
            GatewayError::Protocol {
                status: Some(code), ..
            } => format!("middleware answered HTTP {code}"),
            GatewayError::Protocol { message, .. } => message.clone(),
        }
    }
}

/// Detects the middleware's `{"error": "..."}` payload shape.
pub fn application_error(path: &str, value: &Value) -> Option<GatewayError> {
    let message = value.as_object()?.get("error")?;
    let message = match message {
        Value::String(text) => text.clone(),
        Value::Null => return None,
        other => other.to_string(),
    };
    Some(GatewayError::Application {
        path: path.to_string(),
        message,
    })
}

#[async_trait]
pub trait Gateway: Send + Sync {
    async fn get(
        &self,
        path: &str,
        params: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<Value, GatewayError>;

    async fn post(&self, path: &str, timeout: Duration) -> Result<Value, GatewayError>;
}

/// [`Gateway`] backed by a shared `reqwest` client.
#[derive(Clone)]
pub struct HttpGateway {
    base_url: String,
    client: reqwest::Client,
}

impl HttpGateway {
    /// Fails only when the TLS backend cannot be initialised.
    pub fn new(base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("matriz-dashboard/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn execute(
        &self,
        path: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<Value, GatewayError> {
        let response = request
            .send()
            .await
            .map_err(|err| classify_reqwest_error(path, &err))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| classify_reqwest_error(path, &err))?;
        let parsed = serde_json::from_slice::<Value>(&body);

        if !status.is_success() {
            if let Ok(value) = &parsed {
                if let Some(err) = application_error(path, value) {
                    return Err(err);
                }
            }
            let snippet: String = String::from_utf8_lossy(&body)
                .chars()
                .take(BODY_SNIPPET_CHARS)
                .collect();
            return Err(GatewayError::Protocol {
                path: path.to_string(),
                status: Some(status.as_u16()),
                message: if snippet.is_empty() {
                    format!("HTTP {}", status.as_u16())
                } else {
                    format!("HTTP {}: {snippet}", status.as_u16())
                },
            });
        }

        parsed.map_err(|err| GatewayError::Protocol {
            path: path.to_string(),
            status: Some(status.as_u16()),
            message: format!("malformed json: {err}"),
        })
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn get(
        &self,
        path: &str,
        params: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<Value, GatewayError> {
        debug!(path, ?timeout, "gateway_get");
        let request = self.client.get(self.url(path)).query(params).timeout(timeout);
        self.execute(path, request).await
    }

    async fn post(&self, path: &str, timeout: Duration) -> Result<Value, GatewayError> {
        debug!(path, ?timeout, "gateway_post");
        let request = self.client.post(self.url(path)).timeout(timeout);
        self.execute(path, request).await
    }
}

fn classify_reqwest_error(path: &str, err: &reqwest::Error) -> GatewayError {
    if err.is_decode() {
        return GatewayError::protocol(path, err.to_string());
    }
    GatewayError::Network {
        path: path.to_string(),
        message: err.to_string(),
        timed_out: err.is_timeout(),
    }
}
