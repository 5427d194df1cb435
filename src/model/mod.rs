pub mod speech;
pub mod wire;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::config::AppConfig;
use speech::{GoogleSpeech, SpeechBackend};
use wire::GenerateContentRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Timeout,
    Connect,
    Other,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportKind::Timeout => "timeout",
            TransportKind::Connect => "connect",
            TransportKind::Other => "request",
        };
        f.write_str(name)
    }
}

/// Failure talking to an upstream Google API.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream returned {status} {reason}")]
    Http { status: u16, reason: String, body: String },

    #[error("{kind}: {message}")]
    Transport { kind: TransportKind, message: String },
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            TransportKind::Timeout
        } else if e.is_connect() {
            TransportKind::Connect
        } else {
            TransportKind::Other
        };
        // The request URL carries the credential in its query string.
        let message = e.without_url().to_string();
        UpstreamError::Transport { kind, message }
    }
}

/// Text generation endpoint. One call per user request, never retried.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Returns the decoded 2xx body. A body that is not JSON comes back as
    /// `Value::String` so callers can still report it.
    async fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
        timeout: Duration,
    ) -> Result<Value, UpstreamError>;
}

// A wrapper for the Gemini generateContent API
pub struct GeminiModel {
    base_url: String,
    api_key: String,
    client: Client,
}

impl GeminiModel {
    pub fn new(client: Client, base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
        }
    }

    pub fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl GenerationBackend for GeminiModel {
    async fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
        timeout: Duration,
    ) -> Result<Value, UpstreamError> {
        let url = self.endpoint(model);
        info!("Calling {} with {} context messages", model, request.contents.len());

        post_json(&self.client, &url, &self.api_key, request, timeout).await
    }
}

/// POSTs `body` with the credential in the query string. Non-2xx statuses
/// become `UpstreamError::Http`; a 2xx body that is not JSON comes back as
/// `Value::String`.
pub(crate) async fn post_json<T: Serialize + ?Sized>(
    client: &Client,
    url: &str,
    api_key: &str,
    body: &T,
    timeout: Duration,
) -> Result<Value, UpstreamError> {
    let response = client
        .post(url)
        .query(&[("key", api_key)])
        .timeout(timeout)
        .json(body)
        .send()
        .await?;

    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(UpstreamError::Http {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            body: text,
        });
    }

    debug!("Response body: {}", text);
    Ok(decode_body(text))
}

fn decode_body(body: String) -> Value {
    match serde_json::from_str(&body) {
        Ok(value) => value,
        Err(_) => Value::String(body),
    }
}

/// Upstream clients shared by every request handler.
pub struct ModelManager {
    pub generator: Arc<dyn GenerationBackend>,
    pub speech: Arc<dyn SpeechBackend>,
}

impl ModelManager {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(config.upstream_timeout)
            .build()?;

        info!(
            "Using {} for model {} (key {})",
            config.gemini_base_url,
            config.model,
            config.masked_key()
        );

        Ok(Self {
            generator: Arc::new(GeminiModel::new(client.clone(), &config.gemini_base_url, &config.api_key)),
            speech: Arc::new(GoogleSpeech::new(client, &config.tts_base_url, &config.api_key)),
        })
    }

    #[cfg(test)]
    pub fn with_backends(generator: Arc<dyn GenerationBackend>, speech: Arc<dyn SpeechBackend>) -> Self {
        Self { generator, speech }
    }
}
