use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::info;
use reqwest::Client;
use serde_json::Value;

use super::wire::SynthesizeRequest;
use super::{post_json, UpstreamError};

#[async_trait]
pub trait SpeechBackend: Send + Sync {
    async fn synthesize(&self, request: &SynthesizeRequest, timeout: Duration) -> Result<Value, UpstreamError>;
}

/// Google Cloud Text-to-Speech over REST, authenticated with the same API key.
pub struct GoogleSpeech {
    base_url: String,
    api_key: String,
    client: Client,
}

impl GoogleSpeech {
    pub fn new(client: Client, base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
        }
    }
}

#[async_trait]
impl SpeechBackend for GoogleSpeech {
    async fn synthesize(&self, request: &SynthesizeRequest, timeout: Duration) -> Result<Value, UpstreamError> {
        let url = format!("{}/v1/text:synthesize", self.base_url);
        info!("Synthesizing {} characters with voice {}", request.input.text.chars().count(), request.voice.name);

        post_json(&self.client, &url, &self.api_key, request, timeout).await
    }
}

/// Decodes `audioContent` from a synthesize response. `None` when missing,
/// empty or not valid base64.
pub fn decode_audio(response: &Value) -> Option<Vec<u8>> {
    let encoded = response.get("audioContent").and_then(|a| a.as_str())?;
    let bytes = STANDARD.decode(encoded).ok()?;
    if bytes.is_empty() {
        None
    } else {
        Some(bytes)
    }
}
