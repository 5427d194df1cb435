//! Recording stand-ins for the upstream services.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::model::speech::SpeechBackend;
use crate::model::wire::{GenerateContentRequest, SynthesizeRequest};
use crate::model::{GenerationBackend, TransportKind, UpstreamError};

#[derive(Debug, Clone)]
pub enum Reply {
    Json(Value),
    Http(u16, &'static str),
    Timeout,
}

impl Reply {
    fn into_result(self) -> Result<Value, UpstreamError> {
        match self {
            Reply::Json(value) => Ok(value),
            Reply::Http(status, body) => Err(UpstreamError::Http {
                status,
                reason: "Error".to_string(),
                body: body.to_string(),
            }),
            Reply::Timeout => Err(UpstreamError::Transport {
                kind: TransportKind::Timeout,
                message: "operation timed out".to_string(),
            }),
        }
    }
}

pub struct StubGenerator {
    reply: Reply,
    pub calls: Mutex<Vec<(String, Value)>>,
}

impl StubGenerator {
    pub fn new(reply: Reply) -> Self {
        Self {
            reply,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn answering(text: &str) -> Self {
        Self::new(Reply::Json(serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": text }] } }]
        })))
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_body(&self) -> Value {
        self.calls.lock().unwrap().last().expect("no upstream call").1.clone()
    }
}

#[async_trait]
impl GenerationBackend for StubGenerator {
    async fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
        _timeout: Duration,
    ) -> Result<Value, UpstreamError> {
        let body = serde_json::to_value(request).unwrap();
        self.calls.lock().unwrap().push((model.to_string(), body));
        self.reply.clone().into_result()
    }
}

pub struct StubSpeech {
    reply: Reply,
    pub calls: Mutex<Vec<Value>>,
}

impl StubSpeech {
    pub fn new(reply: Reply) -> Self {
        Self {
            reply,
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SpeechBackend for StubSpeech {
    async fn synthesize(&self, request: &SynthesizeRequest, _timeout: Duration) -> Result<Value, UpstreamError> {
        self.calls.lock().unwrap().push(serde_json::to_value(request).unwrap());
        self.reply.clone().into_result()
    }
}
