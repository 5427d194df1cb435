use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{GenerationSettings, Variant};
use crate::error::ApiError;

/// One prior exchange, as sent by the frontend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: String,
    pub content: String,
}

impl ConversationTurn {
    pub fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
        }
    }

    /// Entries without a string `role` and `content` are rejected.
    fn from_value(value: &Value) -> Option<Self> {
        let role = value.get("role")?.as_str()?;
        let content = value.get("content")?.as_str()?;
        Some(Self::new(role, content))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Normal,
    Accessibility,
}

impl Mode {
    /// Unrecognised names select the normal profile.
    pub fn parse(name: Option<&str>) -> Self {
        match name.map(|n| n.trim().to_ascii_lowercase()).as_deref() {
            Some("accessibility") | Some("acessibilidade") => Mode::Accessibility,
            _ => Mode::Normal,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub prompt: Option<String>,
    pub history: Vec<ConversationTurn>,
    pub mode: Mode,
}

impl ChatRequest {
    #[cfg(test)]
    pub fn new(prompt: &str, history: Vec<ConversationTurn>, mode: Mode) -> Self {
        Self {
            prompt: Some(prompt.to_string()),
            history,
            mode,
        }
    }

    /// Parses a request body. Malformed history entries are skipped, not fatal.
    pub fn from_slice(body: &[u8]) -> Result<Self, ApiError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| ApiError::Validation(format!("JSON inválido: {}", e)))?;
        if !value.is_object() {
            return Err(ApiError::Validation("O corpo da requisição deve ser um objeto JSON".to_string()));
        }
        Ok(Self::from_value(&value))
    }

    pub fn from_value(value: &Value) -> Self {
        let history = value
            .get("history")
            .and_then(|h| h.as_array())
            .map(|turns| turns.iter().filter_map(ConversationTurn::from_value).collect())
            .unwrap_or_default();

        Self {
            prompt: value.get("prompt").and_then(|p| p.as_str()).map(str::to_string),
            history,
            mode: Mode::parse(value.get("mode").and_then(|m| m.as_str())),
        }
    }

    /// The prompt, provided it is present and not blank.
    pub fn prompt(&self) -> Result<&str, ApiError> {
        match self.prompt.as_deref() {
            Some(p) if !p.trim().is_empty() => Ok(p),
            _ => Err(ApiError::missing_prompt()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SpeechRequest {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    pub variant: Variant,
    pub model: String,
    pub system_instruction: String,
    pub generation_config: GenerationSettings,
    pub accessibility_generation_config: GenerationSettings,
    pub tts_enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct DiagResponse {
    pub ok: bool,
    pub model: String,
    pub key_prefix: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_sample: Option<Value>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub failure_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
