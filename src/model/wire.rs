use serde::Serialize;

use crate::config::GenerationSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpstreamRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpstreamMessage {
    pub role: UpstreamRole,
    pub parts: Vec<Part>,
}

impl UpstreamMessage {
    pub fn new(role: UpstreamRole, text: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![Part { text: text.into() }],
        }
    }

    /// Text of the first part; messages built here always carry exactly one.
    #[cfg(test)]
    pub fn text(&self) -> &str {
        self.parts.first().map(|p| p.text.as_str()).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemInstruction {
    pub parts: Vec<Part>,
}

/// Body of `models/{model}:generateContent`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<UpstreamMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<SystemInstruction>,
    pub generation_config: GenerationSettings,
}

impl GenerateContentRequest {
    pub fn new(
        contents: Vec<UpstreamMessage>,
        instruction: Option<String>,
        generation_config: GenerationSettings,
    ) -> Self {
        Self {
            contents,
            system_instruction: instruction.map(|text| SystemInstruction {
                parts: vec![Part { text }],
            }),
            generation_config,
        }
    }
}

/// Body of the text-to-speech `text:synthesize` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesizeRequest {
    pub input: SynthesisInput,
    pub voice: VoiceSelection,
    pub audio_config: AudioConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesisInput {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceSelection {
    pub language_code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioConfig {
    pub audio_encoding: String,
}

impl SynthesizeRequest {
    pub fn mp3(text: impl Into<String>, language_code: &str, voice: &str) -> Self {
        Self {
            input: SynthesisInput { text: text.into() },
            voice: VoiceSelection {
                language_code: language_code.to_string(),
                name: voice.to_string(),
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3".to_string(),
            },
        }
    }
}
