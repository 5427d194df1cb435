use actix_web::{web, HttpResponse, Responder};
use futures_util::StreamExt;
use log::{error, info, warn};
use serde_json::json;
use uuid::Uuid;

use crate::chat;
use crate::config::GenerationSettings;
use crate::error::ApiError;
use crate::model::speech::decode_audio;
use crate::model::wire::{GenerateContentRequest, SynthesizeRequest, UpstreamMessage, UpstreamRole};
use crate::model::UpstreamError;
use crate::web::models::{
    ChatRequest, ChatResponse, ConfigResponse, DiagResponse, SpeechRequest, TokenResponse,
};
use crate::AppState;

const DIAG_PROMPT: &str = "Teste diagnóstico: responda apenas 'ok'";
// text:synthesize rejects inputs above 5000 bytes.
const MAX_SPEECH_BYTES: usize = 5000;

// Service status descriptor
pub async fn index(data: web::Data<AppState>) -> impl Responder {
    let config = &data.config;
    let mut endpoints = json!({
        "/text/chat": "Endpoint principal do chat",
        "/text/token": "Retorna API key",
        "/text/config": "Retorna configurações",
        "/text/diag": "Diagnóstico da integração com o modelo",
    });
    if config.tts_enabled {
        endpoints["/text/tts"] = json!("Síntese de voz (audio/mpeg)");
    }

    HttpResponse::Ok().json(json!({
        "status": "online",
        "service": format!("{} Backend", config.variant.assistant_name()),
        "endpoints": endpoints,
    }))
}

// Health check endpoint
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

/// Drains the request body, stopping at `limit` bytes.
async fn read_body(mut payload: web::Payload, limit: usize) -> Result<web::BytesMut, ApiError> {
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| ApiError::Validation(format!("Falha ao ler o corpo da requisição: {}", e)))?;
        if body.len() + chunk.len() > limit {
            return Err(ApiError::PayloadTooLarge { limit });
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

// Chat API endpoint. The body is read as JSON whatever its content type.
pub async fn chat(data: web::Data<AppState>, payload: web::Payload) -> Result<HttpResponse, ApiError> {
    let request_id = Uuid::new_v4();
    let body = read_body(payload, data.config.max_body_bytes).await.map_err(|e| {
        warn!("[{}] Rejected chat body: {}", request_id, e);
        e
    })?;
    let request = ChatRequest::from_slice(&body).map_err(|e| {
        warn!("[{}] Rejected chat body: {}", request_id, e);
        e
    })?;

    let answer = chat::handle_chat(&data.config, data.models.generator.as_ref(), &request, request_id).await?;
    Ok(HttpResponse::Ok().json(ChatResponse { answer }))
}

pub async fn token(data: web::Data<AppState>) -> impl Responder {
    info!("API key requested (key {})", data.config.masked_key());
    HttpResponse::Ok().json(TokenResponse {
        token: data.config.api_key.clone(),
    })
}

pub async fn config(data: web::Data<AppState>) -> impl Responder {
    let config = &data.config;
    HttpResponse::Ok().json(ConfigResponse {
        variant: config.variant,
        model: config.model.clone(),
        system_instruction: config.system_instruction.clone(),
        generation_config: GenerationSettings::NORMAL,
        accessibility_generation_config: GenerationSettings::ACCESSIBILITY,
        tts_enabled: config.tts_enabled,
    })
}

// Always 200; `ok` tells whether the upstream round trip worked.
pub async fn diag(data: web::Data<AppState>) -> impl Responder {
    let config = &data.config;
    let request = GenerateContentRequest::new(
        vec![UpstreamMessage::new(UpstreamRole::User, DIAG_PROMPT)],
        None,
        GenerationSettings::DIAGNOSTIC,
    );

    info!("[DIAG] Calling model {} with key {}", config.model, config.masked_key());
    let result = data
        .models
        .generator
        .generate(&config.model, &request, config.diag_timeout)
        .await;

    let mut response = DiagResponse {
        ok: false,
        model: config.model.clone(),
        key_prefix: config.masked_key(),
        response_sample: None,
        failure_type: None,
        code: None,
        body: None,
        error: None,
    };
    match result {
        Ok(sample) => {
            response.ok = true;
            response.response_sample = Some(sample);
        }
        Err(UpstreamError::Http { status, body, .. }) => {
            error!("[DIAG] Upstream error {}: {}", status, body);
            response.failure_type = Some("HTTPError".to_string());
            response.code = Some(status);
            response.body = Some(body);
        }
        Err(e) => {
            error!("[DIAG] {}", e);
            response.failure_type = Some("Other".to_string());
            response.error = Some(e.to_string());
        }
    }

    HttpResponse::Ok().json(response)
}

pub async fn tts(data: web::Data<AppState>, payload: web::Payload) -> Result<HttpResponse, ApiError> {
    let config = &data.config;
    if !config.tts_enabled {
        return Err(ApiError::SpeechDisabled);
    }

    let request_id = Uuid::new_v4();
    let body = read_body(payload, config.max_body_bytes).await?;
    let request: SpeechRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::Validation(format!("JSON inválido: {}", e)))?;
    let text = request
        .text
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("Campo 'text' é obrigatório".to_string()))?;
    if text.len() > MAX_SPEECH_BYTES {
        return Err(ApiError::Validation(format!(
            "Campo 'text' excede o limite de {} bytes",
            MAX_SPEECH_BYTES
        )));
    }

    let synthesize = SynthesizeRequest::mp3(text, &config.tts_language, &config.tts_voice);
    let response = data
        .models
        .speech
        .synthesize(&synthesize, config.upstream_timeout)
        .await
        .map_err(|e| {
            error!("[{}] Speech upstream failure: {}", request_id, e);
            ApiError::from(e)
        })?;

    match decode_audio(&response) {
        Some(audio) => {
            info!("[{}] Synthesized {} bytes of audio", request_id, audio.len());
            Ok(HttpResponse::Ok().content_type("audio/mpeg").body(audio))
        }
        None => {
            warn!("[{}] Speech response without audio: {}", request_id, response);
            Err(ApiError::Extraction { raw: response })
        }
    }
}
