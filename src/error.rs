use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::model::UpstreamError;

/// Displayed to the user whenever the upstream call fails.
pub const APOLOGY: &str = "Desculpe, tive um problema técnico ao consultar a IA. Tente novamente em instantes.";

pub const EMPTY_RESPONSE: &str = "Resposta vazia ou bloqueada pelo modelo";

/// Everything a handler can fail with. Each variant maps to one stable JSON shape.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("{}", EMPTY_RESPONSE)]
    Extraction { raw: Value },

    #[error("Síntese de voz não está habilitada neste serviço")]
    SpeechDisabled,

    #[error("O corpo da requisição excede o limite de {limit} bytes")]
    PayloadTooLarge { limit: usize },
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ApiError {
    pub fn missing_prompt() -> Self {
        ApiError::Validation("Campo 'prompt' é obrigatório".to_string())
    }

    pub fn body(&self) -> ErrorBody {
        match self {
            ApiError::Validation(_) | ApiError::SpeechDisabled | ApiError::PayloadTooLarge { .. } => ErrorBody {
                answer: None,
                error: self.to_string(),
                details: None,
            },
            ApiError::Upstream(UpstreamError::Http { status, reason, body }) => ErrorBody {
                answer: Some(APOLOGY.to_string()),
                error: format!("{} {}", status, reason).trim_end().to_string(),
                details: Some(Value::String(body.clone())),
            },
            ApiError::Upstream(UpstreamError::Transport { kind, .. }) => ErrorBody {
                answer: Some(APOLOGY.to_string()),
                error: self.to_string(),
                details: Some(json!({ "kind": kind.to_string() })),
            },
            ApiError::Extraction { raw } => ErrorBody {
                answer: Some(APOLOGY.to_string()),
                error: self.to_string(),
                details: Some(raw.clone()),
            },
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::SpeechDisabled => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Upstream(_) | ApiError::Extraction { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self.body())
    }
}
