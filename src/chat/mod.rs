//! Chat request translation: frontend conversation in, answer text out.
//!
//! Each call is independent. The only suspension point is the single
//! upstream request, which is bounded by the configured timeout.

pub mod scope;

use log::{error, info, warn};
use serde_json::Value;
use uuid::Uuid;

use crate::config::{AppConfig, GenerationSettings};
use crate::error::ApiError;
use crate::model::wire::{GenerateContentRequest, UpstreamMessage, UpstreamRole};
use crate::model::{GenerationBackend, UpstreamError};
use crate::web::models::{ChatRequest, ConversationTurn, Mode};

const ACCESSIBILITY_RULES: &str = "

MODO ACESSIBILIDADE
- Use frases curtas e palavras simples.
- Apresente uma ideia por frase.
- Organize respostas longas em passos numerados.
- Não use expressões de preenchimento como \"Claro!\", \"Ótima pergunta!\", \"Com certeza!\" ou \"Espero ter ajudado\".
- Não use emojis nem símbolos decorativos.";

const FIRST_TURN_GREETING: &str =
    "\n- Esta é a primeira mensagem da conversa: você pode se apresentar com uma saudação curta.";

const NO_GREETING: &str = "\n- A conversa já começou: não cumprimente o usuário novamente e não use saudações como \"Olá\", \"Oi\", \"Bom dia\", \"Boa tarde\" ou \"Boa noite\". Responda direto.";

const FALLBACK_MAX_DEPTH: usize = 8;
const FALLBACK_MAX_NODES: usize = 256;

/// Only `assistant` turns belong to the model.
pub fn upstream_role(role: &str) -> UpstreamRole {
    if role == "assistant" {
        UpstreamRole::Model
    } else {
        UpstreamRole::User
    }
}

/// History in order, then the prompt as the final user message.
pub fn assemble_messages(history: &[ConversationTurn], prompt: &str) -> Vec<UpstreamMessage> {
    history
        .iter()
        .map(|turn| UpstreamMessage::new(upstream_role(&turn.role), turn.content.as_str()))
        .chain(std::iter::once(UpstreamMessage::new(UpstreamRole::User, prompt)))
        .collect()
}

pub fn select_instruction(base: &str, mode: Mode, first_turn: bool) -> String {
    match mode {
        Mode::Normal => base.to_string(),
        Mode::Accessibility => {
            let greeting = if first_turn { FIRST_TURN_GREETING } else { NO_GREETING };
            format!("{}{}{}", base, ACCESSIBILITY_RULES, greeting)
        }
    }
}

pub fn generation_settings(mode: Mode) -> GenerationSettings {
    match mode {
        Mode::Normal => GenerationSettings::NORMAL,
        Mode::Accessibility => GenerationSettings::ACCESSIBILITY,
    }
}

pub fn build_request(
    config: &AppConfig,
    prompt: &str,
    history: &[ConversationTurn],
    mode: Mode,
) -> GenerateContentRequest {
    GenerateContentRequest::new(
        assemble_messages(history, prompt),
        Some(select_instruction(&config.system_instruction, mode, history.is_empty())),
        generation_settings(mode),
    )
}

/// Reads `candidates[0].content.parts[0].text`, then falls back to a bounded
/// search of the `candidates` subtree. Blank text counts as missing.
pub fn extract_answer(response: &Value) -> Option<String> {
    primary_answer(response).or_else(|| {
        let mut budget = FALLBACK_MAX_NODES;
        response
            .get("candidates")
            .and_then(|candidates| find_text(candidates, 0, &mut budget))
    })
}

fn primary_answer(response: &Value) -> Option<String> {
    response
        .get("candidates")
        .and_then(|candidates| candidates.get(0))
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(|parts| parts.get(0))
        .and_then(|part| part.get("text"))
        .and_then(|text| text.as_str())
        .filter(|text| !text.trim().is_empty())
        .map(str::to_string)
}

fn find_text(value: &Value, depth: usize, budget: &mut usize) -> Option<String> {
    if depth > FALLBACK_MAX_DEPTH || *budget == 0 {
        return None;
    }
    *budget -= 1;

    match value {
        Value::Object(map) => {
            if let Some(text) = map
                .get("text")
                .and_then(|t| t.as_str())
                .filter(|t| !t.trim().is_empty())
            {
                return Some(text.to_string());
            }
            map.values().find_map(|child| find_text(child, depth + 1, budget))
        }
        Value::Array(items) => items.iter().find_map(|item| find_text(item, depth + 1, budget)),
        _ => None,
    }
}

/// Runs one chat exchange against the upstream model.
pub async fn handle_chat(
    config: &AppConfig,
    backend: &dyn GenerationBackend,
    request: &ChatRequest,
    request_id: Uuid,
) -> Result<String, ApiError> {
    let prompt = request.prompt()?;

    let in_scope = scope::is_in_scope(prompt, &config.keywords);
    info!(
        "[{}] Chat request: {} history turns, mode {:?}, in scope: {}",
        request_id,
        request.history.len(),
        request.mode,
        in_scope
    );
    if config.scope_filter && !in_scope {
        info!("[{}] Off-topic prompt, answering with refusal", request_id);
        return Ok(config.refusal.clone());
    }

    let body = build_request(config, prompt, &request.history, request.mode);
    let response = backend
        .generate(&config.model, &body, config.upstream_timeout)
        .await
        .map_err(|e| {
            match &e {
                UpstreamError::Http { status, body, .. } => {
                    error!("[{}] Upstream error {}: {}", request_id, status, body)
                }
                UpstreamError::Transport { .. } => error!("[{}] Upstream unreachable: {}", request_id, e),
            }
            ApiError::from(e)
        })?;

    match extract_answer(&response) {
        Some(answer) => {
            info!("[{}] Answer length: {} characters", request_id, answer.chars().count());
            Ok(answer)
        }
        None => {
            warn!("[{}] Empty or blocked response: {}", request_id, response);
            Err(ApiError::Extraction { raw: response })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::testing::{Reply, StubGenerator};
    use serde_json::json;

    fn turns(pairs: &[(&str, &str)]) -> Vec<ConversationTurn> {
        pairs.iter().map(|(r, c)| ConversationTurn::new(r, c)).collect()
    }

    #[test]
    fn assembly_keeps_order_and_appends_prompt() {
        let history = turns(&[("user", "a"), ("assistant", "b"), ("user", "c"), ("system", "d")]);
        let messages = assemble_messages(&history, "e");

        assert_eq!(messages.len(), history.len() + 1);
        let texts: Vec<&str> = messages.iter().map(|m| m.text()).collect();
        assert_eq!(texts, vec!["a", "b", "c", "d", "e"]);
        let roles: Vec<UpstreamRole> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                UpstreamRole::User,
                UpstreamRole::Model,
                UpstreamRole::User,
                UpstreamRole::User,
                UpstreamRole::User
            ]
        );
    }

    #[test]
    fn only_assistant_maps_to_model() {
        assert_eq!(upstream_role("assistant"), UpstreamRole::Model);
        assert_eq!(upstream_role("user"), UpstreamRole::User);
        assert_eq!(upstream_role("model"), UpstreamRole::User);
        assert_eq!(upstream_role("Assistant"), UpstreamRole::User);
    }

    #[test]
    fn normal_mode_uses_base_instruction() {
        assert_eq!(select_instruction("base", Mode::Normal, true), "base");
        assert_eq!(select_instruction("base", Mode::Normal, false), "base");
    }

    #[test]
    fn accessibility_greets_only_on_first_turn() {
        let first = select_instruction("base", Mode::Accessibility, true);
        assert!(first.starts_with("base"));
        assert!(first.contains("MODO ACESSIBILIDADE"));
        assert!(first.contains(FIRST_TURN_GREETING));
        assert!(!first.contains(NO_GREETING));

        let later = select_instruction("base", Mode::Accessibility, false);
        assert!(later.contains("MODO ACESSIBILIDADE"));
        assert!(later.contains(NO_GREETING));
        assert!(!later.contains(FIRST_TURN_GREETING));
    }

    #[test]
    fn accessibility_is_cooler_and_longer() {
        let normal = generation_settings(Mode::Normal);
        let access = generation_settings(Mode::Accessibility);
        assert!(access.temperature < normal.temperature);
        assert!(access.max_output_tokens > normal.max_output_tokens);
    }

    #[test]
    fn extracts_documented_path() {
        let response = json!({"candidates":[{"content":{"parts":[{"text":"240 horas"}]}}]});
        assert_eq!(extract_answer(&response).as_deref(), Some("240 horas"));
    }

    #[test]
    fn missing_answer_yields_none() {
        for response in [
            json!({}),
            json!({ "candidates": [] }),
            json!({ "candidates": [{ "finishReason": "SAFETY" }] }),
            json!({ "promptFeedback": { "blockReason": "SAFETY" } }),
            json!({ "candidates": [{ "content": { "parts": [{ "text": "  " }] } }] }),
            json!("not an object"),
            json!({ "candidates": "weird" }),
        ] {
            assert_eq!(extract_answer(&response), None, "{response}");
        }
    }

    #[test]
    fn fallback_finds_text_in_unexpected_shape() {
        let response = json!({
            "candidates": [{ "content": { "parts": [{ "inlineData": {} }, { "text": "segunda parte" }] } }]
        });
        assert_eq!(extract_answer(&response).as_deref(), Some("segunda parte"));
    }

    #[test]
    fn fallback_depth_is_bounded() {
        let mut nested = json!({ "text": "fundo demais" });
        for _ in 0..20 {
            nested = json!({ "inner": nested });
        }
        let response = json!({ "candidates": [nested] });
        assert_eq!(extract_answer(&response), None);
    }

    #[test]
    fn fallback_node_budget_is_bounded() {
        let filler: Vec<Value> = (0..FALLBACK_MAX_NODES).map(|_| json!({})).collect();
        let mut candidates = filler;
        candidates.push(json!({ "text": "tarde demais" }));
        let response = json!({ "candidates": candidates });
        assert_eq!(extract_answer(&response), None);
    }

    #[tokio::test]
    async fn round_trip_answer() {
        let config = test_config();
        let backend = StubGenerator::answering("240 horas");
        let request = ChatRequest::new("Qual a carga horária?", vec![], Mode::Normal);

        let answer = handle_chat(&config, &backend, &request, Uuid::new_v4()).await.unwrap();

        assert_eq!(answer, "240 horas");
        assert_eq!(backend.call_count(), 1);
        let body = backend.last_body();
        assert_eq!(body["contents"].as_array().unwrap().len(), 1);
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], json!(config.system_instruction));
        assert_eq!(body["generationConfig"], json!({ "temperature": 0.2, "maxOutputTokens": 512 }));
    }

    #[tokio::test]
    async fn history_pair_produces_three_contents() {
        let config = test_config();
        let backend = StubGenerator::answering("Fica na Ponte do Imaruim.");
        let request = ChatRequest::new(
            "E onde fica?",
            turns(&[("user", "Quais cursos tem?"), ("assistant", "Administração, Pedagogia...")]),
            Mode::Normal,
        );

        handle_chat(&config, &backend, &request, Uuid::new_v4()).await.unwrap();

        let body = backend.last_body();
        assert_eq!(
            body["contents"],
            json!([
                { "role": "user", "parts": [{ "text": "Quais cursos tem?" }] },
                { "role": "model", "parts": [{ "text": "Administração, Pedagogia..." }] },
                { "role": "user", "parts": [{ "text": "E onde fica?" }] }
            ])
        );
    }

    #[tokio::test]
    async fn accessibility_request_carries_its_profile() {
        let config = test_config();
        let backend = StubGenerator::answering("ok");
        let request = ChatRequest::new("Oi", turns(&[("user", "a"), ("assistant", "b")]), Mode::Accessibility);

        handle_chat(&config, &backend, &request, Uuid::new_v4()).await.unwrap();

        let body = backend.last_body();
        let instruction = body["systemInstruction"]["parts"][0]["text"].as_str().unwrap();
        assert!(instruction.contains(NO_GREETING));
        assert_eq!(body["generationConfig"], json!({ "temperature": 0.1, "maxOutputTokens": 1024 }));
    }

    #[tokio::test]
    async fn missing_prompt_never_calls_upstream() {
        let config = test_config();
        let backend = StubGenerator::answering("nunca");
        let request = ChatRequest { prompt: None, history: vec![], mode: Mode::Normal };

        let err = handle_chat(&config, &backend, &request, Uuid::new_v4()).await.unwrap_err();

        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn upstream_http_error_is_translated() {
        let config = test_config();
        let backend = StubGenerator::new(Reply::Http(500, "{\"error\":\"boom\"}"));
        let request = ChatRequest::new("Oi", vec![], Mode::Normal);

        let err = handle_chat(&config, &backend, &request, Uuid::new_v4()).await.unwrap_err();

        assert!(matches!(err, ApiError::Upstream(UpstreamError::Http { status: 500, .. })));
        assert!(!err.body().answer.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn empty_candidates_is_an_extraction_error() {
        let config = test_config();
        let backend = StubGenerator::new(Reply::Json(json!({ "candidates": [] })));
        let request = ChatRequest::new("Oi", vec![], Mode::Normal);

        let err = handle_chat(&config, &backend, &request, Uuid::new_v4()).await.unwrap_err();

        match err {
            ApiError::Extraction { raw } => assert_eq!(raw, json!({ "candidates": [] })),
            other => panic!("expected extraction error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn scope_filter_short_circuits_off_topic_prompts() {
        let mut config = test_config();
        config.scope_filter = true;
        let backend = StubGenerator::answering("nunca");

        let off_topic = ChatRequest::new("Quem ganhou o jogo de futebol?", vec![], Mode::Normal);
        let answer = handle_chat(&config, &backend, &off_topic, Uuid::new_v4()).await.unwrap();
        assert_eq!(answer, config.refusal);
        assert_eq!(backend.call_count(), 0);

        let on_topic = ChatRequest::new("Quando abre o vestibular?", vec![], Mode::Normal);
        handle_chat(&config, &backend, &on_topic, Uuid::new_v4()).await.unwrap();
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn scope_filter_off_still_calls_upstream() {
        let config = test_config();
        let backend = StubGenerator::answering("resposta");
        let request = ChatRequest::new("Quem ganhou o jogo de futebol?", vec![], Mode::Normal);

        let answer = handle_chat(&config, &backend, &request, Uuid::new_v4()).await.unwrap();

        assert_eq!(answer, "resposta");
        assert_eq!(backend.call_count(), 1);
    }
}
