// src/routes/ai_routes.rs

use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{ApiOk, AppState},
    session::{ChatMessage, ChatRole},
    settings::connected_webhook_url,
    webhook::{request, WebhookEvent},
};

const NOT_CONFIGURED_REPLY: &str =
    "Desculpe, a conexão com a IA não está configurada. Verifique as configurações.";
const MISSING_OUTPUT: &str = "A resposta da IA não continha o campo 'output'.";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/chat", get(chat_console))
        .route("/messages", get(list_messages).post(send_prompt))
}

#[derive(Debug, Serialize)]
pub struct ChatConsole {
    pub url: String,
}

pub async fn chat_console(
    State(state): State<AppState>,
    _auth: AuthContext,
) -> Result<Json<ApiOk<ChatConsole>>, ApiError> {
    let url = state.chat_console_url.clone().ok_or_else(|| {
        ApiError::ServiceUnavailable(
            "CHAT_NOT_CONFIGURED",
            "CHAT_CONSOLE_URL is not configured".into(),
        )
    })?;
    Ok(Json(ApiOk {
        data: ChatConsole { url },
    }))
}

pub async fn list_messages(
    _state: State<AppState>,
    auth: AuthContext,
) -> Result<Json<ApiOk<Vec<ChatMessage>>>, ApiError> {
    Ok(Json(ApiOk {
        data: auth.session.ai_transcript,
    }))
}

#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    pub prompt: String,
}

fn apology(err: &ApiError) -> String {
    match err {
        ApiError::ServiceUnavailable(..) => NOT_CONFIGURED_REPLY.to_string(),
        ApiError::BadGateway(_, msg) => format!("Desculpe, ocorreu um erro: {msg}"),
        _ => "Desculpe, ocorreu um erro: Ocorreu um erro desconhecido.".to_string(),
    }
}

async fn append(state: &AppState, key: &str, role: ChatRole, content: String) -> Result<(), ApiError> {
    state
        .with_session(key, |s| s.ai_transcript.push(ChatMessage { role, content }))
        .await
}

/// Ask the assistant. The reply (or an apology) is appended to the
/// session transcript.
pub async fn send_prompt(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<PromptRequest>,
) -> Result<Json<ApiOk<ChatMessage>>, ApiError> {
    let prompt = req.prompt.trim().to_string();
    if prompt.is_empty() {
        return Err(ApiError::validation("prompt must not be empty"));
    }
    append(&state, &auth.session_key, ChatRole::User, prompt.clone()).await?;

    let url = connected_webhook_url(&state.services.read().await);
    let outcome = request(&state, url.as_deref(), WebhookEvent::AiPrompt { prompt })
        .await
        .and_then(|body| {
            body.get("output")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| ApiError::BadGateway("AI_BAD_RESPONSE", MISSING_OUTPUT.into()))
        });

    match outcome {
        Ok(output) => {
            let reply = ChatMessage {
                role: ChatRole::Ai,
                content: output,
            };
            append(&state, &auth.session_key, reply.role, reply.content.clone()).await?;
            Ok(Json(ApiOk { data: reply }))
        }
        Err(e) => {
            tracing::warn!(error = ?e, "ai prompt failed");
            append(&state, &auth.session_key, ChatRole::Ai, apology(&e)).await?;
            Err(e)
        }
    }
}
