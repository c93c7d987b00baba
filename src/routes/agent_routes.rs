// src/routes/agent_routes.rs

use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

use crate::{
    auth::{password_digest, validate_new_password},
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{Agent, AgentStatus, ApiOk, AppState, Saved, UserRole},
    routes::required,
    store::{find_in, insert_front, new_id, replace, scoped},
    webhook::{deliver, AgentPayload, WebhookEvent},
};

const NAME_AND_EMAIL_REQUIRED: &str = "Nome completo e e-mail são obrigatórios.";
const PASSWORD_REQUIRED: &str = "A senha é obrigatória para novos agentes.";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/agents", get(list_agents).post(create_agent))
        .route("/agents/{agent_id}", put(update_agent))
}

#[derive(Debug, Deserialize)]
pub struct AgentRequest {
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub role: Option<UserRole>,
    #[serde(default)]
    pub status: Option<AgentStatus>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(rename = "confirmPassword", default)]
    pub confirm_password: Option<String>,
}

/// Digest of the new password, if one was typed.
fn password_hash(req: &AgentRequest) -> Result<Option<String>, ApiError> {
    match req.password.as_deref().filter(|p| !p.is_empty()) {
        Some(password) => {
            let confirmation = req.confirm_password.as_deref().unwrap_or_default();
            validate_new_password(password, confirmation).map_err(ApiError::validation)?;
            Ok(Some(password_digest(password)))
        }
        None => Ok(None),
    }
}

pub async fn list_agents(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ApiOk<Vec<Agent>>>, ApiError> {
    let scope = auth.session.clinic_scope()?;
    let data = scoped(&state.store.read().await.agents, scope);
    Ok(Json(ApiOk { data }))
}

pub async fn create_agent(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<AgentRequest>,
) -> Result<Json<Saved<Agent>>, ApiError> {
    let clinic_id = auth.session.require_clinic()?;
    let full_name = required(&req.full_name, NAME_AND_EMAIL_REQUIRED)?;
    let email = required(&req.email, NAME_AND_EMAIL_REQUIRED)?;
    let password_hash = password_hash(&req)?.ok_or_else(|| ApiError::validation(PASSWORD_REQUIRED))?;

    let agent = Agent {
        id: new_id("age"),
        full_name,
        email,
        role: req.role.unwrap_or(UserRole::User),
        status: AgentStatus::Active,
        clinic_id: clinic_id.to_string(),
    };
    let payload = AgentPayload {
        id: None,
        full_name: agent.full_name.clone(),
        email: agent.email.clone(),
        role: agent.role,
        password_hash: Some(password_hash),
        clinic_id: agent.clinic_id.clone(),
    };
    let delivery = deliver(&state, WebhookEvent::NewAgent(payload)).await?;

    insert_front(&mut state.store.write().await.agents, agent.clone());
    tracing::info!(agent_id = %agent.id, role = ?agent.role, "agent created");

    Ok(Json(Saved {
        data: agent,
        delivery,
    }))
}

pub async fn update_agent(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(agent_id): Path<String>,
    Json(req): Json<AgentRequest>,
) -> Result<Json<Saved<Agent>>, ApiError> {
    let clinic_id = auth.session.require_clinic()?;
    let existing = find_in(&state.store.read().await.agents, clinic_id, &agent_id)
        .cloned()
        .ok_or_else(|| ApiError::not_found("agent", &agent_id))?;

    let agent = Agent {
        full_name: required(&req.full_name, NAME_AND_EMAIL_REQUIRED)?,
        email: required(&req.email, NAME_AND_EMAIL_REQUIRED)?,
        role: req.role.unwrap_or(existing.role),
        status: req.status.unwrap_or(existing.status),
        ..existing
    };
    let payload = AgentPayload {
        id: Some(agent.id.clone()),
        full_name: agent.full_name.clone(),
        email: agent.email.clone(),
        role: agent.role,
        password_hash: password_hash(&req)?,
        clinic_id: agent.clinic_id.clone(),
    };
    let delivery = deliver(&state, WebhookEvent::UpdateAgent(payload)).await?;

    if !replace(&mut state.store.write().await.agents, agent.clone()) {
        return Err(ApiError::not_found("agent", &agent.id));
    }
    tracing::info!(agent_id = %agent.id, status = ?agent.status, "agent updated");

    Ok(Json(Saved {
        data: agent,
        delivery,
    }))
}
