// src/routes/procedure_routes.rs

use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{ApiOk, AppState, Procedure, Saved},
    routes::required,
    store::{find_in, insert_front, new_id, replace, scoped},
    webhook::{deliver, ProcedurePayload, WebhookEvent},
};

const ALL_FIELDS_REQUIRED: &str = "Todos os campos são obrigatórios.";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/procedures", get(list_procedures).post(create_procedure))
        .route("/procedures/{procedure_id}", put(update_procedure))
}

#[derive(Debug, Deserialize)]
pub struct ProcedureRequest {
    pub name: String,
    pub description: String,
    #[serde(rename = "especialidadeId")]
    pub specialty_id: String,
}

/// Validate the form against the selected clinic's specialties.
async fn build_payload(
    state: &AppState,
    clinic_id: &str,
    id: Option<String>,
    req: &ProcedureRequest,
) -> Result<ProcedurePayload, ApiError> {
    let name = required(&req.name, ALL_FIELDS_REQUIRED)?;
    let description = required(&req.description, ALL_FIELDS_REQUIRED)?;
    let specialty_id = required(&req.specialty_id, ALL_FIELDS_REQUIRED)?;

    if find_in(&state.store.read().await.specialties, clinic_id, &specialty_id).is_none() {
        return Err(ApiError::validation("Especialidade selecionada é inválida."));
    }

    Ok(ProcedurePayload {
        id,
        name,
        description,
        specialty_id,
        clinic_id: clinic_id.to_string(),
    })
}

fn into_procedure(id: String, p: ProcedurePayload) -> Procedure {
    Procedure {
        id,
        name: p.name,
        description: p.description,
        specialty_id: p.specialty_id,
        clinic_id: p.clinic_id,
    }
}

pub async fn list_procedures(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ApiOk<Vec<Procedure>>>, ApiError> {
    let scope = auth.session.clinic_scope()?;
    let data = scoped(&state.store.read().await.procedures, scope);
    Ok(Json(ApiOk { data }))
}

pub async fn create_procedure(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<ProcedureRequest>,
) -> Result<Json<Saved<Procedure>>, ApiError> {
    let clinic_id = auth.session.require_clinic()?;
    let payload = build_payload(&state, clinic_id, None, &req).await?;
    let delivery = deliver(&state, WebhookEvent::NewProcedure(payload.clone())).await?;

    let procedure = into_procedure(new_id("proc"), payload);
    insert_front(&mut state.store.write().await.procedures, procedure.clone());
    tracing::info!(procedure_id = %procedure.id, "procedure created");

    Ok(Json(Saved {
        data: procedure,
        delivery,
    }))
}

pub async fn update_procedure(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(procedure_id): Path<String>,
    Json(req): Json<ProcedureRequest>,
) -> Result<Json<Saved<Procedure>>, ApiError> {
    let clinic_id = auth.session.require_clinic()?;
    if find_in(&state.store.read().await.procedures, clinic_id, &procedure_id).is_none() {
        return Err(ApiError::not_found("procedure", &procedure_id));
    }

    let payload = build_payload(&state, clinic_id, Some(procedure_id.clone()), &req).await?;
    let delivery = deliver(&state, WebhookEvent::UpdateProcedure(payload.clone())).await?;

    let procedure = into_procedure(procedure_id, payload);
    if !replace(&mut state.store.write().await.procedures, procedure.clone()) {
        return Err(ApiError::not_found("procedure", &procedure.id));
    }
    tracing::info!(procedure_id = %procedure.id, "procedure updated");

    Ok(Json(Saved {
        data: procedure,
        delivery,
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::{json, Value};

    use crate::models::test_helpers::{test_state, RecordingWebhook};
    use crate::routes::test_support::send;

    #[tokio::test]
    async fn specialty_must_belong_to_selected_clinic() {
        let hook = RecordingWebhook::ok(Value::Null);
        let state = test_state(hook.clone());
        let (status, err) = send(
            &state,
            Method::POST,
            "/api/v1/procedures",
            Some(json!({"name": "Canal", "description": "Endodontia", "especialidadeId": "esp3"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["error"]["message"], "Especialidade selecionada é inválida.");
        assert!(hook.tags().is_empty());
    }

    #[tokio::test]
    async fn update_sends_remote_field_names() {
        let hook = RecordingWebhook::ok(Value::Null);
        let state = test_state(hook.clone());
        let (status, saved) = send(
            &state,
            Method::PUT,
            "/api/v1/procedures/proc1",
            Some(json!({"name": "Limpeza", "description": "Profilaxia", "especialidadeId": "esp2"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(saved["data"]["name"], "Limpeza");

        let calls = hook.calls.lock().unwrap();
        assert_eq!(calls[0]["tag"], "atualizar_procedimento");
        assert_eq!(calls[0]["id"], "proc1");
        assert_eq!(calls[0]["especialidadeId"], "esp2");
        assert_eq!(calls[0]["clinicaId"], "cli1");
    }
}
