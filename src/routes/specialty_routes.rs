// src/routes/specialty_routes.rs

use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{ApiOk, AppState, Saved, Specialty},
    routes::required,
    store::{find_in, insert_front, new_id, replace, scoped},
    webhook::{deliver, SpecialtyPayload, WebhookEvent},
};

const ALL_FIELDS_REQUIRED: &str = "Todos os campos são obrigatórios.";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/specialties", get(list_specialties).post(create_specialty))
        .route("/specialties/{specialty_id}", put(update_specialty))
}

#[derive(Debug, Deserialize)]
pub struct SpecialtyRequest {
    pub name: String,
    pub description: String,
}

pub async fn list_specialties(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ApiOk<Vec<Specialty>>>, ApiError> {
    let scope = auth.session.clinic_scope()?;
    let data = scoped(&state.store.read().await.specialties, scope);
    Ok(Json(ApiOk { data }))
}

pub async fn create_specialty(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<SpecialtyRequest>,
) -> Result<Json<Saved<Specialty>>, ApiError> {
    let clinic_id = auth.session.require_clinic()?.to_string();
    let payload = SpecialtyPayload {
        id: None,
        name: required(&req.name, ALL_FIELDS_REQUIRED)?,
        description: required(&req.description, ALL_FIELDS_REQUIRED)?,
        clinic_id,
    };
    let delivery = deliver(&state, WebhookEvent::NewSpecialty(payload.clone())).await?;

    let specialty = Specialty {
        id: new_id("esp"),
        name: payload.name,
        description: payload.description,
        clinic_id: payload.clinic_id,
    };
    insert_front(&mut state.store.write().await.specialties, specialty.clone());
    tracing::info!(specialty_id = %specialty.id, clinic_id = %specialty.clinic_id, "specialty created");

    Ok(Json(Saved {
        data: specialty,
        delivery,
    }))
}

pub async fn update_specialty(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(specialty_id): Path<String>,
    Json(req): Json<SpecialtyRequest>,
) -> Result<Json<Saved<Specialty>>, ApiError> {
    let clinic_id = auth.session.require_clinic()?.to_string();
    if find_in(&state.store.read().await.specialties, &clinic_id, &specialty_id).is_none() {
        return Err(ApiError::not_found("specialty", &specialty_id));
    }

    let payload = SpecialtyPayload {
        id: Some(specialty_id.clone()),
        name: required(&req.name, ALL_FIELDS_REQUIRED)?,
        description: required(&req.description, ALL_FIELDS_REQUIRED)?,
        clinic_id,
    };
    let delivery = deliver(&state, WebhookEvent::UpdateSpecialty(payload.clone())).await?;

    let specialty = Specialty {
        id: specialty_id,
        name: payload.name,
        description: payload.description,
        clinic_id: payload.clinic_id,
    };
    if !replace(&mut state.store.write().await.specialties, specialty.clone()) {
        return Err(ApiError::not_found("specialty", &specialty.id));
    }
    tracing::info!(specialty_id = %specialty.id, "specialty updated");

    Ok(Json(Saved {
        data: specialty,
        delivery,
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::{json, Value};

    use crate::models::test_helpers::{test_state, RecordingWebhook};
    use crate::routes::test_support::{get, send};
    use crate::settings::ServiceStatus;

    #[tokio::test]
    async fn list_is_scoped_to_selected_clinic() {
        let state = test_state(RecordingWebhook::ok(Value::Null));
        let (_, body) = get(&state, "/api/v1/specialties").await;
        let ids: Vec<_> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["esp1", "esp2"]);
    }

    #[tokio::test]
    async fn disconnected_webhook_saves_locally() {
        let hook = RecordingWebhook::ok(Value::Null);
        let state = test_state(hook.clone());
        state.services.write().await[0].status = ServiceStatus::Disconnected;

        let (status, saved) = send(
            &state,
            Method::POST,
            "/api/v1/specialties",
            Some(json!({"name": "Implantodontia", "description": "Implantes"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(saved["delivery"], "local_only");
        assert_eq!(saved["data"]["clinicaId"], "cli1");
        assert!(hook.tags().is_empty());
        assert_eq!(state.store.read().await.specialties.len(), 4);
    }

    #[tokio::test]
    async fn webhook_failure_discards_create() {
        let hook = RecordingWebhook::failing(502);
        let state = test_state(hook.clone());
        let (status, _) = send(
            &state,
            Method::POST,
            "/api/v1/specialties",
            Some(json!({"name": "Implantodontia", "description": "Implantes"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(hook.tags(), vec!["nova_especialidade"]);
        assert_eq!(state.store.read().await.specialties.len(), 3);
    }

    #[tokio::test]
    async fn other_clinics_records_cannot_be_updated() {
        let hook = RecordingWebhook::ok(Value::Null);
        let state = test_state(hook.clone());
        let (status, _) = send(
            &state,
            Method::PUT,
            "/api/v1/specialties/esp3",
            Some(json!({"name": "x", "description": "y"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(hook.tags().is_empty());
    }
}
