// src/routes/settings_routes.rs

use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{ApiOk, AppState},
    routes::optional,
    settings::ServiceEntry,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/services", get(list_services))
        .route("/services/{name}/toggle", post(toggle_service))
        .route("/services/{name}/webhook", put(set_webhook_url))
}

pub async fn list_services(
    State(state): State<AppState>,
    _auth: AuthContext,
) -> Result<Json<ApiOk<Vec<ServiceEntry>>>, ApiError> {
    let data = state.services.read().await.clone();
    Ok(Json(ApiOk { data }))
}

async fn update_service(
    state: &AppState,
    name: &str,
    f: impl FnOnce(&mut ServiceEntry),
) -> Result<ServiceEntry, ApiError> {
    let mut services = state.services.write().await;
    let entry = services
        .iter_mut()
        .find(|s| s.name == name)
        .ok_or_else(|| ApiError::not_found("service", name))?;
    f(entry);
    Ok(entry.clone())
}

pub async fn toggle_service(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(name): Path<String>,
) -> Result<Json<ApiOk<ServiceEntry>>, ApiError> {
    let entry = update_service(&state, &name, ServiceEntry::toggle).await?;
    tracing::info!(service = %entry.name, status = ?entry.status, "service toggled");
    Ok(Json(ApiOk { data: entry }))
}

#[derive(Debug, Deserialize)]
pub struct WebhookUrlRequest {
    #[serde(rename = "webhookUrl", default)]
    pub webhook_url: Option<String>,
}

pub async fn set_webhook_url(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(name): Path<String>,
    Json(req): Json<WebhookUrlRequest>,
) -> Result<Json<ApiOk<ServiceEntry>>, ApiError> {
    let url = optional(req.webhook_url);
    let entry = update_service(&state, &name, |s| s.webhook_url = url).await?;
    tracing::info!(service = %entry.name, "service webhook url updated");
    Ok(Json(ApiOk { data: entry }))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::{json, Value};

    use crate::models::test_helpers::{test_state, RecordingWebhook};
    use crate::routes::test_support::{get, send};

    #[tokio::test]
    async fn toggling_n8n_switches_delivery_mode() {
        let hook = RecordingWebhook::ok(Value::Null);
        let state = test_state(hook.clone());
        let (status, body) = send(&state, Method::POST, "/api/v1/settings/services/n8n/toggle", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "disconnected");

        let (_, saved) = send(
            &state,
            Method::POST,
            "/api/v1/patients",
            Some(json!({"name": "Ana", "phone": "1"})),
        )
        .await;
        assert_eq!(saved["delivery"], "local_only");
        assert!(hook.tags().is_empty());
    }

    #[tokio::test]
    async fn webhook_url_can_be_changed_and_cleared() {
        let state = test_state(RecordingWebhook::ok(Value::Null));
        let (_, body) = send(
            &state,
            Method::PUT,
            "/api/v1/settings/services/n8n/webhook",
            Some(json!({"webhookUrl": " http://new.test/hook "})),
        )
        .await;
        assert_eq!(body["data"]["webhookUrl"], "http://new.test/hook");

        send(
            &state,
            Method::PUT,
            "/api/v1/settings/services/n8n/webhook",
            Some(json!({"webhookUrl": ""})),
        )
        .await;
        let (_, body) = get(&state, "/api/v1/settings/services").await;
        assert!(body["data"][0].get("webhookUrl").is_none());
    }

    #[tokio::test]
    async fn unknown_service_is_not_found() {
        let state = test_state(RecordingWebhook::ok(Value::Null));
        let (status, _) = send(&state, Method::POST, "/api/v1/settings/services/zapier/toggle", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
