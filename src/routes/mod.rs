use crate::error::ApiError;
use crate::models::AppState;
use axum::Router;

pub mod agent_routes;
pub mod ai_routes;
pub mod appointment_routes;
pub mod auth_routes;
pub mod clinic_routes;
pub mod doctor_routes;
pub mod finance_routes;
pub mod home_routes;
pub mod patient_routes;
pub mod procedure_routes;
pub mod session_routes;
pub mod settings_routes;
pub mod specialty_routes;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/auth", auth_routes::router())
        .nest("/session", session_routes::router())
        .nest("/settings", settings_routes::router())
        .nest("/ai", ai_routes::router())
        .merge(home_routes::router())
        .merge(clinic_routes::router())
        .merge(specialty_routes::router())
        .merge(procedure_routes::router())
        .merge(doctor_routes::router())
        .merge(patient_routes::router())
        .merge(agent_routes::router())
        .merge(appointment_routes::router())
        .merge(finance_routes::router());

    Router::new().nest("/api/v1", api).with_state(state)
}

/* -------------------------
   Form helpers
--------------------------*/

/// Trimmed value of a required form field.
pub(crate) fn required(value: &str, message: &str) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::validation(message));
    }
    Ok(value.to_string())
}

/// Blank optional fields are stored as absent.
pub(crate) fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
pub(crate) mod test_support {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::models::AppState;

    /// Drive one request through a fresh router over `state`.
    pub async fn send(
        state: &AppState,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(match body {
                Some(json) => Body::from(json.to_string()),
                None => Body::empty(),
            })
            .unwrap();

        let response = super::router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn get(state: &AppState, uri: &str) -> (StatusCode, Value) {
        send(state, Method::GET, uri, None).await
    }
}
