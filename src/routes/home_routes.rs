use axum::{Json, Router, extract::State, routing::get};
use chrono::Local;

use crate::error::ApiError;
use crate::middleware::auth_context::AuthContext;
use crate::models::{ApiOk, AppState};
use crate::overview::{self, Overview};

pub fn router() -> Router<AppState> {
    Router::new().route("/overview", get(overview))
}

pub async fn overview(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ApiOk<Overview>>, ApiError> {
    let scope = auth.session.clinic_scope()?;
    let slice = state.store.read().await.tenant_slice(scope);

    Ok(Json(ApiOk {
        data: overview::build(
            &slice.appointments,
            &slice.patients,
            auth.session.user.role,
            Local::now().date_naive(),
        ),
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::Value;

    use crate::models::test_helpers::{test_state, RecordingWebhook};
    use crate::routes::test_support::get;

    #[tokio::test]
    async fn overview_reports_clinic_figures() {
        let state = test_state(RecordingWebhook::ok(Value::Null));
        let (status, body) = get(&state, "/api/v1/overview").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total_patients"], 2);
        assert_eq!(body["data"]["week"].as_array().unwrap().len(), 7);
        assert_eq!(body["data"]["months"].as_array().unwrap().len(), 6);
        assert_eq!(body["data"]["quick_access"].as_array().unwrap().len(), 11);
    }
}
