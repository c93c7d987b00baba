use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::scheduler::ScheduleError;
use crate::webhook::WebhookError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorObject,
}

#[derive(Debug, Serialize)]
pub struct ErrorObject {
    pub code: String,
    pub message: String,
}

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(&'static str, String),
    Forbidden(&'static str, String),
    BadRequest(&'static str, String),
    NotFound(&'static str, String),
    /// The automation webhook failed or answered unexpectedly.
    BadGateway(&'static str, String),
    /// A required collaborator is not configured.
    ServiceUnavailable(&'static str, String),
}

impl ApiError {
    pub fn invalid_credentials() -> Self {
        ApiError::Unauthorized(
            "INVALID_CREDENTIALS",
            "Credenciais inválidas ou resposta inesperada do webhook.".into(),
        )
    }

    pub fn session_expired() -> Self {
        ApiError::Unauthorized("SESSION_EXPIRED", "Session expired".into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::BadRequest("VALIDATION_ERROR", message.into())
    }

    pub fn no_clinic_selected() -> Self {
        ApiError::BadRequest(
            "NO_CLINIC_SELECTED",
            "Por favor, selecione uma clínica para começar.".into(),
        )
    }

    pub fn not_found(what: &str, id: &str) -> Self {
        ApiError::NotFound("NOT_FOUND", format!("{what} {id} not found"))
    }

    fn to_error_response(code: &str, message: &str) -> Json<ErrorResponse> {
        Json(ErrorResponse {
            error: ErrorObject {
                code: code.to_string(),
                message: message.to_string(),
            },
        })
    }
}

impl From<WebhookError> for ApiError {
    fn from(e: WebhookError) -> Self {
        ApiError::BadGateway("WEBHOOK_FAILED", e.to_string())
    }
}

/// Scheduling rule violations are plain validation errors.
impl From<ScheduleError> for ApiError {
    fn from(e: ScheduleError) -> Self {
        ApiError::validation(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(code, msg) => {
                (StatusCode::UNAUTHORIZED, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::Forbidden(code, msg) => {
                (StatusCode::FORBIDDEN, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::BadRequest(code, msg) => {
                (StatusCode::BAD_REQUEST, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::NotFound(code, msg) => {
                (StatusCode::NOT_FOUND, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::BadGateway(code, msg) => {
                (StatusCode::BAD_GATEWAY, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::ServiceUnavailable(code, msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiError::to_error_response(code, &msg),
            )
                .into_response(),
        }
    }
}
