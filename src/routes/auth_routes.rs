use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    auth::{generate_access_token, hash_access_token, password_digest, validate_new_password},
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{ApiOk, AppState, User, UserRole},
    navigation::{NavItem, nav_items},
    routes::required,
    session::Session,
    webhook::{WebhookEvent, request},
};

const ACCESS_GRANTED: &str = "user_accept";
const USER_CREATED: &str = "user_created";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

/* ============================================================
   Login
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

/// Message the auth webhook attached to a refusal, if any.
fn remote_message(body: &Value) -> Option<String> {
    body.get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.trim().is_empty())
        .map(str::to_string)
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiOk<LoginResponse>>, ApiError> {
    let email = required(&req.email, "email and password are required")?;
    if req.password.is_empty() {
        return Err(ApiError::validation("email and password are required"));
    }

    let body = request(
        &state,
        state.auth_webhook_url.as_deref(),
        WebhookEvent::AccessRequest {
            email: email.clone(),
            password_hash: password_digest(&req.password),
        },
    )
    .await?;

    let accepted = body.get("status").and_then(Value::as_str) == Some(ACCESS_GRANTED);
    let role = body
        .get("role")
        .cloned()
        .and_then(|r| serde_json::from_value::<UserRole>(r).ok());
    let Some(role) = role.filter(|_| accepted) else {
        tracing::info!(email = %email, "login refused");
        return Err(remote_message(&body)
            .map(|m| ApiError::Unauthorized("INVALID_CREDENTIALS", m))
            .unwrap_or_else(ApiError::invalid_credentials));
    };

    let first_clinic = state.store.read().await.clinics.first().map(|c| c.id.clone());
    let user = User { email, role };
    let session = Session::new(user.clone(), first_clinic, state.session_ttl_hours);
    let expires_at = session.expires_at;

    let access_token = generate_access_token();
    {
        let mut sessions = state.sessions.write().await;
        let now = Utc::now();
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now));
        if sessions.len() < before {
            tracing::info!(removed = before - sessions.len(), "expired sessions purged");
        }
        sessions.insert(hash_access_token(&access_token), session);
    }
    tracing::info!(email = %user.email, role = ?user.role, "login accepted");

    Ok(Json(ApiOk {
        data: LoginResponse {
            access_token,
            token_type: "Bearer",
            expires_at,
            user,
        },
    }))
}

/* ============================================================
   Register
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub email: String,
    pub password: String,
    #[serde(rename = "confirmPassword")]
    pub confirm_password: String,
    #[serde(rename = "releaseCode", default)]
    pub release_code: String,
    #[serde(default)]
    pub role: Option<UserRole>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
}

/// Password rules are checked before anything is sent.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<ApiOk<RegisterResponse>>, ApiError> {
    validate_new_password(&req.password, &req.confirm_password).map_err(ApiError::validation)?;
    let email = required(&req.email, "email is required")?;

    let body = request(
        &state,
        state.auth_webhook_url.as_deref(),
        WebhookEvent::SignupRequest {
            nome_completo: req.full_name.trim().to_string(),
            email: email.clone(),
            password_hash: password_digest(&req.password),
            codigo_liberacao: req.release_code.trim().to_string(),
            role: req.role.unwrap_or(UserRole::User),
        },
    )
    .await?;

    if body.get("status").and_then(Value::as_str) != Some(USER_CREATED) {
        tracing::info!(email = %email, "registration refused");
        return Err(ApiError::BadRequest(
            "REGISTRATION_REFUSED",
            remote_message(&body).unwrap_or_else(|| {
                "Não foi possível criar o usuário. Verifique o código de liberação.".into()
            }),
        ));
    }
    tracing::info!(email = %email, "user registered");

    Ok(Json(ApiOk {
        data: RegisterResponse {
            message: "Usuário criado com sucesso! Você já pode fazer o login.",
        },
    }))
}

/* ============================================================
   Session
   ============================================================ */

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: User,
    pub nav_items: Vec<NavItem>,
}

pub async fn me(
    State(_state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ApiOk<MeResponse>>, ApiError> {
    let role = auth.session.user.role;
    Ok(Json(ApiOk {
        data: MeResponse {
            user: auth.session.user,
            nav_items: nav_items(role),
        },
    }))
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub ok: bool,
}

pub async fn logout(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ApiOk<LogoutResponse>>, ApiError> {
    state.sessions.write().await.remove(&auth.session_key);
    tracing::info!(email = %auth.session.user.email, "logged out");
    Ok(Json(ApiOk {
        data: LogoutResponse { ok: true },
    }))
}
