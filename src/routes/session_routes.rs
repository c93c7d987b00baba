// src/routes/session_routes.rs

use axum::{
    extract::State,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{ApiOk, AppState, Clinic, User},
    navigation::{nav_items, NavItem, Section},
    session::{Session, Theme},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_session))
        .route("/theme", put(set_theme))
        .route("/theme/toggle", post(toggle_theme))
        .route("/clinic", put(select_clinic))
        .route("/section", put(open_section))
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub user: User,
    pub theme: Theme,
    #[serde(rename = "selectedClinicId")]
    pub selected_clinic_id: Option<String>,
    #[serde(rename = "selectedClinic")]
    pub selected_clinic: Option<Clinic>,
    #[serde(rename = "activeSection")]
    pub active_section: Section,
    #[serde(rename = "navItems")]
    pub nav_items: Vec<NavItem>,
}

async fn view(state: &AppState, session: &Session) -> SessionView {
    let selected_clinic = match session.selected_clinic_id.as_deref() {
        Some(id) => state.store.read().await.clinic(id).cloned(),
        None => None,
    };
    SessionView {
        user: session.user.clone(),
        theme: session.theme,
        selected_clinic_id: session.selected_clinic_id.clone(),
        selected_clinic,
        active_section: session.active_section,
        nav_items: nav_items(session.user.role),
    }
}

pub async fn get_session(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ApiOk<SessionView>>, ApiError> {
    Ok(Json(ApiOk {
        data: view(&state, &auth.session).await,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ThemeRequest {
    pub theme: Theme,
}

pub async fn set_theme(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<ThemeRequest>,
) -> Result<Json<ApiOk<SessionView>>, ApiError> {
    let session = state
        .with_session(&auth.session_key, |s| {
            s.theme = req.theme;
            s.clone()
        })
        .await?;
    Ok(Json(ApiOk {
        data: view(&state, &session).await,
    }))
}

pub async fn toggle_theme(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ApiOk<SessionView>>, ApiError> {
    let session = state
        .with_session(&auth.session_key, |s| {
            s.theme = s.theme.toggled();
            s.clone()
        })
        .await?;
    Ok(Json(ApiOk {
        data: view(&state, &session).await,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SelectClinicRequest {
    #[serde(rename = "clinicId", default)]
    pub clinic_id: Option<String>,
}

pub async fn select_clinic(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<SelectClinicRequest>,
) -> Result<Json<ApiOk<SessionView>>, ApiError> {
    if let Some(id) = req.clinic_id.as_deref() {
        if state.store.read().await.clinic(id).is_none() {
            return Err(ApiError::not_found("clinic", id));
        }
    }

    let session = state
        .with_session(&auth.session_key, |s| {
            s.select_clinic(req.clinic_id.clone());
            s.clone()
        })
        .await?;
    tracing::info!(
        user = %session.user.email,
        clinic = ?session.selected_clinic_id,
        "clinic selected"
    );
    Ok(Json(ApiOk {
        data: view(&state, &session).await,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SectionRequest {
    pub section: Section,
}

pub async fn open_section(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<SectionRequest>,
) -> Result<Json<ApiOk<SessionView>>, ApiError> {
    let session = state
        .with_session(&auth.session_key, |s| {
            s.open_section(req.section)?;
            Ok::<_, ApiError>(s.clone())
        })
        .await??;
    Ok(Json(ApiOk {
        data: view(&state, &session).await,
    }))
}
