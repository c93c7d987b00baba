// src/routes/clinic_routes.rs

use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{ApiOk, AppState, Clinic, Saved},
    routes::required,
    store::{insert_front, new_id, replace},
    webhook::{deliver, ClinicPayload, WebhookEvent},
};

const ALL_FIELDS_REQUIRED: &str = "Todos os campos são obrigatórios.";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/clinics", get(list_clinics).post(create_clinic))
        .route("/clinics/{clinic_id}", put(update_clinic))
}

#[derive(Debug, Deserialize)]
pub struct ClinicRequest {
    pub name: String,
    pub cnpj: String,
    pub address: String,
    pub phone: String,
}

impl ClinicRequest {
    fn validate(&self) -> Result<ClinicPayload, ApiError> {
        Ok(ClinicPayload {
            id: None,
            name: required(&self.name, ALL_FIELDS_REQUIRED)?,
            cnpj: required(&self.cnpj, ALL_FIELDS_REQUIRED)?,
            address: required(&self.address, ALL_FIELDS_REQUIRED)?,
            phone: required(&self.phone, ALL_FIELDS_REQUIRED)?,
        })
    }
}

fn into_clinic(id: String, p: ClinicPayload) -> Clinic {
    Clinic {
        id,
        name: p.name,
        cnpj: p.cnpj,
        address: p.address,
        phone: p.phone,
    }
}

/// Clinics are the tenancy root and are never filtered.
pub async fn list_clinics(
    State(state): State<AppState>,
    _auth: AuthContext,
) -> Result<Json<ApiOk<Vec<Clinic>>>, ApiError> {
    let clinics = state.store.read().await.clinics.clone();
    Ok(Json(ApiOk { data: clinics }))
}

pub async fn create_clinic(
    State(state): State<AppState>,
    _auth: AuthContext,
    Json(req): Json<ClinicRequest>,
) -> Result<Json<Saved<Clinic>>, ApiError> {
    let payload = req.validate()?;
    let delivery = deliver(&state, WebhookEvent::NewClinic(payload.clone())).await?;

    let clinic = into_clinic(new_id("cli"), payload);
    insert_front(&mut state.store.write().await.clinics, clinic.clone());
    tracing::info!(clinic_id = %clinic.id, "clinic created");

    Ok(Json(Saved {
        data: clinic,
        delivery,
    }))
}

pub async fn update_clinic(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(clinic_id): Path<String>,
    Json(req): Json<ClinicRequest>,
) -> Result<Json<Saved<Clinic>>, ApiError> {
    if state.store.read().await.clinic(&clinic_id).is_none() {
        return Err(ApiError::not_found("clinic", &clinic_id));
    }

    let mut payload = req.validate()?;
    payload.id = Some(clinic_id.clone());
    let delivery = deliver(&state, WebhookEvent::UpdateClinic(payload.clone())).await?;

    let clinic = into_clinic(clinic_id, payload);
    if !replace(&mut state.store.write().await.clinics, clinic.clone()) {
        return Err(ApiError::not_found("clinic", &clinic.id));
    }
    tracing::info!(clinic_id = %clinic.id, "clinic updated");

    Ok(Json(Saved {
        data: clinic,
        delivery,
    }))
}
