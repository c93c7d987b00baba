// src/routes/patient_routes.rs

use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use chrono::Local;
use serde::Deserialize;

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{ApiOk, AppState, Patient, Saved, SearchQuery},
    routes::{optional, required},
    store::{find_in, insert_front, new_id, replace, scoped},
    webhook::{deliver, PatientPayload, WebhookEvent},
};

const NAME_AND_PHONE_REQUIRED: &str = "Nome e telefone são obrigatórios.";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/patients", get(search_patients).post(create_patient))
        .route("/patients/{patient_id}", get(get_patient).put(update_patient))
}

#[derive(Debug, Deserialize)]
pub struct PatientRequest {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub cpf: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl PatientRequest {
    fn validate(self, id: Option<String>, clinic_id: &str) -> Result<PatientPayload, ApiError> {
        Ok(PatientPayload {
            id,
            name: required(&self.name, NAME_AND_PHONE_REQUIRED)?,
            phone: required(&self.phone, NAME_AND_PHONE_REQUIRED)?,
            cpf: optional(self.cpf),
            address: optional(self.address),
            clinic_id: clinic_id.to_string(),
        })
    }
}

fn name_matches(patient: &Patient, needle: &str) -> bool {
    patient.name.to_lowercase().contains(needle)
}

pub async fn search_patients(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiOk<Vec<Patient>>>, ApiError> {
    let scope = auth.session.clinic_scope()?;
    let mut data = scoped(&state.store.read().await.patients, scope);

    let needle = optional(query.q).map(|q| q.to_lowercase());
    if let Some(needle) = needle {
        data.retain(|p| name_matches(p, &needle));
    }
    Ok(Json(ApiOk { data }))
}

pub async fn get_patient(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(patient_id): Path<String>,
) -> Result<Json<ApiOk<Patient>>, ApiError> {
    let clinic_id = auth.session.require_clinic()?;
    let patient = find_in(&state.store.read().await.patients, clinic_id, &patient_id)
        .cloned()
        .ok_or_else(|| ApiError::not_found("patient", &patient_id))?;
    Ok(Json(ApiOk { data: patient }))
}

pub async fn create_patient(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<PatientRequest>,
) -> Result<Json<Saved<Patient>>, ApiError> {
    let clinic_id = auth.session.require_clinic()?;
    let payload = req.validate(None, clinic_id)?;
    let delivery = deliver(&state, WebhookEvent::NewPatient(payload.clone())).await?;

    let patient = Patient {
        id: new_id("pat"),
        name: payload.name,
        phone: payload.phone,
        cpf: payload.cpf,
        address: payload.address,
        last_visit: Local::now().date_naive().format("%d/%m/%Y").to_string(),
        clinic_id: payload.clinic_id,
    };
    insert_front(&mut state.store.write().await.patients, patient.clone());
    tracing::info!(patient_id = %patient.id, clinic_id = %patient.clinic_id, "patient created");

    Ok(Json(Saved {
        data: patient,
        delivery,
    }))
}

pub async fn update_patient(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(patient_id): Path<String>,
    Json(req): Json<PatientRequest>,
) -> Result<Json<Saved<Patient>>, ApiError> {
    let clinic_id = auth.session.require_clinic()?;
    let existing = find_in(&state.store.read().await.patients, clinic_id, &patient_id)
        .cloned()
        .ok_or_else(|| ApiError::not_found("patient", &patient_id))?;

    let payload = req.validate(Some(patient_id), clinic_id)?;
    let delivery = deliver(&state, WebhookEvent::UpdatePatient(payload.clone())).await?;

    let patient = Patient {
        name: payload.name,
        phone: payload.phone,
        cpf: payload.cpf,
        address: payload.address,
        ..existing
    };
    if !replace(&mut state.store.write().await.patients, patient.clone()) {
        return Err(ApiError::not_found("patient", &patient.id));
    }
    tracing::info!(patient_id = %patient.id, "patient updated");

    Ok(Json(Saved {
        data: patient,
        delivery,
    }))
}
