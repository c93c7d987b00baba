// src/routes/doctor_routes.rs

use std::collections::HashSet;

use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{ApiOk, AppState, Doctor, DoctorProcedure, Procedure, Saved},
    routes::{optional, required},
    store::{find_in, insert_front, new_id, replace, scoped},
    webhook::{deliver, DoctorPayload, WebhookEvent},
};

const NAME_AND_SPECIALTY_REQUIRED: &str = "Nome e especialidade são obrigatórios.";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/doctors", get(list_doctors).post(create_doctor))
        .route("/doctors/{doctor_id}", put(update_doctor))
}

#[derive(Debug, Deserialize)]
pub struct DoctorRequest {
    pub name: String,
    #[serde(rename = "especialidadeId")]
    pub specialty_id: String,
    #[serde(rename = "avatarUrl", default)]
    pub avatar_url: Option<String>,
    #[serde(rename = "procedimentos", default)]
    pub procedures: Vec<DoctorProcedure>,
}

/// Normalize the procedure list: every entry must exist in the clinic,
/// fixed prices must be positive and quoted entries carry no price.
fn normalize_procedures(
    offers: &[DoctorProcedure],
    clinic_procedures: &[Procedure],
) -> Result<Vec<DoctorProcedure>, ApiError> {
    let mut seen = HashSet::new();
    offers
        .iter()
        .map(|offer| {
            if !seen.insert(offer.procedure_id.as_str()) {
                return Err(ApiError::validation(format!(
                    "O procedimento {} foi adicionado mais de uma vez.",
                    offer.procedure_id
                )));
            }
            if !clinic_procedures.iter().any(|p| p.id == offer.procedure_id) {
                return Err(ApiError::validation(format!(
                    "O procedimento {} não existe nesta clínica.",
                    offer.procedure_id
                )));
            }
            if offer.orcar {
                return Ok(DoctorProcedure {
                    procedure_id: offer.procedure_id.clone(),
                    orcar: true,
                    valor: None,
                });
            }
            match offer.valor {
                Some(v) if v.is_finite() && v > 0.0 => Ok(offer.clone()),
                _ => Err(ApiError::validation(
                    "Procedimentos com valor fixo precisam de um valor positivo.",
                )),
            }
        })
        .collect()
}

/// Validated doctor embedding a snapshot of its specialty.
async fn build_doctor(
    state: &AppState,
    clinic_id: &str,
    id: String,
    req: &DoctorRequest,
) -> Result<Doctor, ApiError> {
    let name = required(&req.name, NAME_AND_SPECIALTY_REQUIRED)?;
    let specialty_id = required(&req.specialty_id, NAME_AND_SPECIALTY_REQUIRED)?;

    let store = state.store.read().await;
    let specialty = find_in(&store.specialties, clinic_id, &specialty_id)
        .cloned()
        .ok_or_else(|| ApiError::validation("Especialidade selecionada é inválida."))?;
    let clinic_procedures = scoped(&store.procedures, Some(clinic_id));
    let procedures = normalize_procedures(&req.procedures, &clinic_procedures)?;

    let avatar_url = optional(req.avatar_url.clone())
        .unwrap_or_else(|| format!("https://i.pravatar.cc/100?u={id}"));

    Ok(Doctor {
        id,
        name,
        specialty,
        procedures,
        avatar_url,
        clinic_id: clinic_id.to_string(),
    })
}

fn payload(doctor: &Doctor, id: Option<String>) -> DoctorPayload {
    DoctorPayload {
        id,
        name: doctor.name.clone(),
        avatar_url: doctor.avatar_url.clone(),
        specialty_id: doctor.specialty.id.clone(),
        procedures: doctor.procedures.clone(),
        clinic_id: doctor.clinic_id.clone(),
    }
}

pub async fn list_doctors(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ApiOk<Vec<Doctor>>>, ApiError> {
    let scope = auth.session.clinic_scope()?;
    let data = scoped(&state.store.read().await.doctors, scope);
    Ok(Json(ApiOk { data }))
}

pub async fn create_doctor(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<DoctorRequest>,
) -> Result<Json<Saved<Doctor>>, ApiError> {
    let clinic_id = auth.session.require_clinic()?;
    let doctor = build_doctor(&state, clinic_id, new_id("doc"), &req).await?;
    let delivery = deliver(&state, WebhookEvent::NewDoctor(payload(&doctor, None))).await?;

    insert_front(&mut state.store.write().await.doctors, doctor.clone());
    tracing::info!(doctor_id = %doctor.id, specialty = %doctor.specialty.name, "doctor created");

    Ok(Json(Saved {
        data: doctor,
        delivery,
    }))
}

pub async fn update_doctor(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(doctor_id): Path<String>,
    Json(req): Json<DoctorRequest>,
) -> Result<Json<Saved<Doctor>>, ApiError> {
    let clinic_id = auth.session.require_clinic()?;
    let existing = find_in(&state.store.read().await.doctors, clinic_id, &doctor_id)
        .cloned()
        .ok_or_else(|| ApiError::not_found("doctor", &doctor_id))?;

    let mut req = req;
    if req.avatar_url.is_none() {
        req.avatar_url = Some(existing.avatar_url);
    }
    let doctor = build_doctor(&state, clinic_id, doctor_id.clone(), &req).await?;
    let delivery =
        deliver(&state, WebhookEvent::UpdateDoctor(payload(&doctor, Some(doctor_id)))).await?;

    if !replace(&mut state.store.write().await.doctors, doctor.clone()) {
        return Err(ApiError::not_found("doctor", &doctor.id));
    }
    tracing::info!(doctor_id = %doctor.id, "doctor updated");

    Ok(Json(Saved {
        data: doctor,
        delivery,
    }))
}
