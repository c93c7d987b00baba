// src/routes/appointment_routes.rs

use axum::{
    extract::{Path, Query, State},
    routing::{get, patch, post, put},
    Json, Router,
};
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{
        ApiOk, AppState, Appointment, AppointmentProcedure, AppointmentStatus, Delivery, Saved,
        SearchQuery,
    },
    scheduler::{self, CalendarWeek, CandidateProcedure, KanbanColumn, LineRequest},
    store::{find_in, insert_front, new_id, replace, scoped},
    webhook::{deliver, AppointmentPayload, WebhookEvent},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/appointments", get(list_appointments).post(create_appointment))
        .route("/appointments/kanban", get(kanban))
        .route("/appointments/table", get(table))
        .route("/appointments/calendar", get(calendar))
        .route("/appointments/form", post(form_helper))
        .route("/appointments/{appointment_id}", put(update_appointment))
        .route("/appointments/{appointment_id}/status", patch(change_status))
}

/* ============================================================
   Views
   ============================================================ */

/// Tenant-filtered, searched appointments.
async fn visible(
    state: &AppState,
    auth: &AuthContext,
    q: Option<&str>,
) -> Result<Vec<Appointment>, ApiError> {
    let scope = auth.session.clinic_scope()?;
    let store = state.store.read().await;
    let appointments = scoped(&store.appointments, scope);
    let procedures = scoped(&store.procedures, scope);
    Ok(scheduler::search(&appointments, &procedures, q))
}

pub async fn list_appointments(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiOk<Vec<Appointment>>>, ApiError> {
    let data = visible(&state, &auth, query.q.as_deref()).await?;
    Ok(Json(ApiOk { data }))
}

pub async fn kanban(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiOk<Vec<KanbanColumn>>>, ApiError> {
    let appointments = visible(&state, &auth, query.q.as_deref()).await?;
    Ok(Json(ApiOk {
        data: scheduler::kanban(&appointments),
    }))
}

pub async fn table(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiOk<Vec<Appointment>>>, ApiError> {
    let appointments = visible(&state, &auth, query.q.as_deref()).await?;
    Ok(Json(ApiOk {
        data: scheduler::table(&appointments),
    }))
}

#[derive(Debug, Deserialize, Default)]
pub struct CalendarQuery {
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub offset: i64,
    pub q: Option<String>,
}

pub async fn calendar(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<ApiOk<CalendarWeek>>, ApiError> {
    let scope = auth.session.clinic_scope()?;
    let store = state.store.read().await;
    let procedures = scoped(&store.procedures, scope);
    let appointments = scheduler::search(
        &scoped(&store.appointments, scope),
        &procedures,
        query.q.as_deref(),
    );
    let anchor = query.date.unwrap_or_else(|| Local::now().date_naive());

    Ok(Json(ApiOk {
        data: scheduler::calendar_week(&appointments, &procedures, anchor, query.offset)?,
    }))
}

/* ============================================================
   Form helper
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct FormRequest {
    #[serde(rename = "doctorId")]
    pub doctor_id: String,
    #[serde(default)]
    pub procedures: Vec<LineRequest>,
}

#[derive(Debug, Serialize)]
pub struct FormState {
    pub candidates: Vec<CandidateProcedure>,
    pub procedures: Vec<AppointmentProcedure>,
    #[serde(rename = "valorFinal")]
    pub valor_final: f64,
}

/// Procedures still available for the doctor plus the priced lines and
/// running total of what is already on the form.
pub async fn form_helper(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<FormRequest>,
) -> Result<Json<ApiOk<FormState>>, ApiError> {
    let clinic_id = auth.session.require_clinic()?;
    let store = state.store.read().await;
    let doctor = find_in(&store.doctors, clinic_id, &req.doctor_id)
        .ok_or_else(|| ApiError::validation("Doutor inválido."))?;
    let procedures = scoped(&store.procedures, Some(clinic_id));

    let selected: Vec<String> = req.procedures.iter().map(|l| l.procedure_id.clone()).collect();
    let lines = if req.procedures.is_empty() {
        Vec::new()
    } else {
        scheduler::price_lines(doctor, &req.procedures)?
    };

    Ok(Json(ApiOk {
        data: FormState {
            candidates: scheduler::candidate_procedures(doctor, &procedures, &selected),
            valor_final: scheduler::total(&lines),
            procedures: lines,
        },
    }))
}

/* ============================================================
   Create / update
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct AppointmentRequest {
    #[serde(rename = "patientId")]
    pub patient_id: String,
    #[serde(rename = "doctorId")]
    pub doctor_id: String,
    #[serde(default)]
    pub procedures: Vec<LineRequest>,
    #[serde(rename = "startTime")]
    pub start_time: NaiveDateTime,
    #[serde(rename = "endTime", default)]
    pub end_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub status: Option<AppointmentStatus>,
}

/// Validate and price the form, embedding current patient and doctor
/// snapshots.
async fn build_appointment(
    state: &AppState,
    clinic_id: &str,
    id: String,
    fallback_status: AppointmentStatus,
    req: &AppointmentRequest,
) -> Result<Appointment, ApiError> {
    let store = state.store.read().await;
    let patient = find_in(&store.patients, clinic_id, &req.patient_id)
        .cloned()
        .ok_or_else(|| ApiError::validation("Paciente selecionado é inválido."))?;
    let doctor = find_in(&store.doctors, clinic_id, &req.doctor_id)
        .cloned()
        .ok_or_else(|| ApiError::validation("Doutor inválido."))?;

    let procedures = scheduler::price_lines(&doctor, &req.procedures)?;
    let end_time = scheduler::resolve_end_time(req.start_time, req.end_time)?;

    Ok(Appointment {
        id,
        patient,
        doctor,
        valor_final: scheduler::total(&procedures),
        procedures,
        start_time: req.start_time,
        end_time,
        status: req.status.unwrap_or(fallback_status),
        clinic_id: clinic_id.to_string(),
    })
}

fn payload(a: &Appointment, id: Option<String>) -> AppointmentPayload {
    AppointmentPayload {
        id,
        patient_id: a.patient.id.clone(),
        doctor_id: a.doctor.id.clone(),
        procedures: a.procedures.clone(),
        start_time: a.start_time,
        end_time: a.end_time,
        status: a.status,
        valor_final: a.valor_final,
        clinic_id: a.clinic_id.clone(),
    }
}

pub async fn create_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<AppointmentRequest>,
) -> Result<Json<Saved<Appointment>>, ApiError> {
    let clinic_id = auth.session.require_clinic()?;
    let appointment = build_appointment(
        &state,
        clinic_id,
        new_id("at"),
        AppointmentStatus::Scheduled,
        &req,
    )
    .await?;
    let delivery =
        deliver(&state, WebhookEvent::NewAppointment(payload(&appointment, None))).await?;

    insert_front(&mut state.store.write().await.appointments, appointment.clone());
    tracing::info!(
        appointment_id = %appointment.id,
        total = appointment.valor_final,
        "appointment created"
    );

    Ok(Json(Saved {
        data: appointment,
        delivery,
    }))
}

pub async fn update_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(appointment_id): Path<String>,
    Json(req): Json<AppointmentRequest>,
) -> Result<Json<Saved<Appointment>>, ApiError> {
    let clinic_id = auth.session.require_clinic()?;
    let current_status = find_in(&state.store.read().await.appointments, clinic_id, &appointment_id)
        .map(|a| a.status)
        .ok_or_else(|| ApiError::not_found("appointment", &appointment_id))?;

    let appointment =
        build_appointment(&state, clinic_id, appointment_id.clone(), current_status, &req).await?;
    let delivery = deliver(
        &state,
        WebhookEvent::UpdateAppointment(payload(&appointment, Some(appointment_id))),
    )
    .await?;

    if !replace(&mut state.store.write().await.appointments, appointment.clone()) {
        return Err(ApiError::not_found("appointment", &appointment.id));
    }
    tracing::info!(appointment_id = %appointment.id, "appointment updated");

    Ok(Json(Saved {
        data: appointment,
        delivery,
    }))
}

/* ============================================================
   Status moves (kanban drag and drop)
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, Serialize)]
pub struct StatusMove {
    pub data: Appointment,
    pub changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery: Option<Delivery>,
}

/// Apply the new status at once, then notify. A failed notification puts
/// the previous snapshot back.
pub async fn change_status(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(appointment_id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<StatusMove>, ApiError> {
    let clinic_id = auth.session.require_clinic()?;

    let (previous, updated) = {
        let mut store = state.store.write().await;
        let appointment = store
            .appointments
            .iter_mut()
            .find(|a| a.id == appointment_id && a.clinic_id == clinic_id)
            .ok_or_else(|| ApiError::not_found("appointment", &appointment_id))?;

        if appointment.status == req.status {
            return Ok(Json(StatusMove {
                data: appointment.clone(),
                changed: false,
                delivery: None,
            }));
        }
        let previous = appointment.clone();
        appointment.status = req.status;
        (previous, appointment.clone())
    };

    let event = WebhookEvent::AppointmentStatusChanged {
        atendimento_id: appointment_id.clone(),
        novo_status: req.status,
    };
    match deliver(&state, event).await {
        Ok(delivery) => {
            tracing::info!(
                appointment_id = %appointment_id,
                from = ?previous.status,
                to = ?req.status,
                "appointment status changed"
            );
            Ok(Json(StatusMove {
                data: updated,
                changed: true,
                delivery: Some(delivery),
            }))
        }
        Err(e) => {
            replace(&mut state.store.write().await.appointments, previous);
            tracing::warn!(appointment_id = %appointment_id, "status change rolled back");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::{json, Value};

    use crate::models::test_helpers::{test_state, RecordingWebhook};
    use crate::models::AppointmentStatus;
    use crate::routes::test_support::{get, send};

    fn status_of(state: &crate::models::AppState, id: &str) -> AppointmentStatus {
        state
            .store
            .try_read()
            .unwrap()
            .appointments
            .iter()
            .find(|a| a.id == id)
            .unwrap()
            .status
    }

    #[tokio::test]
    async fn failed_status_change_rolls_back() {
        let hook = RecordingWebhook::failing(500);
        let state = test_state(hook.clone());
        let (status, err) = send(
            &state,
            Method::PATCH,
            "/api/v1/appointments/at1/status",
            Some(json!({"status": "compareceu"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(err["error"]["code"], "WEBHOOK_FAILED");
        assert_eq!(hook.tags(), vec!["atualizar_status_atendimento"]);
        assert_eq!(status_of(&state, "at1"), AppointmentStatus::Confirmed);
    }

    #[tokio::test]
    async fn status_change_is_sent_and_kept() {
        let hook = RecordingWebhook::ok(Value::Null);
        let state = test_state(hook.clone());
        let (status, body) = send(
            &state,
            Method::PATCH,
            "/api/v1/appointments/at2/status",
            Some(json!({"status": "não atendido"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["changed"], true);
        assert_eq!(body["delivery"], "sent");
        let calls = hook.calls.lock().unwrap().clone();
        assert_eq!(calls[0]["atendimento_id"], "at2");
        assert_eq!(calls[0]["novo_status"], "não atendido");
        assert_eq!(status_of(&state, "at2"), AppointmentStatus::NotSeen);
    }

    #[tokio::test]
    async fn moving_to_same_column_is_a_no_op() {
        let hook = RecordingWebhook::ok(Value::Null);
        let state = test_state(hook.clone());
        let (status, body) = send(
            &state,
            Method::PATCH,
            "/api/v1/appointments/at1/status",
            Some(json!({"status": "confirmado"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["changed"], false);
        assert!(hook.tags().is_empty());
    }

    #[tokio::test]
    async fn create_prices_lines_from_doctor_offer() {
        let hook = RecordingWebhook::ok(Value::Null);
        let state = test_state(hook.clone());
        let (status, saved) = send(
            &state,
            Method::POST,
            "/api/v1/appointments",
            Some(json!({
                "patientId": "pat2",
                "doctorId": "doc1",
                "procedures": [
                    {"procedimentoId": "proc3", "valorFinal": 1.0},
                    {"procedimentoId": "proc4", "valorFinal": 80.0}
                ],
                "startTime": "2024-06-21T09:00:00"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let data = &saved["data"];
        assert_eq!(data["status"], "agendado");
        assert_eq!(data["valorFinal"], 230.0);
        assert_eq!(data["procedures"][0]["valorFinal"], 150.0);
        assert_eq!(data["endTime"], "2024-06-21T09:30:00");
        assert_eq!(data["patient"]["name"], "Maria Oliveira");

        let calls = hook.calls.lock().unwrap().clone();
        assert_eq!(calls[0]["tag"], "novo_atendimento");
        assert_eq!(calls[0]["patientId"], "pat2");
        assert_eq!(calls[0]["doctorId"], "doc1");
    }

    #[tokio::test]
    async fn create_rejects_foreign_patient_and_empty_lines() {
        let hook = RecordingWebhook::ok(Value::Null);
        let state = test_state(hook.clone());
        let (status, err) = send(
            &state,
            Method::POST,
            "/api/v1/appointments",
            Some(json!({
                "patientId": "pat3",
                "doctorId": "doc1",
                "procedures": [{"procedimentoId": "proc3"}],
                "startTime": "2024-06-21T09:00:00"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["error"]["message"], "Paciente selecionado é inválido.");

        let (status, err) = send(
            &state,
            Method::POST,
            "/api/v1/appointments",
            Some(json!({
                "patientId": "pat1",
                "doctorId": "doc1",
                "procedures": [],
                "startTime": "2024-06-21T09:00:00"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["error"]["message"], "Adicione pelo menos um procedimento ao atendimento.");
        assert!(hook.tags().is_empty());
    }

    #[tokio::test]
    async fn webhook_failure_discards_new_appointment() {
        let hook = RecordingWebhook::failing(503);
        let state = test_state(hook.clone());
        let (status, _) = send(
            &state,
            Method::POST,
            "/api/v1/appointments",
            Some(json!({
                "patientId": "pat1",
                "doctorId": "doc2",
                "procedures": [{"procedimentoId": "proc1"}],
                "startTime": "2024-06-21T09:00:00"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(state.store.read().await.appointments.len(), 5);
    }

    #[tokio::test]
    async fn update_keeps_status_when_omitted() {
        let state = test_state(RecordingWebhook::ok(Value::Null));
        let (status, saved) = send(
            &state,
            Method::PUT,
            "/api/v1/appointments/at1",
            Some(json!({
                "patientId": "pat1",
                "doctorId": "doc1",
                "procedures": [{"procedimentoId": "proc3"}],
                "startTime": "2024-06-20T09:00:00",
                "endTime": "2024-06-20T10:30:00"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(saved["data"]["status"], "confirmado");
        assert_eq!(saved["data"]["endTime"], "2024-06-20T10:30:00");
    }

    #[tokio::test]
    async fn kanban_and_table_views() {
        let state = test_state(RecordingWebhook::ok(Value::Null));
        let (_, body) = get(&state, "/api/v1/appointments/kanban").await;
        let columns = body["data"].as_array().unwrap();
        assert_eq!(columns.len(), 7);
        assert_eq!(columns[3]["title"], "Atendido");
        assert_eq!(columns[3]["count"], 1);

        let (_, body) = get(&state, "/api/v1/appointments/table?q=clareamento").await;
        let rows = body["data"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], "at5");
    }

    #[tokio::test]
    async fn calendar_week_for_given_date() {
        let state = test_state(RecordingWebhook::ok(Value::Null));
        let (status, body) = get(&state, "/api/v1/appointments/calendar?date=2024-06-20").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["week_start"], "2024-06-17");
        assert_eq!(body["data"]["days"][3]["events"].as_array().unwrap().len(), 3);

        let (_, body) = get(&state, "/api/v1/appointments/calendar?date=2024-06-20&offset=-1").await;
        assert_eq!(body["data"]["week_start"], "2024-06-10");
    }

    #[tokio::test]
    async fn calendar_offset_past_the_date_range_is_rejected() {
        let state = test_state(RecordingWebhook::ok(Value::Null));
        let (status, err) = get(
            &state,
            "/api/v1/appointments/calendar?date=2024-06-20&offset=100000000000",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(err["error"]["message"], "Data fora do intervalo suportado.");
    }

    #[tokio::test]
    async fn failed_update_leaves_record_untouched() {
        let hook = RecordingWebhook::failing(500);
        let state = test_state(hook.clone());
        let before = state
            .store
            .read()
            .await
            .appointments
            .iter()
            .find(|a| a.id == "at1")
            .cloned()
            .unwrap();

        let (status, err) = send(
            &state,
            Method::PUT,
            "/api/v1/appointments/at1",
            Some(json!({
                "patientId": "pat1",
                "doctorId": "doc1",
                "procedures": [{"procedimentoId": "proc3"}, {"procedimentoId": "proc4", "valorFinal": 90.0}],
                "startTime": "2024-06-20T11:00:00",
                "status": "compareceu"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(err["error"]["code"], "WEBHOOK_FAILED");
        assert_eq!(hook.tags(), vec!["atualizar_atendimento"]);

        let store = state.store.read().await;
        let after = store.appointments.iter().find(|a| a.id == "at1").unwrap();
        assert_eq!(after, &before);
        assert_eq!(after.valor_final, 150.0);
        assert_eq!(after.status, AppointmentStatus::Confirmed);
    }

    #[tokio::test]
    async fn form_helper_lists_remaining_candidates() {
        let state = test_state(RecordingWebhook::ok(Value::Null));
        let (status, body) = send(
            &state,
            Method::POST,
            "/api/v1/appointments/form",
            Some(json!({"doctorId": "doc1", "procedures": [{"procedimentoId": "proc3"}]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let candidates = body["data"]["candidates"].as_array().unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0]["procedure"]["id"], "proc4");
        assert_eq!(candidates[0]["default_valor_final"], 0.0);
        assert_eq!(body["data"]["valorFinal"], 150.0);
    }
}
