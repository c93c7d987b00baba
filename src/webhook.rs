use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::models::{
    AppState, AppointmentProcedure, AppointmentStatus, Delivery, DoctorProcedure, UserRole,
};
use crate::settings::connected_webhook_url;

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("webhook request failed: {0}")]
    Transport(String),
    #[error("webhook returned status {0}")]
    Status(u16),
    #[error("webhook client could not be built: {0}")]
    ClientBuild(String),
}

/// Every remote write, the AI prompt and the auth flows are one JSON `POST`
/// tagged with the operation. Non-2xx answers are failures; nothing is retried.
#[async_trait]
pub trait Webhook: Send + Sync {
    /// POST `event` to `url` and return the decoded answer. An empty body is
    /// `Value::Null`; a non-JSON body comes back as `Value::String`.
    async fn post(&self, url: &str, event: &WebhookEvent) -> Result<Value, WebhookError>;
}

pub struct HttpWebhook {
    http: reqwest::Client,
}

impl HttpWebhook {
    pub fn new() -> Result<Self, WebhookError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| WebhookError::ClientBuild(e.to_string()))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Webhook for HttpWebhook {
    async fn post(&self, url: &str, event: &WebhookEvent) -> Result<Value, WebhookError> {
        let resp = self
            .http
            .post(url)
            .json(event)
            .send()
            .await
            .map_err(|e| WebhookError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(WebhookError::Status(status.as_u16()));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| WebhookError::Transport(e.to_string()))?;
        Ok(decode_body(&body))
    }
}

fn decode_body(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

/* -------------------------
   Events
--------------------------*/

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "tag")]
pub enum WebhookEvent {
    #[serde(rename = "nova_clinica")]
    NewClinic(ClinicPayload),
    #[serde(rename = "atualizar_clinica")]
    UpdateClinic(ClinicPayload),
    #[serde(rename = "nova_especialidade")]
    NewSpecialty(SpecialtyPayload),
    #[serde(rename = "atualizar_especialidade")]
    UpdateSpecialty(SpecialtyPayload),
    #[serde(rename = "novo_procedimento")]
    NewProcedure(ProcedurePayload),
    #[serde(rename = "atualizar_procedimento")]
    UpdateProcedure(ProcedurePayload),
    #[serde(rename = "novo_doutor")]
    NewDoctor(DoctorPayload),
    #[serde(rename = "atualizar_doutor")]
    UpdateDoctor(DoctorPayload),
    #[serde(rename = "paciente")]
    NewPatient(PatientPayload),
    #[serde(rename = "atualizar_paciente")]
    UpdatePatient(PatientPayload),
    #[serde(rename = "novo_agente")]
    NewAgent(AgentPayload),
    #[serde(rename = "atualizar_agente")]
    UpdateAgent(AgentPayload),
    #[serde(rename = "novo_atendimento")]
    NewAppointment(AppointmentPayload),
    #[serde(rename = "atualizar_atendimento")]
    UpdateAppointment(AppointmentPayload),
    #[serde(rename = "atualizar_status_atendimento")]
    AppointmentStatusChanged {
        atendimento_id: String,
        novo_status: AppointmentStatus,
    },
    #[serde(rename = "aiia_ia")]
    AiPrompt { prompt: String },
    #[serde(rename = "solicitando_acesso")]
    AccessRequest { email: String, password_hash: String },
    #[serde(rename = "solicitando_cadastro")]
    SignupRequest {
        nome_completo: String,
        email: String,
        password_hash: String,
        codigo_liberacao: String,
        role: UserRole,
    },
}

impl WebhookEvent {
    pub fn tag(&self) -> &'static str {
        match self {
            WebhookEvent::NewClinic(_) => "nova_clinica",
            WebhookEvent::UpdateClinic(_) => "atualizar_clinica",
            WebhookEvent::NewSpecialty(_) => "nova_especialidade",
            WebhookEvent::UpdateSpecialty(_) => "atualizar_especialidade",
            WebhookEvent::NewProcedure(_) => "novo_procedimento",
            WebhookEvent::UpdateProcedure(_) => "atualizar_procedimento",
            WebhookEvent::NewDoctor(_) => "novo_doutor",
            WebhookEvent::UpdateDoctor(_) => "atualizar_doutor",
            WebhookEvent::NewPatient(_) => "paciente",
            WebhookEvent::UpdatePatient(_) => "atualizar_paciente",
            WebhookEvent::NewAgent(_) => "novo_agente",
            WebhookEvent::UpdateAgent(_) => "atualizar_agente",
            WebhookEvent::NewAppointment(_) => "novo_atendimento",
            WebhookEvent::UpdateAppointment(_) => "atualizar_atendimento",
            WebhookEvent::AppointmentStatusChanged { .. } => "atualizar_status_atendimento",
            WebhookEvent::AiPrompt { .. } => "aiia_ia",
            WebhookEvent::AccessRequest { .. } => "solicitando_acesso",
            WebhookEvent::SignupRequest { .. } => "solicitando_cadastro",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClinicPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub cnpj: String,
    pub address: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpecialtyPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    #[serde(rename = "clinicaId")]
    pub clinic_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcedurePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    #[serde(rename = "especialidadeId")]
    pub specialty_id: String,
    #[serde(rename = "clinicaId")]
    pub clinic_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DoctorPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "avatarUrl")]
    pub avatar_url: String,
    #[serde(rename = "especialidadeId")]
    pub specialty_id: String,
    #[serde(rename = "procedimentos")]
    pub procedures: Vec<DoctorProcedure>,
    #[serde(rename = "clinicaId")]
    pub clinic_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatientPayload {
    #[serde(rename = "paciente_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "nome_paciente")]
    pub name: String,
    #[serde(rename = "telefone_paciente")]
    pub phone: String,
    pub cpf: Option<String>,
    #[serde(rename = "endereco")]
    pub address: Option<String>,
    #[serde(rename = "clinicaId")]
    pub clinic_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "nome_completo")]
    pub full_name: String,
    pub email: String,
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    #[serde(rename = "clinicaId")]
    pub clinic_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppointmentPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "patientId")]
    pub patient_id: String,
    #[serde(rename = "doctorId")]
    pub doctor_id: String,
    pub procedures: Vec<AppointmentProcedure>,
    #[serde(rename = "startTime")]
    pub start_time: NaiveDateTime,
    #[serde(rename = "endTime")]
    pub end_time: NaiveDateTime,
    pub status: AppointmentStatus,
    #[serde(rename = "valorFinal")]
    pub valor_final: f64,
    #[serde(rename = "clinicaId")]
    pub clinic_id: String,
}

/* -------------------------
   Dispatch helpers
--------------------------*/

/// Notify the automation webhook about a mutation. With the service
/// disconnected the change is kept locally only.
pub async fn deliver(state: &AppState, event: WebhookEvent) -> Result<Delivery, ApiError> {
    let url = connected_webhook_url(&state.services.read().await);
    let Some(url) = url else {
        tracing::warn!(tag = event.tag(), "n8n webhook not configured; change saved locally only");
        return Ok(Delivery::LocalOnly);
    };

    match state.webhook.post(&url, &event).await {
        Ok(_) => {
            tracing::info!(tag = event.tag(), "webhook delivered");
            Ok(Delivery::Sent)
        }
        Err(e) => {
            tracing::error!(tag = event.tag(), error = %e, "webhook delivery failed");
            Err(e.into())
        }
    }
}

/// Send a request whose answer the caller needs. `url` must be configured.
pub async fn request(
    state: &AppState,
    url: Option<&str>,
    event: WebhookEvent,
) -> Result<Value, ApiError> {
    let Some(url) = url else {
        tracing::warn!(tag = event.tag(), "webhook url missing");
        return Err(ApiError::ServiceUnavailable(
            "WEBHOOK_NOT_CONFIGURED",
            format!("webhook for '{}' is not configured", event.tag()),
        ));
    };

    state.webhook.post(url, &event).await.map_err(|e| {
        tracing::error!(tag = event.tag(), error = %e, "webhook request failed");
        ApiError::from(e)
    })
}
