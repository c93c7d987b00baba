use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::ApiError;
use crate::session::Session;
use crate::settings::ServiceEntry;
use crate::store::Store;
use crate::webhook::Webhook;

/// Session key used by the pre-authenticated development session.
pub const DEV_SESSION_KEY: &str = "dev-bypass-session";

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<Store>>,
    /// Keyed by SHA-256 hex of the bearer token.
    pub sessions: Arc<RwLock<HashMap<String, Session>>>,
    pub services: Arc<RwLock<Vec<ServiceEntry>>>,
    pub webhook: Arc<dyn Webhook>,
    pub auth_webhook_url: Option<String>,
    pub chat_console_url: Option<String>,
    pub auth_bypass: bool,
    pub dev_user_email: String,
    pub session_ttl_hours: i64,
}

impl AppState {
    /// Make sure the bypass session exists and is not expired.
    pub async fn ensure_dev_session(&self) {
        let first_clinic = self.store.read().await.clinics.first().map(|c| c.id.clone());
        let mut sessions = self.sessions.write().await;
        let fresh = sessions
            .get(DEV_SESSION_KEY)
            .is_some_and(|s| !s.is_expired(Utc::now()));
        if !fresh {
            let user = User {
                email: self.dev_user_email.clone(),
                role: UserRole::Superadmin,
            };
            sessions.insert(
                DEV_SESSION_KEY.to_string(),
                Session::new(user, first_clinic, self.session_ttl_hours),
            );
        }
    }

    /// Run `f` against the stored session and return its result.
    pub async fn with_session<R>(
        &self,
        key: &str,
        f: impl FnOnce(&mut Session) -> R,
    ) -> Result<R, ApiError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(key).ok_or_else(ApiError::session_expired)?;
        Ok(f(session))
    }
}

/* -------------------------
   API envelopes
--------------------------*/

#[derive(Debug, Serialize)]
pub struct ApiOk<T> {
    pub data: T,
}

/// Outcome of the remote notification attached to a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Delivery {
    Sent,
    LocalOnly,
}

#[derive(Debug, Serialize)]
pub struct Saved<T> {
    pub data: T,
    pub delivery: Delivery,
}

#[derive(Debug, Deserialize, Default)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/* -------------------------
   Record traits
--------------------------*/

pub trait Identified {
    fn id(&self) -> &str;
}

/// Records partitioned by clinic.
pub trait Tenanted {
    fn clinic_id(&self) -> &str;
}

macro_rules! impl_record {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Identified for $ty {
                fn id(&self) -> &str {
                    &self.id
                }
            }

            impl Tenanted for $ty {
                fn clinic_id(&self) -> &str {
                    &self.clinic_id
                }
            }
        )+
    };
}

impl_record!(Specialty, Procedure, Doctor, Patient, Appointment, Agent, Transaction);

impl Identified for Clinic {
    fn id(&self) -> &str {
        &self.id
    }
}

/* -------------------------
   Catalog records
--------------------------*/

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Clinic {
    pub id: String,
    pub name: String,
    /// Brazilian company tax id.
    pub cnpj: String,
    pub address: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Specialty {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "clinicaId")]
    pub clinic_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Procedure {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "especialidadeId")]
    pub specialty_id: String,
    #[serde(rename = "clinicaId")]
    pub clinic_id: String,
}

/// A procedure a doctor performs. With `orcar` set the price is quoted per
/// appointment and `valor` is absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoctorProcedure {
    #[serde(rename = "procedimentoId")]
    pub procedure_id: String,
    pub orcar: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valor: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Doctor {
    pub id: String,
    pub name: String,
    #[serde(rename = "especialidade")]
    pub specialty: Specialty,
    #[serde(rename = "procedimentos")]
    pub procedures: Vec<DoctorProcedure>,
    #[serde(rename = "avatarUrl")]
    pub avatar_url: String,
    #[serde(rename = "clinicaId")]
    pub clinic_id: String,
}

impl Doctor {
    pub fn procedure(&self, procedure_id: &str) -> Option<&DoctorProcedure> {
        self.procedures.iter().find(|p| p.procedure_id == procedure_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    pub id: String,
    pub name: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpf: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(rename = "lastVisit")]
    pub last_visit: String,
    #[serde(rename = "clinicaId")]
    pub clinic_id: String,
}

/* -------------------------
   Appointments
--------------------------*/

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppointmentStatus {
    #[serde(rename = "agendado")]
    Scheduled,
    #[serde(rename = "confirmado")]
    Confirmed,
    #[serde(rename = "compareceu")]
    Arrived,
    #[serde(rename = "atendido")]
    Completed,
    #[serde(rename = "faltou")]
    NoShow,
    #[serde(rename = "não atendido")]
    NotSeen,
    #[serde(rename = "falta justificada")]
    ExcusedAbsence,
}

impl AppointmentStatus {
    /// Kanban column order.
    pub const ALL: [AppointmentStatus; 7] = [
        AppointmentStatus::Scheduled,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Arrived,
        AppointmentStatus::Completed,
        AppointmentStatus::NoShow,
        AppointmentStatus::NotSeen,
        AppointmentStatus::ExcusedAbsence,
    ];

    pub fn title(self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "Agendado",
            AppointmentStatus::Confirmed => "Confirmado",
            AppointmentStatus::Arrived => "Compareceu",
            AppointmentStatus::Completed => "Atendido",
            AppointmentStatus::NoShow => "Faltou",
            AppointmentStatus::NotSeen => "Não Atendido",
            AppointmentStatus::ExcusedAbsence => "Falta Justificada",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppointmentProcedure {
    #[serde(rename = "procedimentoId")]
    pub procedure_id: String,
    #[serde(rename = "valorFinal")]
    pub valor_final: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: String,
    pub patient: Patient,
    pub doctor: Doctor,
    pub procedures: Vec<AppointmentProcedure>,
    #[serde(rename = "startTime")]
    pub start_time: NaiveDateTime,
    #[serde(rename = "endTime")]
    pub end_time: NaiveDateTime,
    pub status: AppointmentStatus,
    /// Always the sum of the line items.
    #[serde(rename = "valorFinal")]
    pub valor_final: f64,
    #[serde(rename = "clinicaId")]
    pub clinic_id: String,
}

/* -------------------------
   Identities
--------------------------*/

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
    Superadmin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Active,
    Inactive,
}

/// A named login identity managed from the agents catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Agent {
    pub id: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub email: String,
    pub role: UserRole,
    pub status: AgentStatus,
    #[serde(rename = "clinicaId")]
    pub clinic_id: String,
}

/// The identity behind the current session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub email: String,
    pub role: UserRole,
}

/* -------------------------
   Ledger
--------------------------*/

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    #[serde(rename = "receita")]
    Income,
    #[serde(rename = "despesa")]
    Expense,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: String,
    #[serde(rename = "descricao")]
    pub description: String,
    #[serde(rename = "valor")]
    pub amount: f64,
    #[serde(rename = "tipo")]
    pub kind: TransactionKind,
    #[serde(rename = "data")]
    pub date: NaiveDateTime,
    #[serde(rename = "categoria")]
    pub category: String,
    #[serde(rename = "atendimentoId", default, skip_serializing_if = "Option::is_none")]
    pub appointment_id: Option<String>,
    #[serde(rename = "clinicaId")]
    pub clinic_id: String,
}

/* -------------------------
   Test helpers
--------------------------*/
