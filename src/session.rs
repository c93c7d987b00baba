use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::models::{User, UserRole};
use crate::navigation::{self, Section};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Ai,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

pub const AI_GREETING: &str =
    "Olá! Sou a AIIA, sua assistente de inteligência artificial. Como posso ajudar hoje?";

/// Per-login dashboard shell state.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub theme: Theme,
    pub selected_clinic_id: Option<String>,
    pub active_section: Section,
    pub expires_at: DateTime<Utc>,
    pub ai_transcript: Vec<ChatMessage>,
}

impl Session {
    pub fn new(user: User, selected_clinic_id: Option<String>, ttl_hours: i64) -> Self {
        Self {
            user,
            theme: Theme::Light,
            selected_clinic_id,
            active_section: Section::Dashboard,
            expires_at: Utc::now() + Duration::hours(ttl_hours),
            ai_transcript: vec![ChatMessage {
                role: ChatRole::Ai,
                content: AI_GREETING.to_string(),
            }],
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Switching clinics always lands on the overview.
    pub fn select_clinic(&mut self, clinic_id: Option<String>) {
        self.selected_clinic_id = clinic_id;
        self.active_section = Section::Dashboard;
    }

    pub fn open_section(&mut self, section: Section) -> Result<(), ApiError> {
        if !navigation::is_visible(self.user.role, section) {
            return Err(ApiError::Forbidden(
                "SECTION_NOT_AVAILABLE",
                "This section is not available for your role".into(),
            ));
        }
        self.active_section = section;
        Ok(())
    }

    /// Clinic filter for list views. Superadmins may browse with nothing
    /// selected and get empty slices.
    pub fn clinic_scope(&self) -> Result<Option<&str>, ApiError> {
        match self.selected_clinic_id.as_deref() {
            None if self.user.role != UserRole::Superadmin => Err(ApiError::no_clinic_selected()),
            scope => Ok(scope),
        }
    }

    /// Clinic that new records are attached to.
    pub fn require_clinic(&self) -> Result<&str, ApiError> {
        self.selected_clinic_id
            .as_deref()
            .ok_or_else(ApiError::no_clinic_selected)
    }
}
