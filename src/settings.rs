use serde::{Deserialize, Serialize};

use crate::config::Config;

pub const AUTOMATION_SERVICE: &str = "n8n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Connected,
    Disconnected,
}

/// An external integration the dashboard can talk to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceEntry {
    pub name: String,
    pub description: String,
    pub status: ServiceStatus,
    #[serde(rename = "webhookUrl", default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
}

impl ServiceEntry {
    pub fn toggle(&mut self) {
        self.status = match self.status {
            ServiceStatus::Connected => ServiceStatus::Disconnected,
            ServiceStatus::Disconnected => ServiceStatus::Connected,
        };
    }
}

pub fn default_services(cfg: &Config) -> Vec<ServiceEntry> {
    vec![ServiceEntry {
        name: AUTOMATION_SERVICE.to_string(),
        description: "Automatize fluxos com n8n.".to_string(),
        status: if cfg.webhook_connected {
            ServiceStatus::Connected
        } else {
            ServiceStatus::Disconnected
        },
        webhook_url: cfg.webhook_url.clone(),
    }]
}

/// URL of the automation webhook, only while it is connected.
pub fn connected_webhook_url(services: &[ServiceEntry]) -> Option<String> {
    services
        .iter()
        .find(|s| s.name == AUTOMATION_SERVICE && s.status == ServiceStatus::Connected)
        .and_then(|s| s.webhook_url.clone())
        .filter(|url| !url.trim().is_empty())
}
