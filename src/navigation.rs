use serde::{Deserialize, Serialize};

use crate::models::UserRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Section {
    Dashboard,
    Atendimentos,
    Pacientes,
    #[serde(rename = "AIIA_CHAT")]
    AiiaChat,
    #[serde(rename = "AIIA_IA")]
    AiiaIa,
    Financeiro,
    Doutores,
    Procedimentos,
    Especialidades,
    Agentes,
    Clinica,
    Settings,
}

#[derive(Debug, Clone, Serialize)]
pub struct NavItem {
    pub view: Section,
    pub label: &'static str,
    pub roles: &'static [UserRole],
}

const EVERYONE: &[UserRole] = &[UserRole::User, UserRole::Admin, UserRole::Superadmin];
const MANAGERS: &[UserRole] = &[UserRole::Admin, UserRole::Superadmin];
const SUPERADMIN: &[UserRole] = &[UserRole::Superadmin];

const ALL_ITEMS: [(Section, &str, &[UserRole]); 12] = [
    (Section::Dashboard, "Início", EVERYONE),
    (Section::Atendimentos, "Atendimentos", EVERYONE),
    (Section::Pacientes, "Pacientes", EVERYONE),
    (Section::AiiaChat, "AIIA Chat", EVERYONE),
    (Section::AiiaIa, "AIIA IA", EVERYONE),
    (Section::Financeiro, "Financeiro", MANAGERS),
    (Section::Doutores, "Doutores", MANAGERS),
    (Section::Procedimentos, "Procedimentos", MANAGERS),
    (Section::Especialidades, "Especialidades", MANAGERS),
    (Section::Agentes, "Agentes", MANAGERS),
    (Section::Clinica, "Clínicas", SUPERADMIN),
    (Section::Settings, "Configurações", SUPERADMIN),
];

/// Menu entries visible to `role`, in menu order.
pub fn nav_items(role: UserRole) -> Vec<NavItem> {
    ALL_ITEMS
        .iter()
        .filter(|(_, _, roles)| roles.contains(&role))
        .map(|&(view, label, roles)| NavItem { view, label, roles })
        .collect()
}

pub fn is_visible(role: UserRole, section: Section) -> bool {
    nav_items(role).iter().any(|item| item.view == section)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_users_see_only_front_desk_sections() {
        let views: Vec<Section> = nav_items(UserRole::User).iter().map(|i| i.view).collect();
        assert_eq!(
            views,
            vec![
                Section::Dashboard,
                Section::Atendimentos,
                Section::Pacientes,
                Section::AiiaChat,
                Section::AiiaIa,
            ]
        );
    }

    #[test]
    fn admins_miss_clinics_and_settings() {
        assert!(is_visible(UserRole::Admin, Section::Financeiro));
        assert!(!is_visible(UserRole::Admin, Section::Clinica));
        assert!(!is_visible(UserRole::Admin, Section::Settings));
        assert_eq!(nav_items(UserRole::Superadmin).len(), 12);
    }

    #[test]
    fn sections_use_upper_case_wire_names() {
        assert_eq!(serde_json::to_value(Section::AiiaIa).unwrap(), "AIIA_IA");
        assert_eq!(serde_json::to_value(Section::Dashboard).unwrap(), "DASHBOARD");
    }
}
