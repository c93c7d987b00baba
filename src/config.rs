use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_addr: String,
    pub session_ttl_hours: i64,
    /// Catalog/AI automation webhook.
    pub webhook_url: Option<String>,
    pub webhook_connected: bool,
    /// Login/registration webhook. Auth endpoints answer 503 without it.
    pub auth_webhook_url: Option<String>,
    pub chat_console_url: Option<String>,
    /// Serve requests without a bearer token as the built-in superadmin.
    pub auth_bypass: bool,
    pub dev_user_email: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let session_ttl_hours = env::var("SESSION_TTL_HOURS")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(24);

        Ok(Self {
            bind_addr,
            session_ttl_hours,
            webhook_url: non_empty_var("N8N_WEBHOOK_URL"),
            webhook_connected: env_bool("N8N_WEBHOOK_CONNECTED").unwrap_or(false),
            auth_webhook_url: non_empty_var("N8N_AUTH_WEBHOOK_URL"),
            chat_console_url: non_empty_var("CHAT_CONSOLE_URL"),
            auth_bypass: env_bool("AUTH_BYPASS").unwrap_or(true),
            dev_user_email: env::var("DEV_USER_EMAIL")
                .unwrap_or_else(|_| "dev@clinica.com".to_string()),
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_bool(key: &str) -> Option<bool> {
    env::var(key).ok().and_then(|v| parse_bool(&v))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_accepts_common_spellings() {
        for raw in ["1", "true", "YES", " on "] {
            assert_eq!(parse_bool(raw), Some(true), "{raw:?}");
        }
        for raw in ["0", "False", "no", "off"] {
            assert_eq!(parse_bool(raw), Some(false), "{raw:?}");
        }
    }

    #[test]
    fn parse_bool_rejects_garbage() {
        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(parse_bool(""), None);
    }
}
