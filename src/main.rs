mod auth;
mod config;
mod middleware;

mod error;
mod finance;
mod models;
mod navigation;
mod overview;
mod routes;
mod scheduler;
mod session;
mod settings;
mod store;
mod webhook;

use std::collections::HashMap;
use std::sync::Arc;

use crate::{config::Config, models::AppState, store::Store, webhook::HttpWebhook};

use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use axum::http::header;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cfg = Config::from_env()?;
    let today = chrono::Local::now().date_naive();
    let services = settings::default_services(&cfg);

    if cfg.auth_bypass {
        tracing::warn!(user = %cfg.dev_user_email, "AUTH_BYPASS enabled: requests without a token run as superadmin");
    }
    if settings::connected_webhook_url(&services).is_none() {
        tracing::warn!("n8n webhook not connected; catalog changes will be saved locally only");
    }

    let state = AppState {
        store: Arc::new(RwLock::new(Store::seeded(today))),
        sessions: Arc::new(RwLock::new(HashMap::new())),
        services: Arc::new(RwLock::new(services)),
        webhook: Arc::new(HttpWebhook::new()?),
        auth_webhook_url: cfg.auth_webhook_url.clone(),
        chat_console_url: cfg.chat_console_url.clone(),
        auth_bypass: cfg.auth_bypass,
        dev_user_email: cfg.dev_user_email.clone(),
        session_ttl_hours: cfg.session_ttl_hours,
    };

    // Browser front-ends call the API from another origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]);

    let app = routes::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    tracing::info!("Listening on http://{}", cfg.bind_addr);
    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
