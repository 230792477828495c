//! USSD loan eligibility service
//!
//! Answers telecom gateway callbacks with menu screens driven by a
//! per-session state machine, and onboards eligible customers.

mod api;
mod config;
mod db;
mod runtime;
mod sms;
mod state_machine;

use api::{create_router, AppState};
use config::Config;
use db::Database;
use sms::{LogNotifier, Notifier, SmsClient};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ussd_loans=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = Config::from_env();

    // Ensure database directory exists
    if let Some(parent) = config.db.path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %config.db.path.display(), "Opening database");
    let db = Database::open(&config.db)?;

    let notifier: Arc<dyn Notifier> = match config.sms.clone() {
        Some(sms) => {
            tracing::info!(url = %sms.url, "SMS gateway configured");
            Arc::new(SmsClient::new(sms)?)
        }
        None => {
            tracing::warn!("SMS_URL not set, eligibility messages will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let state = AppState::new(db, notifier, config.public_url.clone());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("USSD loan service listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
