//! # firma-api — Binary Entry Point
//!
//! Starts the Axum HTTP server for the Firma Stack signing service.
//! Binds to a configurable port (default 8080).

use chrono::Utc;

use firma_api::state::{AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env();
    let port = config.port;

    // Initialize database pool (optional — absent means in-memory only).
    let db_pool = firma_api::db::init_pool().await.map_err(|e| {
        tracing::error!("database initialization failed: {e}");
        e
    })?;

    let state = AppState::with_config(config, db_pool);

    // Storage-hygiene sweep: lazily-checked expiry stays authoritative,
    // this just keeps the active index from accumulating overdue entries.
    let sweep_sessions = state.sessions.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
        loop {
            interval.tick().await;
            let flipped = sweep_sessions.sweep_expired(Utc::now());
            if flipped > 0 {
                tracing::debug!(flipped, "expired overdue signing sessions");
            }
        }
    });

    let app = firma_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("firma-api listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
