//! # firma-api — Axum API Service for the Firma Stack
//!
//! REST surface for the QR-relayed remote document-signing handshake:
//! a desktop operator opens a signing session for a document, renders
//! the signing URL as a QR, and polls status while the signer's mobile
//! device confirms the scan and submits the signature.
//!
//! ## API Surface
//!
//! | Prefix                          | Module                 | Auth        |
//! |---------------------------------|------------------------|-------------|
//! | `POST /v1/documents`            | [`routes::documents`]  | bearer      |
//! | `GET  /v1/documents/{id}`       | [`routes::documents`]  | bearer      |
//! | `POST /v1/signing-sessions`     | [`routes::sessions`]   | bearer      |
//! | `GET  /v1/signing-sessions/{d}/{c}` | [`routes::sessions`] | bearer    |
//! | `POST /v1/signing-sessions/{d}/{c}/scan` | [`routes::sessions`] | code |
//! | `POST /v1/signing-sessions/{d}/{c}/sign` | [`routes::sessions`] | code |
//! | `GET  /v1/signing-sessions/{d}/{c}/document` | [`routes::sessions`] | code |
//! | `GET  /openapi.json`            | [`openapi`]            | bearer      |
//! | `GET  /health/*`, `GET /metrics`| here                   | none        |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → [AuthMiddleware, desktop only] → Handler
//! ```
//!
//! Mobile confirmation routes carry no bearer auth: the verification
//! code in the path is the credential a signer's phone presents.

pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod identity;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::{Extension, Router};
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

pub use error::AppError;

/// Check if metrics are enabled via the `FIRMA_METRICS_ENABLED` env var.
/// Defaults to `true` when the variable is absent or set to anything
/// other than `"false"`.
fn metrics_enabled() -> bool {
    std::env::var("FIRMA_METRICS_ENABLED")
        .map(|v| v.to_lowercase() != "false")
        .unwrap_or(true)
}

/// Assemble the full application router with all routes and middleware.
///
/// Health probes (`/health/*`) and `/metrics` are mounted outside the
/// auth middleware so they remain accessible without credentials.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };
    let metrics = ApiMetrics::new();
    let metrics_on = metrics_enabled();

    // Desktop-side routes behind bearer auth (when a token is configured).
    let desktop = Router::new()
        .merge(routes::documents::router())
        .merge(routes::sessions::desktop_router())
        .merge(openapi::router())
        .layer(from_fn(auth::auth_middleware));

    // Mobile-side routes: the verification code is the credential.
    let mobile = routes::sessions::mobile_router();

    // Body size limit: 1 MiB. Signature payloads are capped well below
    // this at the validation layer; the limit guards the parser.
    let mut api = desktop
        .merge(mobile)
        .layer(DefaultBodyLimit::max(1024 * 1024));

    if metrics_on {
        api = api
            .layer(from_fn(middleware::metrics::metrics_middleware))
            .layer(Extension(metrics.clone()));
    }

    let api = api
        .layer(TraceLayer::new_for_http())
        .layer(Extension(auth_config))
        .with_state(state.clone());

    // Unauthenticated health probes.
    let mut unauthenticated = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    if metrics_on {
        unauthenticated = unauthenticated
            .route("/metrics", axum::routing::get(prometheus_metrics))
            .layer(Extension(metrics));
    }

    let unauthenticated = unauthenticated.with_state(state);

    Router::new().merge(unauthenticated).merge(api)
}

/// GET /metrics — Prometheus metrics scrape endpoint.
///
/// Updates domain gauges from current `AppState` on each scrape (pull
/// model), then gathers and encodes all metrics in text exposition
/// format.
async fn prometheus_metrics(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
) -> impl IntoResponse {
    let counts = state.sessions.status_counts();
    metrics.sessions_total().reset();
    for (status, count) in &counts {
        metrics
            .sessions_total()
            .with_label_values(&[status.as_str()])
            .set(*count as f64);
    }
    metrics.sessions_active().set(state.sessions.active_len() as f64);
    metrics.documents_total().set(state.documents.len() as f64);
    metrics
        .documents_signed()
        .set(state.documents.signed_len() as f64);

    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

/// Liveness probe — always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — verifies the application is ready to serve traffic.
///
/// Checks:
/// - In-memory stores are accessible (locks acquirable).
/// - Database connection is healthy (when configured).
///
/// Returns 200 "ready" or 503 with a diagnostic message.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    // Verify stores are accessible.
    let _ = state.sessions.len();
    let _ = state.documents.len();

    // Verify database connection (when configured).
    if let Some(pool) = &state.db_pool {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!("database health check failed: {e}");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable").into_response();
        }
    }

    (StatusCode::OK, "ready").into_response()
}
