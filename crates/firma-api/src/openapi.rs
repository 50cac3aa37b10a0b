//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Adds the Bearer token security scheme to the OpenAPI spec.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some(
                            "Bearer token authentication for desktop-side routes. \
                             Set via FIRMA_AUTH_TOKEN env var.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Firma API — QR Remote-Signing Service",
        version = "0.3.2",
        description = "REST surface for the QR-relayed remote document-signing handshake.\n\nA desktop operator opens a signing session for a document and renders the returned signing URL as a QR code; the signer's mobile device confirms the scan, passes identity verification, and submits the signature while the desktop polls session status.\n\nDesktop routes (document registration, session creation, status polling) require `Authorization: Bearer <token>` when a token is configured. Mobile routes are authenticated by the session's verification code. Health probes (`/health/*`) and `/metrics` are unauthenticated.",
        license(name = "BUSL-1.1"),
        contact(name = "CerfiDoc", url = "https://cerfidoc.cl")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    security(
        ("bearer_auth" = [])
    ),
    paths(
        // ── Documents ────────────────────────────────────────────────
        crate::routes::documents::register_document,
        crate::routes::documents::get_document,
        // ── Signing sessions ─────────────────────────────────────────
        crate::routes::sessions::create_session,
        crate::routes::sessions::get_session_status,
        crate::routes::sessions::confirm_scan,
        crate::routes::sessions::submit_signature,
        crate::routes::sessions::document_info,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::identity::SignerIdentityProof,
        crate::routes::documents::RegisterDocumentRequest,
        crate::routes::sessions::CreateSessionRequest,
        crate::routes::sessions::CreateSessionResponse,
        crate::routes::sessions::StatusResponse,
        crate::routes::sessions::ScanResponse,
        crate::routes::sessions::SignRequest,
        crate::routes::sessions::SignResponse,
        crate::routes::sessions::DocumentInfoResponse,
        crate::routes::sessions::DocumentSummary,
        crate::state::DocumentRecord,
        crate::state::DocumentStatus,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "documents", description = "Document directory"),
        (name = "signing-sessions", description = "QR remote-signing handshake"),
    )
)]
pub struct ApiDoc;

/// GET /openapi.json — the assembled spec.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Router serving the OpenAPI document.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}
