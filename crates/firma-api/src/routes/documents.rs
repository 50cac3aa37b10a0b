//! # Document Directory Routes
//!
//! Minimal registration/lookup surface for the documents that signing
//! sessions reference. The wider platform owns document content and
//! templates; the signing subsystem only needs existence, display
//! metadata, and the signed flag.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use firma_core::DocumentId;

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::{AppState, DocumentRecord};

/// Request to register a document with the directory.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RegisterDocumentRequest {
    /// Display title shown to the signer.
    pub title: String,
    /// Notarial document type ("contrato", "poder", "declaración jurada", ...).
    pub document_type: String,
}

impl Validate for RegisterDocumentRequest {
    fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title must be non-empty".into());
        }
        if self.title.len() > 255 {
            return Err(format!("title too long: {} chars (max 255)", self.title.len()));
        }
        if self.document_type.trim().is_empty() {
            return Err("document_type must be non-empty".into());
        }
        if self.document_type.len() > 64 {
            return Err(format!(
                "document_type too long: {} chars (max 64)",
                self.document_type.len()
            ));
        }
        Ok(())
    }
}

/// POST /v1/documents — register a document.
#[utoipa::path(
    post,
    path = "/v1/documents",
    request_body = RegisterDocumentRequest,
    responses(
        (status = 201, description = "Document registered", body = DocumentRecord),
        (status = 422, description = "Invalid request body"),
    ),
    tag = "documents"
)]
pub async fn register_document(
    State(state): State<AppState>,
    body: Result<Json<RegisterDocumentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DocumentRecord>), AppError> {
    let req = extract_validated_json(body)?;
    let record = state
        .documents
        .register(req.title.trim(), req.document_type.trim(), Utc::now());
    tracing::info!(document_id = %record.id, "registered document");
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /v1/documents/{document_id} — look up a document.
#[utoipa::path(
    get,
    path = "/v1/documents/{document_id}",
    params(("document_id" = Uuid, Path, description = "Document UUID")),
    responses(
        (status = 200, description = "Document record", body = DocumentRecord),
        (status = 404, description = "Unknown document"),
    ),
    tag = "documents"
)]
pub async fn get_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<DocumentRecord>, AppError> {
    let document_id = DocumentId::from(document_id);
    state
        .documents
        .get(&document_id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("document {document_id} not found")))
}

/// Build the document directory router (desktop side, authenticated).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/documents", post(register_document))
        .route("/v1/documents/:document_id", get(get_document))
}
