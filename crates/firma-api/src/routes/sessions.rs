//! # Signing-Session Routes
//!
//! The QR remote-signing handshake over REST:
//!
//! - `POST /v1/signing-sessions` — issue a session + signing URL (desktop)
//! - `GET  /v1/signing-sessions/{document_id}/{code}` — status poll (desktop)
//! - `POST /v1/signing-sessions/{document_id}/{code}/scan` — scan confirmation (mobile)
//! - `POST /v1/signing-sessions/{document_id}/{code}/sign` — signature submission (mobile)
//! - `GET  /v1/signing-sessions/{document_id}/{code}/document` — signing-page info (mobile)
//!
//! Desktop routes sit behind the bearer-token middleware; mobile routes
//! are authenticated by the verification code itself.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use firma_core::{DocumentId, VerificationCode};
use firma_session::{signing_url, SessionStatus, SignatureRecord, SigningSession};

use crate::db;
use crate::error::AppError;
use crate::extractors::{extract_json, extract_validated_json, Validate};
use crate::identity::{IdentityError, SignerIdentityProof};
use crate::state::AppState;

// ── DTOs ─────────────────────────────────────────────────────────────

/// Request to open a signing session for a document.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateSessionRequest {
    /// The document to sign. Must exist in the document directory.
    pub document_id: Uuid,
}

/// Response carrying the code and URL the desktop renders as a QR.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateSessionResponse {
    pub document_id: Uuid,
    pub verification_code: String,
    /// Fully-qualified URL the mobile device opens.
    pub signing_url: String,
    /// Payload for the QR renderer (the signing URL verbatim).
    pub qr_data: String,
    pub expires_at: DateTime<Utc>,
}

/// Current session status, as observed by the desktop poller.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    pub document_id: Uuid,
    pub verification_code: String,
    #[schema(value_type = String)]
    pub status: SessionStatus,
    /// Context for `expired`/`error` statuses, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// Scan confirmation result.
#[derive(Debug, Serialize, ToSchema)]
pub struct ScanResponse {
    pub ok: bool,
    #[schema(value_type = String)]
    pub status: SessionStatus,
}

/// Signature submission from the signer's device.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct SignRequest {
    /// Opaque signature payload produced by the device.
    pub signature_payload: String,
    /// Identity proof checked before the signature is accepted.
    pub signer_identity_proof: SignerIdentityProof,
}

impl Validate for SignRequest {
    fn validate(&self) -> Result<(), String> {
        if self.signature_payload.trim().is_empty() {
            return Err("signature_payload must be non-empty".into());
        }
        if self.signature_payload.len() > 256 * 1024 {
            return Err(format!(
                "signature_payload too large: {} bytes (max 262144)",
                self.signature_payload.len()
            ));
        }
        if self.signer_identity_proof.rut.trim().is_empty() {
            return Err("signer_identity_proof.rut must be non-empty".into());
        }
        Ok(())
    }
}

/// Signature submission result.
#[derive(Debug, Serialize, ToSchema)]
pub struct SignResponse {
    pub ok: bool,
    #[schema(value_type = String)]
    pub status: SessionStatus,
    #[schema(value_type = Object)]
    pub signature_record: SignatureRecord,
}

/// Document metadata shown on the mobile signing page.
#[derive(Debug, Serialize, ToSchema)]
pub struct DocumentInfoResponse {
    pub document_id: Uuid,
    pub verification_code: String,
    #[schema(value_type = String)]
    pub status: SessionStatus,
    pub expires_at: DateTime<Utc>,
    pub document: DocumentSummary,
}

/// Summary of the document under signature.
#[derive(Debug, Serialize, ToSchema)]
pub struct DocumentSummary {
    pub title: String,
    pub document_type: String,
    pub created_at: DateTime<Utc>,
}

// ── Handlers ─────────────────────────────────────────────────────────

/// POST /v1/signing-sessions — open a session for a document.
///
/// Any prior non-terminal session for the same document is expired in
/// the same operation, so exactly one session is active per document
/// when this returns.
#[utoipa::path(
    post,
    path = "/v1/signing-sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session issued", body = CreateSessionResponse),
        (status = 404, description = "Unknown document"),
        (status = 422, description = "Malformed request body"),
    ),
    tag = "signing-sessions"
)]
pub async fn create_session(
    State(state): State<AppState>,
    body: Result<Json<CreateSessionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), AppError> {
    let req = extract_json(body)?;
    let document_id = DocumentId::from(req.document_id);
    if !state.documents.contains(&document_id) {
        return Err(AppError::NotFound(format!("document {document_id} not found")));
    }

    let now = Utc::now();
    let session = state
        .sessions
        .create(document_id, state.config.session_ttl, now);
    let url = signing_url(&state.config.base_url, document_id, &session.verification_code);

    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            document_id: req.document_id,
            verification_code: session.verification_code.to_string(),
            signing_url: url.clone(),
            qr_data: url,
            expires_at: session.expires_at,
        }),
    ))
}

/// GET /v1/signing-sessions/{document_id}/{code} — status poll.
///
/// Idempotent and safe to call arbitrarily often; its only side effect
/// is the lazy expiry flip on an overdue session.
#[utoipa::path(
    get,
    path = "/v1/signing-sessions/{document_id}/{verification_code}",
    params(
        ("document_id" = Uuid, Path, description = "Document UUID"),
        ("verification_code" = String, Path, description = "Session verification code"),
    ),
    responses(
        (status = 200, description = "Current session status", body = StatusResponse),
        (status = 404, description = "Unknown document/code pair"),
    ),
    tag = "signing-sessions"
)]
pub async fn get_session_status(
    State(state): State<AppState>,
    Path((document_id, code)): Path<(Uuid, String)>,
) -> Result<Json<StatusResponse>, AppError> {
    let document_id = DocumentId::from(document_id);
    let code = parse_code(document_id, &code)?;
    let session = state.sessions.status(document_id, &code, Utc::now())?;
    Ok(Json(status_response(&session)))
}

/// POST /v1/signing-sessions/{document_id}/{code}/scan — the signer
/// opened the link and began identity verification.
///
/// Idempotent: a repeat while already `scanned` (a mobile network retry)
/// reports success without a second transition.
#[utoipa::path(
    post,
    path = "/v1/signing-sessions/{document_id}/{verification_code}/scan",
    params(
        ("document_id" = Uuid, Path, description = "Document UUID"),
        ("verification_code" = String, Path, description = "Session verification code"),
    ),
    responses(
        (status = 200, description = "Scan confirmed", body = ScanResponse),
        (status = 404, description = "Unknown document/code pair"),
        (status = 409, description = "Session already completed"),
        (status = 410, description = "Session expired"),
    ),
    tag = "signing-sessions"
)]
pub async fn confirm_scan(
    State(state): State<AppState>,
    Path((document_id, code)): Path<(Uuid, String)>,
) -> Result<Json<ScanResponse>, AppError> {
    let document_id = DocumentId::from(document_id);
    let code = parse_code(document_id, &code)?;
    let (session, _transitioned) = state
        .sessions
        .confirm_scan(document_id, &code, Utc::now())?;
    Ok(Json(ScanResponse {
        ok: true,
        status: session.status,
    }))
}

/// POST /v1/signing-sessions/{document_id}/{code}/sign — submit the
/// signature from the signer's device.
///
/// Requires a prior scan confirmation; the identity proof must pass
/// verification before the signature is accepted. On success the session
/// is terminal and the document directory is notified.
#[utoipa::path(
    post,
    path = "/v1/signing-sessions/{document_id}/{verification_code}/sign",
    params(
        ("document_id" = Uuid, Path, description = "Document UUID"),
        ("verification_code" = String, Path, description = "Session verification code"),
    ),
    request_body = SignRequest,
    responses(
        (status = 200, description = "Signature recorded", body = SignResponse),
        (status = 404, description = "Unknown document/code pair"),
        (status = 409, description = "Session not in scanned state"),
        (status = 410, description = "Session expired"),
        (status = 422, description = "Identity verification failed or invalid body"),
    ),
    tag = "signing-sessions"
)]
pub async fn submit_signature(
    State(state): State<AppState>,
    Path((document_id, code)): Path<(Uuid, String)>,
    body: Result<Json<SignRequest>, JsonRejection>,
) -> Result<Json<SignResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let document_id = DocumentId::from(document_id);
    let code = parse_code(document_id, &code)?;
    let now = Utc::now();

    // State precondition before any identity work: a session that was
    // never scanned is rejected outright. The store re-checks under its
    // lock, so a race here still resolves to exactly one signature.
    let current = state.sessions.status(document_id, &code, now)?;
    guard_signable(&current)?;

    let signer = match state.identity.verify(&req.signer_identity_proof) {
        Ok(signer) => signer,
        Err(err @ IdentityError::Malformed(_)) => {
            // User-correctable: the session stays scanned for a retry
            // with corrected input.
            return Err(err.into());
        }
        Err(err @ IdentityError::Rejected(_)) => {
            // Hard rejection from the verifying authority: the session
            // cannot proceed and a fresh one must be issued.
            if let Ok(failed) = state
                .sessions
                .fail(document_id, &code, err.to_string(), now)
            {
                audit_terminal(&state, &failed).await;
            }
            return Err(err.into());
        }
    };

    let record = SignatureRecord::new(signer.rut, req.signature_payload, now);
    let session = state
        .sessions
        .submit_signature(document_id, &code, record, now)?;

    // Call-out to the document collaborator.
    state.documents.mark_signed(&document_id, now);
    audit_terminal(&state, &session).await;

    let signature_record = session
        .signature_record
        .clone()
        .ok_or_else(|| AppError::Internal("signed session missing signature record".into()))?;

    Ok(Json(SignResponse {
        ok: true,
        status: session.status,
        signature_record,
    }))
}

/// GET /v1/signing-sessions/{document_id}/{code}/document — metadata
/// for the mobile signing page. Validates the code without consuming it.
#[utoipa::path(
    get,
    path = "/v1/signing-sessions/{document_id}/{verification_code}/document",
    params(
        ("document_id" = Uuid, Path, description = "Document UUID"),
        ("verification_code" = String, Path, description = "Session verification code"),
    ),
    responses(
        (status = 200, description = "Document metadata", body = DocumentInfoResponse),
        (status = 404, description = "Unknown document/code pair"),
        (status = 409, description = "Session already completed"),
        (status = 410, description = "Session expired"),
    ),
    tag = "signing-sessions"
)]
pub async fn document_info(
    State(state): State<AppState>,
    Path((document_id, code)): Path<(Uuid, String)>,
) -> Result<Json<DocumentInfoResponse>, AppError> {
    let document_id = DocumentId::from(document_id);
    let code = parse_code(document_id, &code)?;
    let session = state.sessions.status(document_id, &code, Utc::now())?;

    match session.status {
        SessionStatus::Waiting | SessionStatus::Scanned => {}
        SessionStatus::Expired => {
            return Err(AppError::Expired(format!(
                "signing session for document {document_id} expired at {}",
                session.expires_at
            )))
        }
        SessionStatus::Signed | SessionStatus::Error => {
            return Err(AppError::InvalidState("session already completed".into()))
        }
    }

    let doc = state
        .documents
        .get(&document_id)
        .ok_or_else(|| AppError::NotFound(format!("document {document_id} not found")))?;

    Ok(Json(DocumentInfoResponse {
        document_id: *document_id.as_uuid(),
        verification_code: session.verification_code.to_string(),
        status: session.status,
        expires_at: session.expires_at,
        document: DocumentSummary {
            title: doc.title,
            document_type: doc.document_type,
            created_at: doc.created_at,
        },
    }))
}

// ── Helpers ──────────────────────────────────────────────────────────

/// A malformed code can never match a session; report it exactly like an
/// unknown one so probing reveals nothing about code structure.
fn parse_code(document_id: DocumentId, raw: &str) -> Result<VerificationCode, AppError> {
    VerificationCode::new(raw).map_err(|_| {
        AppError::NotFound(format!(
            "no signing session for document {document_id} with the given code"
        ))
    })
}

/// Reject signature submission unless the session is in `scanned` state.
fn guard_signable(session: &SigningSession) -> Result<(), AppError> {
    match session.status {
        SessionStatus::Scanned => Ok(()),
        SessionStatus::Waiting => Err(AppError::InvalidState(
            "signature requires a prior scan confirmation".into(),
        )),
        SessionStatus::Expired => Err(AppError::Expired(format!(
            "signing session for document {} expired at {}",
            session.document_id, session.expires_at
        ))),
        SessionStatus::Signed | SessionStatus::Error => {
            Err(AppError::InvalidState("session already completed".into()))
        }
    }
}

/// Shape a session snapshot into the status DTO.
fn status_response(session: &SigningSession) -> StatusResponse {
    StatusResponse {
        document_id: *session.document_id.as_uuid(),
        verification_code: session.verification_code.to_string(),
        status: session.status,
        detail: session.detail.clone(),
        expires_at: session.expires_at,
        last_updated: session.updated_at,
    }
}

/// Append a terminal session to the audit table when a pool is
/// configured. Best effort: the in-memory store is authoritative and a
/// persistence failure only logs a warning.
async fn audit_terminal(state: &AppState, session: &SigningSession) {
    if let Some(pool) = &state.db_pool {
        if let Err(e) = db::record_terminal_session(pool, session).await {
            tracing::warn!(error = %e, session_id = %session.id, "audit persistence failed");
        }
    }
}

// ── Routers ──────────────────────────────────────────────────────────

/// Desktop-side routes (session creation and polling). Mounted behind
/// the bearer-token middleware.
pub fn desktop_router() -> Router<AppState> {
    Router::new()
        .route("/v1/signing-sessions", post(create_session))
        .route(
            "/v1/signing-sessions/:document_id/:verification_code",
            get(get_session_status),
        )
}

/// Mobile-side routes. The verification code is the credential: these
/// never see an operator token.
pub fn mobile_router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/signing-sessions/:document_id/:verification_code/scan",
            post(confirm_scan),
        )
        .route(
            "/v1/signing-sessions/:document_id/:verification_code/sign",
            post(submit_signature),
        )
        .route(
            "/v1/signing-sessions/:document_id/:verification_code/document",
            get(document_info),
        )
}
