//! # Typed Signing API Client
//!
//! Thin typed wrapper over the REST surface. Response shapes mirror the
//! server DTOs; status values deserialize into
//! [`firma_session::SessionStatus`] so callers branch on an enum, not
//! strings.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use url::Url;
use uuid::Uuid;

use firma_session::{SessionStatus, SignatureRecord};

use crate::error::ClientError;
use crate::retry::retry_send;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Origin of the signing API (for example `http://localhost:8080`).
    pub base_url: String,
    /// Bearer token for the desktop-side routes, when the server
    /// requires one.
    pub auth_token: Option<String>,
    /// Per-request timeout.
    pub timeout: std::time::Duration,
}

impl ClientConfig {
    /// Configuration for a local development server.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth_token: None,
            timeout: std::time::Duration::from_secs(10),
        }
    }
}

// ── Response DTOs ────────────────────────────────────────────────────

/// A registered document.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisteredDocument {
    pub id: Uuid,
    pub title: String,
    pub document_type: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A freshly issued signing session.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedSession {
    pub document_id: Uuid,
    pub verification_code: String,
    /// The URL to render as a QR code.
    pub signing_url: String,
    pub qr_data: String,
    pub expires_at: DateTime<Utc>,
}

/// A session status snapshot from the poll endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionState {
    pub document_id: Uuid,
    pub verification_code: String,
    pub status: SessionStatus,
    #[serde(default)]
    pub detail: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// Result of a signature submission.
#[derive(Debug, Clone, Deserialize)]
pub struct SignOutcome {
    pub ok: bool,
    pub status: SessionStatus,
    pub signature_record: SignatureRecord,
}

/// Server error body shape.
#[derive(Debug, Deserialize)]
struct WireErrorBody {
    error: WireErrorDetail,
}

#[derive(Debug, Deserialize)]
struct WireErrorDetail {
    code: String,
    message: String,
}

// ── Client ───────────────────────────────────────────────────────────

/// Typed HTTP client for the signing API.
#[derive(Debug, Clone)]
pub struct SigningClient {
    http: reqwest::Client,
    base_url: Url,
    auth_token: Option<String>,
}

impl SigningClient {
    /// Build a client from configuration.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| ClientError::InvalidBaseUrl {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            http,
            base_url,
            auth_token: config.auth_token,
        })
    }

    /// Register a document with the directory.
    pub async fn register_document(
        &self,
        title: &str,
        document_type: &str,
    ) -> Result<RegisteredDocument, ClientError> {
        let url = self.endpoint("v1/documents")?;
        let body = serde_json::json!({"title": title, "document_type": document_type});
        let resp = retry_send(|| self.authorized(self.http.post(url.clone())).json(&body).send())
            .await?;
        Self::decode(resp).await
    }

    /// Open a signing session for a document.
    pub async fn create_session(&self, document_id: Uuid) -> Result<CreatedSession, ClientError> {
        let url = self.endpoint("v1/signing-sessions")?;
        let body = serde_json::json!({"document_id": document_id});
        let resp = retry_send(|| self.authorized(self.http.post(url.clone())).json(&body).send())
            .await?;
        Self::decode(resp).await
    }

    /// Read the current status of a session.
    pub async fn status(
        &self,
        document_id: Uuid,
        verification_code: &str,
    ) -> Result<SessionState, ClientError> {
        let url = self.endpoint(&format!(
            "v1/signing-sessions/{document_id}/{verification_code}"
        ))?;
        let resp = retry_send(|| self.authorized(self.http.get(url.clone())).send()).await?;
        Self::decode(resp).await
    }

    /// Confirm the scan step (the mobile side of the handshake; exposed
    /// here for the operator CLI and tests).
    pub async fn confirm_scan(
        &self,
        document_id: Uuid,
        verification_code: &str,
    ) -> Result<SessionState, ClientError> {
        let url = self.endpoint(&format!(
            "v1/signing-sessions/{document_id}/{verification_code}/scan"
        ))?;
        let resp = retry_send(|| self.http.post(url.clone()).send()).await?;
        // The scan response carries {ok, status}; fold it into a status
        // read for a uniform return shape.
        let _: ScanAck = Self::decode(resp).await?;
        self.status(document_id, verification_code).await
    }

    /// Submit a signature with the signer's identity proof.
    pub async fn submit_signature(
        &self,
        document_id: Uuid,
        verification_code: &str,
        signature_payload: &str,
        signer_rut: &str,
        evidence: &str,
    ) -> Result<SignOutcome, ClientError> {
        let url = self.endpoint(&format!(
            "v1/signing-sessions/{document_id}/{verification_code}/sign"
        ))?;
        let body = serde_json::json!({
            "signature_payload": signature_payload,
            "signer_identity_proof": {"rut": signer_rut, "evidence": evidence},
        });
        let resp = retry_send(|| self.http.post(url.clone()).json(&body).send()).await?;
        Self::decode(resp).await
    }

    // ── Internals ────────────────────────────────────────────────────

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::InvalidBaseUrl {
                url: format!("{}/{path}", self.base_url),
                reason: e.to_string(),
            })
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Decode a 2xx body as `T`, or a non-2xx body as a structured API
    /// error.
    async fn decode<T: serde::de::DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = resp.status();
        if status.is_success() {
            let bytes = resp.bytes().await?;
            return serde_json::from_slice(&bytes)
                .map_err(|e| ClientError::UnexpectedBody(e.to_string()));
        }

        let status = status.as_u16();
        let bytes = resp.bytes().await?;
        match serde_json::from_slice::<WireErrorBody>(&bytes) {
            Ok(body) => Err(ClientError::Api {
                status,
                code: body.error.code,
                message: body.error.message,
            }),
            Err(_) => Err(ClientError::Api {
                status,
                code: "UNKNOWN".into(),
                message: String::from_utf8_lossy(&bytes).into_owned(),
            }),
        }
    }
}

/// Acknowledgement body from the scan endpoint.
#[derive(Debug, Deserialize)]
struct ScanAck {
    #[allow(dead_code)]
    ok: bool,
    #[allow(dead_code)]
    status: SessionStatus,
}
