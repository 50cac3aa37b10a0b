//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! ## Architecture
//!
//! `AppState` holds the signing-subsystem-owned concerns:
//! - **Sessions** — the concurrent signing-session store (`firma-session`)
//! - **Documents** — the in-memory document directory the sessions
//!   reference; the resolution target for "does this document exist"
//!   and the recipient of the "mark signed" call-out
//! - **Identity verifier** — the pluggable proof-verification seam
//! - **Database pool** — optional Postgres handle for audit persistence;
//!   absent means in-memory only
//!
//! Stores use `parking_lot::RwLock` and never hold the lock across an
//! `.await` point.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use utoipa::ToSchema;

use firma_core::DocumentId;
use firma_session::SessionStore;

use crate::auth::SecretToken;
use crate::identity::{IdentityVerifier, MockVerifier};

// ── Configuration ────────────────────────────────────────────────────

/// Service configuration, assembled from the environment at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// TCP port to bind.
    pub port: u16,
    /// Externally reachable origin embedded into signing URLs.
    pub base_url: String,
    /// Session time-to-live.
    pub session_ttl: Duration,
    /// Bearer token guarding the desktop-side routes. `None` disables
    /// authentication (development mode).
    pub auth_token: Option<SecretToken>,
}

impl AppConfig {
    /// Default session TTL: five minutes.
    pub const DEFAULT_TTL_SECS: i64 = 300;

    /// Build configuration from environment variables:
    /// `PORT`, `FIRMA_BASE_URL`, `FIRMA_SESSION_TTL_SECS`, `FIRMA_AUTH_TOKEN`.
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);
        let base_url = std::env::var("FIRMA_BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{port}"));
        let ttl_secs = std::env::var("FIRMA_SESSION_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|s: &i64| *s > 0)
            .unwrap_or(Self::DEFAULT_TTL_SECS);
        let auth_token = std::env::var("FIRMA_AUTH_TOKEN").ok().map(SecretToken::new);
        Self {
            port,
            base_url,
            session_ttl: Duration::seconds(ttl_secs),
            auth_token,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            base_url: "http://localhost:8080".to_string(),
            session_ttl: Duration::seconds(Self::DEFAULT_TTL_SECS),
            auth_token: None,
        }
    }
}

// ── Document Directory ───────────────────────────────────────────────

/// Document lifecycle status as seen by the signing subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    /// Registered, signature outstanding.
    Pending,
    /// A signing session completed for this document.
    Signed,
}

impl DocumentStatus {
    /// The canonical wire name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Signed => "signed",
        }
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Document record held by the directory.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DocumentRecord {
    /// Document identifier.
    #[schema(value_type = uuid::Uuid)]
    pub id: DocumentId,
    /// Display title shown on the mobile signing page.
    pub title: String,
    /// Notarial document type ("declaración jurada", "poder simple", ...).
    pub document_type: String,
    /// Signature status.
    pub status: DocumentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Thread-safe, cheaply cloneable in-memory document directory.
///
/// Stands in for the platform's document service: the signing subsystem
/// needs existence checks, display metadata, and a place to record the
/// "signed" notification.
#[derive(Clone)]
pub struct DocumentDirectory {
    data: Arc<RwLock<HashMap<DocumentId, DocumentRecord>>>,
}

impl DocumentDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a document, returning its record.
    pub fn register(
        &self,
        title: impl Into<String>,
        document_type: impl Into<String>,
        now: DateTime<Utc>,
    ) -> DocumentRecord {
        let record = DocumentRecord {
            id: DocumentId::new(),
            title: title.into(),
            document_type: document_type.into(),
            status: DocumentStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.data.write().insert(record.id, record.clone());
        record
    }

    /// Look up a document by ID.
    pub fn get(&self, id: &DocumentId) -> Option<DocumentRecord> {
        self.data.read().get(id).cloned()
    }

    /// Whether a document exists.
    pub fn contains(&self, id: &DocumentId) -> bool {
        self.data.read().contains_key(id)
    }

    /// Record that a signing session completed for this document.
    /// Returns the updated record, or `None` if the document is unknown.
    pub fn mark_signed(&self, id: &DocumentId, now: DateTime<Utc>) -> Option<DocumentRecord> {
        let mut guard = self.data.write();
        let record = guard.get_mut(id)?;
        record.status = DocumentStatus::Signed;
        record.updated_at = now;
        Some(record.clone())
    }

    /// Total registered documents.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the directory is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Count of documents marked signed, for the metrics scrape.
    pub fn signed_len(&self) -> usize {
        self.data
            .read()
            .values()
            .filter(|d| d.status == DocumentStatus::Signed)
            .count()
    }
}

impl Default for DocumentDirectory {
    fn default() -> Self {
        Self::new()
    }
}

// ── Application State ────────────────────────────────────────────────

/// Shared application state. Cheaply cloneable; all clones share the
/// same stores.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Arc<AppConfig>,
    /// Signing-session store.
    pub sessions: SessionStore,
    /// Document directory collaborator.
    pub documents: DocumentDirectory,
    /// Identity verification seam.
    pub identity: Arc<dyn IdentityVerifier>,
    /// Optional Postgres pool for audit persistence.
    pub db_pool: Option<PgPool>,
}

impl AppState {
    /// Create state with default configuration, the mock identity
    /// verifier, and no database pool.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default(), None)
    }

    /// Create state with explicit configuration and an optional pool.
    pub fn with_config(config: AppConfig, db_pool: Option<PgPool>) -> Self {
        Self {
            config: Arc::new(config),
            sessions: SessionStore::new(),
            documents: DocumentDirectory::new(),
            identity: Arc::new(MockVerifier),
            db_pool,
        }
    }

    /// Replace the identity verifier (production wiring, tests).
    pub fn with_identity_verifier(mut self, verifier: Arc<dyn IdentityVerifier>) -> Self {
        self.identity = verifier;
        self
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
