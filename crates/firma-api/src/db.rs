//! # Optional Postgres Audit Persistence
//!
//! Terminal signing sessions are appended to an audit table when
//! `DATABASE_URL` is configured. The in-memory store stays authoritative
//! for protocol decisions; the table serves retention and after-the-fact
//! review, so writes are best effort and idempotent on session id.
//!
//! Without `DATABASE_URL` the service runs in-memory only.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use firma_session::SigningSession;

/// Audit table schema, applied at startup.
const AUDIT_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS signing_session_audit (
    id UUID PRIMARY KEY,
    document_id UUID NOT NULL,
    verification_code TEXT NOT NULL,
    status TEXT NOT NULL,
    detail TEXT,
    created_at TIMESTAMPTZ NOT NULL,
    expires_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL,
    signature_record JSONB
)
"#;

/// Connect to Postgres when `DATABASE_URL` is set, ensuring the audit
/// schema exists. Returns `Ok(None)` when unset.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        tracing::info!("DATABASE_URL not set; running without audit persistence");
        return Ok(None);
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await?;
    sqlx::query(AUDIT_SCHEMA).execute(&pool).await?;
    tracing::info!("audit persistence enabled");
    Ok(Some(pool))
}

/// Append a terminal session to the audit table. Idempotent: replaying
/// the same session id is a no-op.
pub async fn record_terminal_session(
    pool: &PgPool,
    session: &SigningSession,
) -> Result<(), sqlx::Error> {
    let signature_record = session
        .signature_record
        .as_ref()
        .and_then(|r| serde_json::to_value(r).ok());

    sqlx::query(
        "INSERT INTO signing_session_audit \
         (id, document_id, verification_code, status, detail, created_at, expires_at, updated_at, signature_record) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         ON CONFLICT (id) DO NOTHING",
    )
    .bind(session.id)
    .bind(session.document_id.as_uuid())
    .bind(session.verification_code.as_str())
    .bind(session.status.as_str())
    .bind(session.detail.as_deref())
    .bind(session.created_at)
    .bind(session.expires_at)
    .bind(session.updated_at)
    .bind(signature_record)
    .execute(pool)
    .await?;
    Ok(())
}
