//! Signing-session subcommands: create, status, watch, and the mobile
//! steps (scan, sign) for driving a handshake from the terminal.

use std::time::Duration;

use clap::Args;
use uuid::Uuid;

use firma_client::{poll_until_terminal, PollConfig, PollOutcome, SigningClient};

/// Arguments for `firma create`.
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Document to open a signing session for.
    pub document_id: Uuid,
}

/// Open a session and print the code and signing URL.
pub async fn run_create(client: &SigningClient, args: &CreateArgs) -> anyhow::Result<u8> {
    let session = client.create_session(args.document_id).await?;
    println!("signing session issued");
    println!("  code:       {}", session.verification_code);
    println!("  url:        {}", session.signing_url);
    println!("  expires at: {}", session.expires_at);
    Ok(0)
}

/// Arguments for `firma status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Document the session belongs to.
    pub document_id: Uuid,
    /// The session's verification code.
    pub verification_code: String,
}

/// Print the current session status.
pub async fn run_status(client: &SigningClient, args: &StatusArgs) -> anyhow::Result<u8> {
    let state = client
        .status(args.document_id, &args.verification_code)
        .await?;
    println!("status: {}", state.status);
    if let Some(detail) = &state.detail {
        println!("detail: {detail}");
    }
    println!("expires at:   {}", state.expires_at);
    println!("last updated: {}", state.last_updated);
    Ok(0)
}

/// Arguments for `firma watch`.
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Document the session belongs to.
    pub document_id: Uuid,
    /// The session's verification code.
    pub verification_code: String,

    /// Seconds between status reads.
    #[arg(long, default_value_t = 3)]
    pub interval_secs: u64,

    /// Extra wall-clock allowance past session expiry before giving up.
    #[arg(long, default_value_t = 30)]
    pub grace_secs: u64,
}

/// Poll a session until it reaches a terminal state.
pub async fn run_watch(client: &SigningClient, args: &WatchArgs) -> anyhow::Result<u8> {
    // Read once up front for the expiry bound.
    let state = client
        .status(args.document_id, &args.verification_code)
        .await?;
    println!("watching session (expires at {})", state.expires_at);

    let outcome = poll_until_terminal(
        client,
        args.document_id,
        &args.verification_code,
        state.expires_at,
        &PollConfig {
            interval: Duration::from_secs(args.interval_secs),
            grace: Duration::from_secs(args.grace_secs),
        },
    )
    .await?;

    match outcome {
        PollOutcome::Signed { signed_at } => {
            println!("signed at {signed_at}");
            Ok(0)
        }
        PollOutcome::Expired { detail } => {
            println!("expired{}", fmt_detail(detail));
            Ok(1)
        }
        PollOutcome::Failed { detail } => {
            println!("failed{}", fmt_detail(detail));
            Ok(1)
        }
        PollOutcome::TimedOut => {
            println!("timed out waiting for a terminal status");
            Ok(1)
        }
    }
}

fn fmt_detail(detail: Option<String>) -> String {
    detail.map(|d| format!(": {d}")).unwrap_or_default()
}

/// Arguments for `firma scan`.
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Document the session belongs to.
    pub document_id: Uuid,
    /// The session's verification code.
    pub verification_code: String,
}

/// Confirm the scan step (plays the mobile side for testing).
pub async fn run_scan(client: &SigningClient, args: &ScanArgs) -> anyhow::Result<u8> {
    let state = client
        .confirm_scan(args.document_id, &args.verification_code)
        .await?;
    println!("scan confirmed, status: {}", state.status);
    Ok(0)
}

/// Arguments for `firma sign`.
#[derive(Args, Debug)]
pub struct SignArgs {
    /// Document the session belongs to.
    pub document_id: Uuid,
    /// The session's verification code.
    pub verification_code: String,

    /// Signer RUT (any common rendering, e.g. 12.345.678-5).
    #[arg(long)]
    pub rut: String,

    /// Identity evidence token from the capture flow.
    #[arg(long)]
    pub evidence: String,

    /// Signature payload; defaults to a marker for manual testing.
    #[arg(long, default_value = "firma-cli-manual-signature")]
    pub payload: String,
}

/// Submit the signature step (plays the mobile side for testing).
pub async fn run_sign(client: &SigningClient, args: &SignArgs) -> anyhow::Result<u8> {
    let outcome = client
        .submit_signature(
            args.document_id,
            &args.verification_code,
            &args.payload,
            &args.rut,
            &args.evidence,
        )
        .await?;
    println!("signature recorded");
    println!("  signer:  {}", outcome.signature_record.signer_rut);
    println!("  at:      {}", outcome.signature_record.signed_at);
    println!("  digest:  {}", outcome.signature_record.payload_digest);
    Ok(0)
}
