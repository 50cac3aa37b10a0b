//! # firma CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.
//! Uses clap derive macros for argument parsing.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use firma_cli::document::{run_register, RegisterArgs};
use firma_cli::session::{
    run_create, run_scan, run_sign, run_status, run_watch, CreateArgs, ScanArgs, SignArgs,
    StatusArgs, WatchArgs,
};

/// Firma Stack CLI
///
/// Operator tooling for the QR remote-signing service: register
/// documents, issue signing sessions, watch them to completion, and
/// drive the mobile confirmation steps for testing.
#[derive(Parser, Debug)]
#[command(name = "firma", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Signing API origin. Falls back to FIRMA_BASE_URL, then localhost.
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Bearer token for desktop-side routes. Falls back to FIRMA_AUTH_TOKEN.
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register a document with the directory.
    Register(RegisterArgs),

    /// Open a signing session and print the code and signing URL.
    Create(CreateArgs),

    /// Read a session's current status.
    Status(StatusArgs),

    /// Poll a session until it reaches a terminal state.
    Watch(WatchArgs),

    /// Confirm the scan step (plays the mobile side).
    Scan(ScanArgs),

    /// Submit the signature step (plays the mobile side).
    Sign(SignArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity level.
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let base_url = cli
        .base_url
        .clone()
        .or_else(|| std::env::var("FIRMA_BASE_URL").ok())
        .unwrap_or_else(|| "http://localhost:8080".to_string());
    let token = cli
        .token
        .clone()
        .or_else(|| std::env::var("FIRMA_AUTH_TOKEN").ok());

    let client = match firma_cli::build_client(&base_url, token) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("{e:#}");
            return ExitCode::from(1);
        }
    };

    let result = match &cli.command {
        Commands::Register(args) => run_register(&client, args).await,
        Commands::Create(args) => run_create(&client, args).await,
        Commands::Status(args) => run_status(&client, args).await,
        Commands::Watch(args) => run_watch(&client, args).await,
        Commands::Scan(args) => run_scan(&client, args).await,
        Commands::Sign(args) => run_sign(&client, args).await,
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
