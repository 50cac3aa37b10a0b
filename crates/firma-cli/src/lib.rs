//! # firma-cli — Operator CLI Command Handlers
//!
//! Each subcommand has an args struct and a `run_*` handler returning
//! `anyhow::Result<u8>` (the process exit code). The binary entry point
//! in `main.rs` owns argument parsing and tracing setup.

pub mod document;
pub mod session;

use firma_client::{ClientConfig, SigningClient};

/// Build a signing API client from the global CLI options.
pub fn build_client(base_url: &str, auth_token: Option<String>) -> anyhow::Result<SigningClient> {
    let mut config = ClientConfig::new(base_url);
    config.auth_token = auth_token;
    Ok(SigningClient::new(config)?)
}
