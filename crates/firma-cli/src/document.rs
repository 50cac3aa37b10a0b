//! Document directory subcommands.

use clap::Args;
use firma_client::SigningClient;

/// Arguments for `firma register`.
#[derive(Args, Debug)]
pub struct RegisterArgs {
    /// Document title shown to the signer.
    pub title: String,

    /// Notarial document type (contrato, poder, declaración jurada, ...).
    #[arg(long, default_value = "documento")]
    pub document_type: String,
}

/// Register a document and print its identifier.
pub async fn run_register(client: &SigningClient, args: &RegisterArgs) -> anyhow::Result<u8> {
    let doc = client
        .register_document(&args.title, &args.document_type)
        .await?;
    println!("document registered");
    println!("  id:    {}", doc.id);
    println!("  title: {}", doc.title);
    println!("  type:  {}", doc.document_type);
    Ok(0)
}
