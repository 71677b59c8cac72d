//! Payrun CLI binary.

use anyhow::Result;
use payrun::cli::Cli;
use tracing_subscriber::EnvFilter;

/// Main entry point for the payrun CLI.
///
/// Uses tokio's current_thread runtime: cascades issue store calls one at a
/// time, so a single thread is enough.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Can be controlled via RUST_LOG environment variable
    // Example: RUST_LOG=payrun=debug,payrun_cascade=debug payrun delete positions pos-1
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("payrun=info,payrun_cascade=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Starting payrun CLI");

    let cli = Cli::parse_args();
    cli.execute().await?;

    tracing::debug!("Payrun CLI completed successfully");
    Ok(())
}
