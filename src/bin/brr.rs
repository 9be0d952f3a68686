//! CLI entry point. Requires the `cli` feature.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use brr::cli::{self, Cli};

fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli::run(cli) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error_kind = e.error_kind(), error = %e, "command failed");
            std::process::ExitCode::FAILURE
        }
    }
}
