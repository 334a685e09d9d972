// crates/docbridge-server/src/main.rs
// ============================================================================
// Module: Docbridge Server Binary
// Description: Access point server entry point.
// Purpose: Load configuration, build the access point, and serve until exit.
// Dependencies: docbridge-server, tokio
// ============================================================================

//! ## Overview
//! The binary takes an optional configuration path as its first argument;
//! otherwise the `DOCBRIDGE_CONFIG` environment variable or `docbridge.toml`
//! in the working directory is used.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::process::ExitCode;

use docbridge_server::AccessPointConfig;
use docbridge_server::AccessPointServer;
use docbridge_server::ServerError;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// Entry point; exits non-zero on startup or serve failure.
fn main() -> ExitCode {
    let path = std::env::args().nth(1).map(PathBuf::from);
    match run(path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_failure(&err);
            ExitCode::FAILURE
        }
    }
}

/// Loads configuration, builds the server, and serves until failure.
fn run(path: Option<PathBuf>) -> Result<(), ServerError> {
    let config = AccessPointConfig::load(path.as_deref())
        .map_err(|err| ServerError::Config(err.to_string()))?;
    let server = AccessPointServer::from_config(&config)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| ServerError::Transport(format!("runtime build failed: {err}")))?;
    runtime.block_on(server.serve())
}

/// Reports a fatal startup or serve failure.
#[allow(clippy::print_stderr, reason = "Failures are reported before any audit sink exists.")]
fn report_failure(err: &ServerError) {
    eprintln!("docbridge-server: {err}");
}
