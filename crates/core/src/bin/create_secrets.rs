//! Provision broker credential files from environment variables.
//!
//! Reads `HTS_ID` plus either numbered `REAL{n}_APP_KEY` / `_APP_SECRET` /
//! `_ACC_NO` triples (one `secret{n}.json` each) or the legacy unnumbered
//! `REAL_*` triple (`secret.json`). A `.env` file in the working directory
//! is loaded first if present. Exits nonzero with every missing variable
//! named, never writing a partial set of files.

use std::collections::HashMap;
use std::path::Path;
use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use fund_dashboard_core::provision::provision;

fn main() -> ExitCode {
    // Absent .env is fine; real environment variables still apply.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let env: HashMap<String, String> = std::env::vars().collect();
    match provision(&env, Path::new(".")) {
        Ok(paths) => {
            info!(files = paths.len(), "Credential provisioning complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Credential provisioning failed");
            ExitCode::FAILURE
        }
    }
}
