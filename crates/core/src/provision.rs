//! Credential provisioning: turn broker environment variables into the
//! JSON secret files the dashboard reads at startup.
//!
//! The core logic is pure over a supplied key→value map, so tests never
//! touch the real process environment; the `create-secrets` binary feeds
//! it `std::env::vars()`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::broker::credentials::BrokerCredentials;
use crate::errors::CoreError;

const ID_VAR: &str = "HTS_ID";
const ACCOUNT_PREFIX: &str = "REAL";
const SUFFIXES: [&str; 3] = ["_APP_KEY", "_APP_SECRET", "_ACC_NO"];

/// One account's worth of resolved credentials plus its target filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedAccount {
    /// `secret.json` for the legacy unnumbered account, `secret{n}.json`
    /// for numbered ones.
    pub file_name: String,
    pub credentials: BrokerCredentials,
}

/// Numbered account indices present in the environment, sorted.
///
/// An index counts as present if *any* of its three variables exists —
/// validation later reports whichever of the triple are missing, which
/// gives a much better error than silently skipping a half-set account.
pub fn account_indices(env: &HashMap<String, String>) -> Vec<u32> {
    let mut indices: Vec<u32> = env
        .keys()
        .filter_map(|key| {
            let rest = key.strip_prefix(ACCOUNT_PREFIX)?;
            let middle = SUFFIXES
                .iter()
                .find_map(|suffix| rest.strip_suffix(suffix))?;
            middle.parse().ok()
        })
        .collect();
    indices.sort_unstable();
    indices.dedup();
    indices
}

/// Resolve every account described by the environment.
///
/// Numbered accounts (`REAL{n}_APP_KEY` / `_APP_SECRET` / `_ACC_NO`) win
/// when present; otherwise the legacy unnumbered triple (`REAL_APP_KEY`
/// etc.) describes a single account. All-or-nothing: any missing or
/// empty variable fails the whole run, and the error names every missing
/// variable grouped per account rather than just the first.
pub fn collect_accounts(
    env: &HashMap<String, String>,
) -> Result<Vec<ProvisionedAccount>, CoreError> {
    let hts_id = required(env, ID_VAR).map_err(|_| {
        CoreError::MissingEnvVar(format!("{ID_VAR} is not set (broker HTS login id)"))
    })?;

    let indices = account_indices(env);
    let mut missing: Vec<String> = Vec::new();
    let mut accounts = Vec::new();

    if indices.is_empty() {
        match resolve_account(env, "", &hts_id) {
            Ok(credentials) => accounts.push(ProvisionedAccount {
                file_name: "secret.json".to_string(),
                credentials,
            }),
            Err(names) => missing.push(format!("account: {}", names.join(", "))),
        }
    } else {
        for index in &indices {
            match resolve_account(env, &index.to_string(), &hts_id) {
                Ok(credentials) => accounts.push(ProvisionedAccount {
                    file_name: format!("secret{index}.json"),
                    credentials,
                }),
                Err(names) => missing.push(format!("account {index}: {}", names.join(", "))),
            }
        }
    }

    if !missing.is_empty() {
        return Err(CoreError::MissingEnvVar(missing.join("; ")));
    }
    Ok(accounts)
}

/// Resolve accounts from the environment and write one secret file per
/// account into `out_dir`. Returns the written paths.
pub fn provision(
    env: &HashMap<String, String>,
    out_dir: &Path,
) -> Result<Vec<PathBuf>, CoreError> {
    let accounts = collect_accounts(env)?;

    let mut written = Vec::with_capacity(accounts.len());
    for account in &accounts {
        let path = out_dir.join(&account.file_name);
        account.credentials.save(&path)?;
        info!(
            file = %path.display(),
            account = %account.credentials.account_number,
            "Wrote credential file"
        );
        written.push(path);
    }
    Ok(written)
}

/// Resolve one account's triple; `index` is "" for the legacy account.
/// Returns the list of missing variable names on failure.
fn resolve_account(
    env: &HashMap<String, String>,
    index: &str,
    hts_id: &str,
) -> Result<BrokerCredentials, Vec<String>> {
    let key_var = format!("{ACCOUNT_PREFIX}{index}_APP_KEY");
    let secret_var = format!("{ACCOUNT_PREFIX}{index}_APP_SECRET");
    let account_var = format!("{ACCOUNT_PREFIX}{index}_ACC_NO");

    let mut missing = Vec::new();
    let app_key = required(env, &key_var).unwrap_or_else(|name| {
        missing.push(name);
        String::new()
    });
    let app_secret = required(env, &secret_var).unwrap_or_else(|name| {
        missing.push(name);
        String::new()
    });
    let account_number = required(env, &account_var).unwrap_or_else(|name| {
        missing.push(name);
        String::new()
    });

    if !missing.is_empty() {
        return Err(missing);
    }
    Ok(BrokerCredentials {
        id: hts_id.to_string(),
        app_key,
        app_secret,
        account_number,
        virtual_account: false,
    })
}

/// Present-and-non-empty lookup; an empty value is as bad as an absent
/// one for credentials.
fn required(env: &HashMap<String, String>, name: &str) -> Result<String, String> {
    match env.get(name) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(name.to_string()),
    }
}
