// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Company-side key tool. Runs on the company's machine, never on the server.
//!
//! ```text
//! company-keygen generate <company name> [backup-file]
//! company-keygen registration <backup-file>
//! company-keygen reveal <backup-file> <data-dir>
//! company-keygen seal <public-key> <envelope-file>
//! company-keygen open <backup-file> <sealed-file>
//! ```
//!
//! `generate` writes the key backup (stdout if no file is given) and prints
//! the fingerprint. `registration` prints the JSON body for `POST
//! /v1/company`. `reveal` opens every request stored under a data directory
//! and prints one JSON envelope per line. `seal` and `open` work on single
//! files: base64 ciphertext in, envelope JSON out and back.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

use sealed_request_server::{
    company::{CompanyKeyMaterial, KeyBackup},
    crypto::{decrypt_sealed_box, encrypt_sealed_box},
    pipeline::{reveal_company_requests, RequestEnvelope},
    storage::{FsAdapter, OpaqueStorage, StoragePaths},
};

const USAGE: &str = "usage:
  company-keygen generate <company name> [backup-file]
  company-keygen registration <backup-file>
  company-keygen reveal <backup-file> <data-dir>
  company-keygen seal <public-key> <envelope-file>
  company-keygen open <backup-file> <sealed-file>";

type CliResult<T> = Result<T, String>;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["generate", name] => generate(name, None),
        ["generate", name, out] => generate(name, Some(Path::new(out))),
        ["registration", backup] => registration(Path::new(backup)),
        ["reveal", backup, data_dir] => reveal(Path::new(backup), PathBuf::from(data_dir)).await,
        ["seal", public_key, envelope] => seal_file(public_key, Path::new(envelope)),
        ["open", backup, sealed] => open_file(Path::new(backup), Path::new(sealed)),
        _ => Err(USAGE.to_string()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn generate(name: &str, out: Option<&Path>) -> CliResult<()> {
    if name.trim().is_empty() {
        return Err("company name is required".to_string());
    }
    let material = CompanyKeyMaterial::generate(name).map_err(|e| e.to_string())?;
    let json = material
        .backup()
        .to_json_pretty()
        .map_err(|e| e.to_string())?;

    match out {
        Some(path) => {
            write_new(path, json.as_bytes())?;
            eprintln!("Key backup written to {}", path.display());
        }
        None => println!("{json}"),
    }
    eprintln!("Fingerprint: {}", material.fingerprint());
    Ok(())
}

fn registration(backup: &Path) -> CliResult<()> {
    let backup = load_backup(backup)?;
    backup.secret_key().map_err(|e| e.to_string())?;

    let body = serde_json::json!({
        "name": backup.company_name,
        "publicKey": backup.public_key,
    });
    println!("{body}");
    eprintln!("Fingerprint: {}", backup.fingerprint);
    Ok(())
}

async fn reveal(backup: &Path, data_dir: PathBuf) -> CliResult<()> {
    let backup = load_backup(backup)?;
    if !data_dir.is_dir() {
        return Err(format!("{} is not a directory", data_dir.display()));
    }
    let mut storage = OpaqueStorage::new(StoragePaths::new(data_dir));
    storage.initialize().map_err(|e| e.to_string())?;
    let adapter = FsAdapter::new(storage).map_err(|e| e.to_string())?;

    let report = reveal_company_requests(&adapter, &backup.private_key)
        .await
        .map_err(|e| e.to_string())?;

    for revealed in &report.revealed {
        let line = serde_json::to_string(&revealed.envelope).map_err(|e| e.to_string())?;
        println!("{line}");
    }
    for failure in &report.failures {
        eprintln!("{}: {:?}", failure.request_id, failure.kind);
    }
    eprintln!(
        "Revealed {} request(s), {} failed",
        report.revealed.len(),
        report.failure_count()
    );
    Ok(())
}

fn seal_file(public_key: &str, envelope: &Path) -> CliResult<()> {
    let json = read_text(envelope)?;
    let parsed = RequestEnvelope::from_json(&json).map_err(|e| e.to_string())?;
    let canonical = parsed.to_json().map_err(|e| e.to_string())?;

    let sealed = encrypt_sealed_box(&canonical, public_key).map_err(|e| e.to_string())?;
    println!("{sealed}");
    Ok(())
}

fn open_file(backup: &Path, sealed: &Path) -> CliResult<()> {
    let backup = load_backup(backup)?;
    let ciphertext = read_text(sealed)?;

    let plaintext = Zeroizing::new(
        decrypt_sealed_box(ciphertext.trim(), &backup.public_key, &backup.private_key)
            .map_err(|e| e.to_string())?,
    );
    let envelope = RequestEnvelope::from_json(&plaintext).map_err(|e| e.to_string())?;
    let line = serde_json::to_string(&envelope).map_err(|e| e.to_string())?;
    println!("{line}");
    Ok(())
}

fn read_text(path: &Path) -> CliResult<String> {
    std::fs::read_to_string(path).map_err(|e| format!("cannot read {}: {e}", path.display()))
}

fn load_backup(path: &Path) -> CliResult<KeyBackup> {
    let json = read_text(path)?;
    KeyBackup::from_json(&json).map_err(|e| format!("invalid key backup: {e}"))
}

/// Refuse to overwrite an existing backup.
fn write_new(path: &Path, contents: &[u8]) -> CliResult<()> {
    use std::io::Write;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| format!("cannot create {}: {e}", path.display()))?;
    file.write_all(contents)
        .map_err(|e| format!("cannot write {}: {e}", path.display()))
}
