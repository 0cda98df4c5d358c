// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Filesystem operations for opaque request storage.
//!
//! ## Security Note
//!
//! Nothing written here is readable by the server in a useful way:
//! ciphertexts are sealed to the company key before they arrive, and
//! metadata carries only hashes and identifiers.
//!
//! **DO NOT**:
//! - Write plaintext request bodies or raw CPFs through this module
//! - Store a company private key under the data root
//!
//! All writes go through a temp file and a rename so a crash never leaves
//! a half-written record behind.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};

use super::StoragePaths;

/// Error type for storage operations.
#[derive(Debug)]
pub enum StorageError {
    /// I/O error during file operations
    Io(io::Error),
    /// JSON serialization/deserialization error
    Json(serde_json::Error),
    /// Entity not found
    NotFound(String),
    /// Entity already exists
    AlreadyExists(String),
    /// Storage not initialized
    NotInitialized,
    /// Integrity violation (file tampered or corrupted)
    IntegrityViolation(String),
    /// Caller supplied data the store refuses to keep
    InvalidInput(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(e) => write!(f, "I/O error: {e}"),
            StorageError::Json(e) => write!(f, "JSON error: {e}"),
            StorageError::NotFound(entity) => write!(f, "Not found: {entity}"),
            StorageError::AlreadyExists(entity) => write!(f, "Already exists: {entity}"),
            StorageError::NotInitialized => write!(f, "Storage not initialized"),
            StorageError::IntegrityViolation(msg) => write!(f, "Integrity violation: {msg}"),
            StorageError::InvalidInput(msg) => write!(f, "Invalid input: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(e) => Some(e),
            StorageError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for StorageError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => StorageError::NotFound(e.to_string()),
            io::ErrorKind::AlreadyExists => StorageError::AlreadyExists(e.to_string()),
            _ => StorageError::Io(e),
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Json(e)
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Filesystem store for opaque blobs and their JSON metadata.
#[derive(Debug, Clone)]
pub struct OpaqueStorage {
    paths: StoragePaths,
    initialized: bool,
}

impl OpaqueStorage {
    /// Wrap a data root. Call [`initialize`](Self::initialize) before use.
    pub fn new(paths: StoragePaths) -> Self {
        Self {
            paths,
            initialized: false,
        }
    }

    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Create the directory layout under the data root. Idempotent.
    pub fn initialize(&mut self) -> StorageResult<()> {
        for dir in [
            self.paths.companies_dir(),
            self.paths.requests_dir(),
            self.paths.ciphertexts_dir(),
            self.paths.audit_dir(),
        ] {
            fs::create_dir_all(&dir)?;
        }

        self.initialized = true;
        tracing::debug!(root = %self.paths.root().display(), "Opaque storage ready");
        Ok(())
    }

    fn ready(&self) -> StorageResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(StorageError::NotInitialized)
        }
    }

    /// Check readiness and make sure `path`'s directory exists.
    fn prepare(&self, path: &Path) -> StorageResult<()> {
        self.ready()?;
        match path.parent() {
            Some(parent) => fs::create_dir_all(parent).map_err(Into::into),
            None => Ok(()),
        }
    }

    /// Round-trip a probe blob through the data root.
    pub fn health_check(&self) -> StorageResult<()> {
        self.ready()?;

        let probe = self
            .paths
            .root()
            .join(format!(".probe-{}", uuid::Uuid::new_v4()));
        let expected = probe.to_string_lossy().into_owned().into_bytes();

        fs::write(&probe, &expected)?;
        let read_back = fs::read(&probe);
        let _ = fs::remove_file(&probe);

        if read_back? != expected {
            return Err(StorageError::IntegrityViolation(
                "data root returned different bytes than written".to_string(),
            ));
        }
        Ok(())
    }

    // ========== JSON Metadata ==========

    pub fn read_json<T: DeserializeOwned>(&self, path: impl AsRef<Path>) -> StorageResult<T> {
        self.ready()?;
        let reader = BufReader::new(File::open(path.as_ref())?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Replace a JSON record atomically (temp file, then rename).
    pub fn write_json<T: Serialize>(&self, path: impl AsRef<Path>, value: &T) -> StorageResult<()> {
        let path = path.as_ref();
        self.prepare(path)?;

        let staged = path.with_extension("tmp");
        let mut writer = BufWriter::new(File::create(&staged)?);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush()?;
        drop(writer);

        fs::rename(&staged, path)?;
        Ok(())
    }

    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        path.as_ref().is_file()
    }

    /// Stems of the files in `dir` ending in `.{extension}`.
    pub fn list_files(&self, dir: impl AsRef<Path>, extension: &str) -> StorageResult<Vec<String>> {
        self.ready()?;

        let entries = match fs::read_dir(dir.as_ref()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut stems = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if !path.is_file() || path.extension().is_none_or(|ext| ext != extension) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                stems.push(stem.to_string());
            }
        }
        Ok(stems)
    }

    // ========== Sealed Blobs ==========

    /// Write a blob exactly once.
    ///
    /// Fails with `AlreadyExists` if the target is already present, so a
    /// stored ciphertext can never be replaced.
    pub fn write_raw_once(&self, path: impl AsRef<Path>, data: &[u8]) -> StorageResult<()> {
        let path = path.as_ref();
        self.prepare(path)?;

        let staged = path.with_extension("partial");
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&staged)?;
        file.write_all(data)?;
        file.sync_all()?;
        drop(file);

        // hard_link fails if the destination exists; rename would overwrite
        let linked = fs::hard_link(&staged, path);
        let _ = fs::remove_file(&staged);
        match linked {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(StorageError::AlreadyExists(path.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Append to a log file, creating it if needed.
    pub fn append_raw(&self, path: impl AsRef<Path>, data: &[u8]) -> StorageResult<()> {
        let path = path.as_ref();
        self.prepare(path)?;

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(data)?;
        Ok(())
    }

    pub fn read_raw(&self, path: impl AsRef<Path>) -> StorageResult<Vec<u8>> {
        self.ready()?;
        Ok(fs::read(path.as_ref())?)
    }
}
