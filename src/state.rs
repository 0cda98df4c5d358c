// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use thiserror::Error;

use crate::config::AppConfig;
use crate::identity::{
    verifier_for, AccountDirectory, CpfHasher, InMemoryAccounts, PixMockGateway,
    VerificationGate, VerifierMode, DEFAULT_GATE_CAPACITY, DEFAULT_VERIFICATION_WINDOW,
};
use crate::storage::{
    FsAdapter, InMemoryStore, OpaqueStorage, StorageAdapter, StorageError, StoragePaths,
};

#[derive(Debug, Error)]
pub enum StateError {
    #[error("storage setup failed: {0}")]
    Storage(#[from] StorageError),

    #[error("invalid account seed: {0}")]
    Accounts(String),
}

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn StorageAdapter>,
    /// Audit log root; only present with on-disk storage.
    pub audit: Option<Arc<OpaqueStorage>>,
    pub gate: Arc<VerificationGate>,
    pub pix: Arc<PixMockGateway>,
    pub accounts: Arc<dyn AccountDirectory>,
    pub cpf_hasher: Arc<CpfHasher>,
}

impl AppState {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        gate: VerificationGate,
        accounts: Arc<dyn AccountDirectory>,
        cpf_hasher: CpfHasher,
    ) -> Self {
        Self {
            storage,
            audit: None,
            gate: Arc::new(gate),
            pix: Arc::new(PixMockGateway::default()),
            accounts,
            cpf_hasher: Arc::new(cpf_hasher),
        }
    }

    pub fn with_audit(mut self, storage: OpaqueStorage) -> Self {
        self.audit = Some(Arc::new(storage));
        self
    }

    /// Everything in memory, with the given verifier.
    pub fn in_memory(mode: VerifierMode, accounts: InMemoryAccounts) -> Self {
        Self::new(
            Arc::new(InMemoryStore::new()),
            VerificationGate::new(
                verifier_for(mode),
                DEFAULT_VERIFICATION_WINDOW,
                DEFAULT_GATE_CAPACITY,
            ),
            Arc::new(accounts),
            CpfHasher::new(b"in-memory".to_vec()),
        )
    }

    /// Wire up state from configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, StateError> {
        let accounts = match &config.seed_accounts {
            Some(seed) => InMemoryAccounts::from_seed(seed).map_err(StateError::Accounts)?,
            None => InMemoryAccounts::new(),
        };

        let gate = VerificationGate::new(
            verifier_for(config.verifier_mode),
            config.verification_window,
            config.verification_capacity,
        );
        let hasher = CpfHasher::new(config.cpf_hash_key.clone());

        let Some(data_dir) = &config.data_dir else {
            return Ok(Self::new(
                Arc::new(InMemoryStore::new()),
                gate,
                Arc::new(accounts),
                hasher,
            ));
        };

        let mut storage = OpaqueStorage::new(StoragePaths::new(data_dir));
        storage.initialize()?;
        let adapter = FsAdapter::new(storage.clone())?;

        Ok(Self::new(Arc::new(adapter), gate, Arc::new(accounts), hasher).with_audit(storage))
    }

    pub fn audit_storage(&self) -> Option<&OpaqueStorage> {
        self.audit.as_deref()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::in_memory(VerifierMode::Mock, InMemoryAccounts::new())
    }
}
