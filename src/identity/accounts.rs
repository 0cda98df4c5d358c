// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account lookup used by the real verifier.
//!
//! User accounts live with the (external) authentication layer. The gate
//! only needs the CPF registered to an account.

use std::collections::HashMap;
use std::sync::RwLock;

use super::cpf::{normalize_cpf, validate_cpf};

/// Accounts are compared trimmed and lowercased.
pub fn normalize_account(account: &str) -> String {
    account.trim().to_lowercase()
}

/// Read-only view of the CPF registered to each account.
pub trait AccountDirectory: Send + Sync {
    fn registered_cpf(&self, account: &str) -> Option<String>;
}

/// In-process account directory keyed by lowercase email.
#[derive(Debug, Default)]
pub struct InMemoryAccounts {
    cpfs: RwLock<HashMap<String, String>>,
}

impl InMemoryAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the CPF for an account.
    pub fn insert(&self, account: &str, cpf: &str) {
        let mut cpfs = self.cpfs.write().unwrap_or_else(|e| e.into_inner());
        cpfs.insert(normalize_account(account), normalize_cpf(cpf));
    }

    /// Parse `email=cpf,email=cpf` seed data.
    pub fn from_seed(seed: &str) -> Result<Self, String> {
        let accounts = Self::new();
        for entry in seed.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (account, cpf) = entry
                .split_once('=')
                .ok_or_else(|| format!("account seed entry '{entry}' is not email=cpf"))?;
            if account.trim().is_empty() {
                return Err(format!("account seed entry '{entry}' has no account"));
            }
            if !validate_cpf(cpf) {
                return Err(format!("account seed for '{}' has an invalid CPF", account.trim()));
            }
            accounts.insert(account, cpf);
        }
        Ok(accounts)
    }

    pub fn len(&self) -> usize {
        self.cpfs.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AccountDirectory for InMemoryAccounts {
    fn registered_cpf(&self, account: &str) -> Option<String> {
        let cpfs = self.cpfs.read().unwrap_or_else(|e| e.into_inner());
        cpfs.get(&normalize_account(account)).cloned()
    }
}
