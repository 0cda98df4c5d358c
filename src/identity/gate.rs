// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity gate in front of request submission.
//!
//! Each attempt moves through
//! `UNVERIFIED -> VERIFYING -> {VERIFIED | FAILED | EXPIRED}`. All three
//! outcomes are terminal for the attempt. A `VERIFIED` attempt can be
//! consumed exactly once, yielding the [`VerifiedIdentity`] the submit path
//! requires; consuming it again fails. [`VerificationGate::verified_identity`]
//! reads the same identity without spending it.
//!
//! Attempts live in an LRU cache bounded by capacity. When the cache is
//! full, verified attempts that are still unspent are evicted last.
//! Expiry is a wall-clock comparison against the time the instructions were
//! issued and only applies when the active verifier enforces a window.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::accounts::normalize_account;
use super::cpf::normalize_cpf;
use super::verifier::{
    generate_identity_verification, IdentityCheck, IdentityVerificationResult, IdentityVerifier,
    VerificationInstructions,
};

/// Default window between issuing instructions and verifying (15 minutes).
pub const DEFAULT_VERIFICATION_WINDOW: Duration = Duration::from_secs(15 * 60);

/// Default maximum number of live attempts.
pub const DEFAULT_GATE_CAPACITY: usize = 10_000;

/// Lifecycle state of a verification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationState {
    Unverified,
    Verifying,
    Verified,
    Failed,
    Expired,
}

impl VerificationState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            VerificationState::Verified | VerificationState::Failed | VerificationState::Expired
        )
    }
}

/// Gate errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    #[error("Unknown verification: {0}")]
    Unknown(String),

    #[error("CPF verification failed")]
    VerificationFailed,

    #[error("Verification window has expired")]
    VerificationExpired,

    #[error("Identity has not been verified yet")]
    NotVerified,

    #[error("Verification was already attempted")]
    AlreadyAttempted,

    #[error("Verification has already been used for a request")]
    AlreadyConsumed,
}

/// Proof that an attempt was verified.
///
/// Only the gate hands these out. The submit path stores a request only
/// with one obtained from [`VerificationGate::consume`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    request_id: String,
    cpf: String,
    account: Option<String>,
    verification_hash: String,
    is_mock: bool,
    verified_at: DateTime<Utc>,
}

impl VerifiedIdentity {
    /// Gate attempt id (the PIX transaction id).
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Normalized CPF digits that passed verification.
    pub fn cpf(&self) -> &str {
        &self.cpf
    }

    /// Normalized account the CPF was checked against, if one was named.
    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    pub fn verification_hash(&self) -> &str {
        &self.verification_hash
    }

    pub fn is_mock(&self) -> bool {
        self.is_mock
    }

    pub fn verified_at(&self) -> DateTime<Utc> {
        self.verified_at
    }
}

struct Attempt {
    state: VerificationState,
    issued_at: DateTime<Utc>,
    identity: Option<VerifiedIdentity>,
    consumed: bool,
}

impl Attempt {
    fn spendable_identity(&self) -> Result<VerifiedIdentity, GateError> {
        match self.state {
            VerificationState::Failed => Err(GateError::VerificationFailed),
            VerificationState::Expired => Err(GateError::VerificationExpired),
            VerificationState::Unverified | VerificationState::Verifying => {
                Err(GateError::NotVerified)
            }
            VerificationState::Verified if self.consumed => Err(GateError::AlreadyConsumed),
            VerificationState::Verified => self.identity.clone().ok_or(GateError::NotVerified),
        }
    }
}

/// Evict one entry from a full cache. Verified, unspent attempts go last;
/// among the rest the least recently used is dropped.
fn make_room(attempts: &mut LruCache<String, Attempt>) {
    let victim = attempts
        .iter()
        .rev()
        .find(|(_, a)| a.state != VerificationState::Verified || a.consumed)
        .map(|(id, _)| id.clone());
    match victim {
        Some(id) => {
            attempts.pop(&id);
        }
        None => {
            attempts.pop_lru();
        }
    }
}

/// Stateful identity gate.
pub struct VerificationGate {
    attempts: Mutex<LruCache<String, Attempt>>,
    verifier: Arc<dyn IdentityVerifier>,
    window: chrono::Duration,
}

impl VerificationGate {
    pub fn new(verifier: Arc<dyn IdentityVerifier>, window: Duration, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            attempts: Mutex::new(LruCache::new(capacity)),
            verifier,
            window: chrono::Duration::from_std(window).unwrap_or(chrono::Duration::MAX),
        }
    }

    pub fn verifier(&self) -> &dyn IdentityVerifier {
        self.verifier.as_ref()
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, Attempt>> {
        self.attempts.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn window_elapsed(&self, issued_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.verifier.enforces_window() && now - issued_at > self.window
    }

    /// Start a new attempt and return the instructions to show.
    pub fn issue(&self, request_id: &str) -> VerificationInstructions {
        self.issue_at(request_id, Utc::now())
    }

    pub fn issue_at(&self, request_id: &str, now: DateTime<Utc>) -> VerificationInstructions {
        let mut attempts = self.lock();
        if attempts.len() == attempts.cap().get() && !attempts.contains(request_id) {
            make_room(&mut attempts);
        }
        attempts.put(
            request_id.to_string(),
            Attempt {
                state: VerificationState::Unverified,
                issued_at: now,
                identity: None,
                consumed: false,
            },
        );
        drop(attempts);
        tracing::debug!(request_id = %request_id, "Identity verification issued");
        generate_identity_verification(request_id)
    }

    /// Submit a CPF for an issued attempt.
    ///
    /// A rejected CPF is not an error: the attempt moves to `FAILED` and the
    /// failure result is returned for display. Errors cover unknown,
    /// already-attempted and expired attempts.
    pub fn verify(
        &self,
        request_id: &str,
        cpf: &str,
        account_cpf: Option<&str>,
    ) -> Result<IdentityVerificationResult, GateError> {
        self.verify_at(request_id, cpf, account_cpf, Utc::now())
    }

    pub fn verify_at(
        &self,
        request_id: &str,
        cpf: &str,
        account_cpf: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<IdentityVerificationResult, GateError> {
        self.verify_account_at(request_id, cpf, None, account_cpf, now)
    }

    /// Verify and bind the attempt to the account whose CPF was checked.
    ///
    /// A request submitted with the resulting identity must name the same
    /// account.
    pub fn verify_account(
        &self,
        request_id: &str,
        cpf: &str,
        account: &str,
        account_cpf: Option<&str>,
    ) -> Result<IdentityVerificationResult, GateError> {
        self.verify_account_at(request_id, cpf, Some(account), account_cpf, Utc::now())
    }

    pub fn verify_account_at(
        &self,
        request_id: &str,
        cpf: &str,
        account: Option<&str>,
        account_cpf: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<IdentityVerificationResult, GateError> {
        let mut attempts = self.lock();
        let attempt = attempts
            .get_mut(request_id)
            .ok_or_else(|| GateError::Unknown(request_id.to_string()))?;

        if attempt.state != VerificationState::Unverified {
            return Err(GateError::AlreadyAttempted);
        }
        attempt.state = VerificationState::Verifying;

        if self.window_elapsed(attempt.issued_at, now) {
            attempt.state = VerificationState::Expired;
            tracing::info!(request_id = %request_id, "Identity verification expired");
            return Err(GateError::VerificationExpired);
        }

        let check = IdentityCheck {
            request_id,
            cpf,
            account_cpf,
        };
        let result = self.verifier.verify(&check, now);

        match (&result.success, &result.verification_hash) {
            (true, Some(hash)) => {
                attempt.state = VerificationState::Verified;
                attempt.identity = Some(VerifiedIdentity {
                    request_id: request_id.to_string(),
                    cpf: normalize_cpf(cpf),
                    account: account.map(normalize_account),
                    verification_hash: hash.clone(),
                    is_mock: result.is_mock.unwrap_or(false),
                    verified_at: now,
                });
                tracing::info!(
                    request_id = %request_id,
                    mode = ?self.verifier.mode(),
                    "Identity verified"
                );
            }
            _ => {
                attempt.state = VerificationState::Failed;
                tracing::info!(request_id = %request_id, "Identity verification failed");
            }
        }

        Ok(result)
    }

    /// Current state of an attempt, if it is still tracked.
    pub fn state(&self, request_id: &str) -> Option<VerificationState> {
        self.state_at(request_id, Utc::now())
    }

    pub fn state_at(&self, request_id: &str, now: DateTime<Utc>) -> Option<VerificationState> {
        let attempts = self.lock();
        let attempt = attempts.peek(request_id)?;
        if attempt.state == VerificationState::Unverified
            && self.window_elapsed(attempt.issued_at, now)
        {
            return Some(VerificationState::Expired);
        }
        Some(attempt.state)
    }

    /// Whether an attempt is still inside its verification window.
    pub fn within_window(&self, request_id: &str, now: DateTime<Utc>) -> bool {
        self.lock()
            .peek(request_id)
            .is_some_and(|a| !self.window_elapsed(a.issued_at, now))
    }

    /// Identity of a verified, unspent attempt. Does not consume it.
    pub fn verified_identity(&self, request_id: &str) -> Result<VerifiedIdentity, GateError> {
        let attempts = self.lock();
        let attempt = attempts
            .peek(request_id)
            .ok_or_else(|| GateError::Unknown(request_id.to_string()))?;
        attempt.spendable_identity()
    }

    /// Spend a verified attempt. Succeeds at most once per attempt.
    pub fn consume(&self, request_id: &str) -> Result<VerifiedIdentity, GateError> {
        let mut attempts = self.lock();
        let attempt = attempts
            .get_mut(request_id)
            .ok_or_else(|| GateError::Unknown(request_id.to_string()))?;

        let identity = attempt.spendable_identity()?;
        attempt.consumed = true;
        Ok(identity)
    }

    /// Drop consumed attempts and attempts older than twice the window.
    ///
    /// Returns how many entries were removed.
    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        let retention = self
            .window
            .checked_add(&self.window)
            .unwrap_or(chrono::Duration::MAX);
        let mut attempts = self.lock();
        let stale: Vec<String> = attempts
            .iter()
            .filter(|(_, a)| a.consumed || now - a.issued_at > retention)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &stale {
            attempts.pop(id);
        }
        stale.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::verifier::{MockVerifier, RealVerifier};

    fn mock_gate() -> VerificationGate {
        VerificationGate::new(Arc::new(MockVerifier), DEFAULT_VERIFICATION_WINDOW, 16)
    }

    fn real_gate() -> VerificationGate {
        VerificationGate::new(Arc::new(RealVerifier), DEFAULT_VERIFICATION_WINDOW, 16)
    }

    #[test]
    fn verified_attempt_is_single_use() {
        let gate = mock_gate();
        gate.issue("tx-1");
        assert_eq!(gate.state("tx-1"), Some(VerificationState::Unverified));

        let result = gate.verify("tx-1", "123.456.789-00", None).unwrap();
        assert!(result.success);
        assert_eq!(gate.state("tx-1"), Some(VerificationState::Verified));

        let identity = gate.consume("tx-1").unwrap();
        assert_eq!(identity.request_id(), "tx-1");
        assert_eq!(identity.cpf(), "12345678900");
        assert!(identity.is_mock());
        assert_eq!(
            Some(identity.verification_hash()),
            result.verification_hash.as_deref()
        );

        assert_eq!(gate.consume("tx-1"), Err(GateError::AlreadyConsumed));
    }

    #[test]
    fn rejected_cpf_fails_attempt() {
        let gate = mock_gate();
        gate.issue("tx-2");

        let result = gate.verify("tx-2", "000.000.000-00", None).unwrap();
        assert!(!result.success);
        assert_eq!(gate.state("tx-2"), Some(VerificationState::Failed));
        assert_eq!(gate.consume("tx-2"), Err(GateError::VerificationFailed));

        // terminal: a second CPF cannot be tried on the same attempt
        assert_eq!(
            gate.verify("tx-2", "123.456.789-00", None),
            Err(GateError::AlreadyAttempted)
        );
    }

    #[test]
    fn unknown_and_unverified_attempts_cannot_be_consumed() {
        let gate = mock_gate();
        assert_eq!(
            gate.consume("nope"),
            Err(GateError::Unknown("nope".to_string()))
        );

        gate.issue("tx-3");
        assert_eq!(gate.consume("tx-3"), Err(GateError::NotVerified));
    }

    #[test]
    fn real_mode_expires_after_window() {
        let gate = real_gate();
        let issued = Utc::now();
        gate.issue_at("tx-4", issued);

        let late = issued + chrono::Duration::minutes(16);
        assert_eq!(gate.state_at("tx-4", late), Some(VerificationState::Expired));
        assert!(!gate.within_window("tx-4", late));

        let result = gate.verify_at("tx-4", "529.982.247-25", Some("52998224725"), late);
        assert_eq!(result, Err(GateError::VerificationExpired));
        assert_eq!(gate.consume("tx-4"), Err(GateError::VerificationExpired));
    }

    #[test]
    fn real_mode_succeeds_inside_window() {
        let gate = real_gate();
        let issued = Utc::now();
        gate.issue_at("tx-5", issued);

        let soon = issued + chrono::Duration::minutes(14);
        let result = gate
            .verify_at("tx-5", "529.982.247-25", Some("529.982.247-25"), soon)
            .unwrap();
        assert!(result.success);
        assert!(!gate.consume("tx-5").unwrap().is_mock());
    }

    #[test]
    fn mock_mode_never_expires() {
        let gate = mock_gate();
        let issued = Utc::now();
        gate.issue_at("tx-6", issued);

        let much_later = issued + chrono::Duration::hours(3);
        assert!(gate.within_window("tx-6", much_later));
        assert!(gate
            .verify_at("tx-6", "123.456.789-00", None, much_later)
            .unwrap()
            .success);
    }

    #[test]
    fn prune_drops_consumed_and_stale() {
        let gate = mock_gate();
        let now = Utc::now();

        gate.issue_at("consumed", now);
        gate.verify_at("consumed", "123.456.789-00", None, now).unwrap();
        gate.consume("consumed").unwrap();

        gate.issue_at("stale", now - chrono::Duration::hours(1));
        gate.issue_at("fresh", now);

        assert_eq!(gate.prune(now), 2);
        assert_eq!(gate.len(), 1);
        assert_eq!(gate.state("fresh"), Some(VerificationState::Unverified));
    }

    #[test]
    fn verified_identity_does_not_spend_attempt() {
        let gate = mock_gate();
        gate.issue("tx-7");
        assert_eq!(gate.verified_identity("tx-7"), Err(GateError::NotVerified));

        gate.verify("tx-7", "123.456.789-00", None).unwrap();
        let peeked = gate.verified_identity("tx-7").unwrap();
        assert_eq!(gate.verified_identity("tx-7"), Ok(peeked.clone()));

        assert_eq!(gate.consume("tx-7"), Ok(peeked));
        assert_eq!(
            gate.verified_identity("tx-7"),
            Err(GateError::AlreadyConsumed)
        );
    }

    #[test]
    fn account_is_bound_to_identity() {
        let gate = real_gate();
        gate.issue("tx-8");
        gate.verify_account(
            "tx-8",
            "529.982.247-25",
            " Ana@Example.com ",
            Some("52998224725"),
        )
        .unwrap();

        let identity = gate.consume("tx-8").unwrap();
        assert_eq!(identity.account(), Some("ana@example.com"));

        gate.issue("tx-9");
        gate.verify("tx-9", "123.456.789-00", None).unwrap();
        assert_eq!(gate.consume("tx-9").unwrap().account(), None);
    }

    #[test]
    fn full_cache_evicts_unverified_before_verified() {
        let gate = VerificationGate::new(Arc::new(MockVerifier), DEFAULT_VERIFICATION_WINDOW, 2);
        gate.issue("paid");
        gate.verify("paid", "123.456.789-00", None).unwrap();

        for i in 0..5 {
            gate.issue(&format!("spam-{i}"));
        }

        assert_eq!(gate.len(), 2);
        assert_eq!(gate.state("paid"), Some(VerificationState::Verified));
        assert_eq!(gate.state("spam-4"), Some(VerificationState::Unverified));
        assert!(gate.consume("paid").is_ok());
    }

    #[test]
    fn capacity_evicts_oldest_attempt() {
        let gate = VerificationGate::new(Arc::new(MockVerifier), DEFAULT_VERIFICATION_WINDOW, 2);
        gate.issue("a");
        gate.issue("b");
        gate.issue("c");

        assert_eq!(gate.len(), 2);
        assert!(gate.state("a").is_none());
    }
}
