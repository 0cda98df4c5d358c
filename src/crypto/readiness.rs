// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! One-time readiness check for the crypto backend.
//!
//! The first caller runs a self-test (system RNG plus a sealed-box round
//! trip). Concurrent first callers block on the same `OnceLock` slot, so the
//! self-test runs exactly once and its result, success or failure, is what
//! every caller sees from then on.

use std::sync::OnceLock;

use crypto_box::SecretKey;
use rand::{rngs::OsRng, RngCore};

use super::{CryptoError, Result};

const SELF_TEST_MESSAGE: &[u8] = b"sealed-request-server readiness probe";

/// Single-flight initialization slot.
#[derive(Debug, Default)]
pub struct ReadinessGuard {
    outcome: OnceLock<Result<()>>,
}

impl ReadinessGuard {
    pub const fn new() -> Self {
        Self {
            outcome: OnceLock::new(),
        }
    }

    /// Run `init` if nobody has yet, otherwise return the recorded outcome.
    pub fn ensure(&self, init: impl FnOnce() -> Result<()>) -> Result<()> {
        self.outcome.get_or_init(init).clone()
    }

    /// Whether initialization has already completed (successfully or not).
    pub fn is_settled(&self) -> bool {
        self.outcome.get().is_some()
    }
}

static READINESS: ReadinessGuard = ReadinessGuard::new();

/// Make sure the crypto backend is usable before the first key operation.
pub fn ensure_initialized() -> Result<()> {
    READINESS.ensure(self_test)
}

fn self_test() -> Result<()> {
    let mut probe = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut probe)
        .map_err(|e| CryptoError::Initialization(format!("system RNG unavailable: {e}")))?;

    let secret = SecretKey::from(probe);
    let sealed = secret
        .public_key()
        .seal(&mut OsRng, SELF_TEST_MESSAGE)
        .map_err(|_| CryptoError::Initialization("sealed box self-test failed".into()))?;
    let opened = secret
        .unseal(&sealed)
        .map_err(|_| CryptoError::Initialization("sealed box self-test failed".into()))?;

    if opened != SELF_TEST_MESSAGE {
        return Err(CryptoError::Initialization(
            "sealed box self-test mismatch".into(),
        ));
    }

    tracing::debug!("Crypto primitives ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn global_guard_succeeds() {
        ensure_initialized().expect("self-test should pass");
        ensure_initialized().expect("second call reuses outcome");
    }

    #[test]
    fn concurrent_callers_initialize_once() {
        let guard = Arc::new(ReadinessGuard::new());
        let runs = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let guard = Arc::clone(&guard);
                let runs = Arc::clone(&runs);
                thread::spawn(move || {
                    guard.ensure(|| {
                        runs.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    })
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap().is_ok());
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(guard.is_settled());
    }

    #[test]
    fn failure_is_seen_by_every_caller() {
        let guard = ReadinessGuard::new();
        let first = guard.ensure(|| Err(CryptoError::Initialization("no rng".into())));
        let second = guard.ensure(|| Ok(()));

        assert_eq!(first, Err(CryptoError::Initialization("no rng".into())));
        assert_eq!(second, first);
    }
}
