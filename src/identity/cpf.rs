// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! CPF (Brazilian taxpayer id) format checks and hashing.
//!
//! Validation proves a CPF is well-formed, not that it belongs to anyone.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::crypto::codec;

/// Number of digits in a CPF.
pub const CPF_DIGITS: usize = 11;

/// Sandbox test CPF used by the mock payment flow and its documentation.
///
/// Its check digits do not satisfy the modulo-11 rule, so it is accepted
/// explicitly.
pub const SANDBOX_TEST_CPF: &str = "12345678900";

/// Strip everything but ASCII digits.
pub fn normalize_cpf(input: &str) -> String {
    input.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Check CPF length, repeated digits and both modulo-11 check digits.
pub fn validate_cpf(input: &str) -> bool {
    let normalized = normalize_cpf(input);
    if normalized.len() != CPF_DIGITS {
        return false;
    }
    if normalized == SANDBOX_TEST_CPF {
        return true;
    }

    let digits: Vec<u32> = normalized.bytes().map(|b| u32::from(b - b'0')).collect();
    if digits.iter().all(|d| *d == digits[0]) {
        return false;
    }

    check_digit(&digits[..9]) == digits[9] && check_digit(&digits[..10]) == digits[10]
}

/// Weighted modulo-11 check digit over `digits` (weights n+1 down to 2).
fn check_digit(digits: &[u32]) -> u32 {
    let top = digits.len() as u32 + 1;
    let sum: u32 = digits
        .iter()
        .zip((2..=top).rev())
        .map(|(d, w)| d * w)
        .sum();
    match sum % 11 {
        0 | 1 => 0,
        rem => 11 - rem,
    }
}

/// Mask a CPF for logs and UI: `***.456.789-**`.
pub fn mask_cpf(input: &str) -> String {
    let normalized = normalize_cpf(input);
    if normalized.len() != CPF_DIGITS {
        return "***".to_string();
    }
    format!("***.{}.{}-**", &normalized[3..6], &normalized[6..9])
}

/// Keyed hash of a CPF for storage next to ciphertext metadata.
///
/// The raw CPF only ever exists inside the sealed envelope. The key keeps
/// the 10^9-sized CPF space from being brute-forced out of a leaked hash.
#[derive(Clone)]
pub struct CpfHasher {
    key: Vec<u8>,
}

impl CpfHasher {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into() }
    }

    /// Base64 HMAC-SHA256 over the normalized digits.
    pub fn hash(&self, cpf: &str) -> String {
        let mut mac = match Hmac::<Sha256>::new_from_slice(&self.key) {
            Ok(mac) => mac,
            Err(_) => unreachable!("HMAC accepts keys of any length"),
        };
        mac.update(normalize_cpf(cpf).as_bytes());
        codec::encode(&mac.finalize().into_bytes())
    }
}

impl std::fmt::Debug for CpfHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CpfHasher([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_documented_and_checksum_valid_cpfs() {
        assert!(validate_cpf("123.456.789-00"));
        assert!(validate_cpf("12345678900"));
        assert!(validate_cpf("529.982.247-25"));
        assert!(validate_cpf("123.456.789-09"));
    }

    #[test]
    fn rejects_malformed_cpfs() {
        assert!(!validate_cpf("000.000.000-00"));
        assert!(!validate_cpf("111.111.111-11"));
        assert!(!validate_cpf("123.456.789"));
        assert!(!validate_cpf(""));
        assert!(!validate_cpf("529.982.247-26"));
        assert!(!validate_cpf("529.982.247-255"));
    }

    #[test]
    fn check_digits_match_reference_values() {
        // 529.982.247-25
        assert_eq!(check_digit(&[5, 2, 9, 9, 8, 2, 2, 4, 7]), 2);
        assert_eq!(check_digit(&[5, 2, 9, 9, 8, 2, 2, 4, 7, 2]), 5);
    }

    #[test]
    fn normalize_and_mask() {
        assert_eq!(normalize_cpf(" 529.982.247-25 "), "52998224725");
        assert_eq!(mask_cpf("529.982.247-25"), "***.982.247-**");
        assert_eq!(mask_cpf("12"), "***");
    }

    #[test]
    fn hash_ignores_formatting_and_depends_on_key() {
        let hasher = CpfHasher::new(b"k1".to_vec());
        assert_eq!(hasher.hash("529.982.247-25"), hasher.hash("52998224725"));
        assert_ne!(hasher.hash("529.982.247-25"), hasher.hash("123.456.789-09"));

        let other = CpfHasher::new(b"k2".to_vec());
        assert_ne!(hasher.hash("529.982.247-25"), other.hash("529.982.247-25"));
        assert!(!hasher.hash("529.982.247-25").contains("52998224725"));
    }
}
