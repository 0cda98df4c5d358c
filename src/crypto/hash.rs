// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Digests and key fingerprints.
//!
//! Digests are BLAKE2b-256, the same function as libsodium's default
//! `crypto_generichash`.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};

use super::codec;

/// Number of characters shown in a key fingerprint.
pub const FINGERPRINT_LEN: usize = 8;

type Blake2b256 = Blake2b<U32>;

/// 32-byte BLAKE2b digest of raw bytes.
pub fn hash_bytes(data: &[u8]) -> [u8; 32] {
    Blake2b256::digest(data).into()
}

/// Deterministic base64 digest of a string.
pub fn hash_data(data: &str) -> String {
    codec::encode(&hash_bytes(data.as_bytes()))
}

/// First eight characters of a base64 public key, uppercased.
///
/// For out-of-band visual comparison only. Never use it to decide whether a
/// key is trusted.
pub fn key_fingerprint(public_key: &str) -> String {
    public_key
        .chars()
        .take(FINGERPRINT_LEN)
        .collect::<String>()
        .to_uppercase()
}
