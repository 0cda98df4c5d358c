// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Base64 encoding for keys, nonces and ciphertexts.
//!
//! Output is always standard padded base64. Input may be standard or
//! URL-safe, padded or not, and may contain line breaks from copy/paste:
//! it is normalized to the standard alphabet once and then decoded by a
//! single constant-time decoder.

use base64ct::{Base64, Encoding};

use super::{CryptoError, Result};

/// Encode bytes as standard padded base64.
pub fn encode(bytes: &[u8]) -> String {
    Base64::encode_string(bytes)
}

/// Decode standard or URL-safe base64.
pub fn decode(input: &str) -> Result<Vec<u8>> {
    let normalized = normalize(input);
    if normalized.is_empty() {
        return Err(CryptoError::Decode("empty input".into()));
    }
    Base64::decode_vec(&normalized).map_err(|e| CryptoError::Decode(e.to_string()))
}

/// Decode into a fixed-size array, reporting the actual size on mismatch.
pub fn decode_array<const N: usize>(input: &str) -> Result<[u8; N]> {
    let bytes = decode(input)?;
    <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| CryptoError::InvalidKeyLength {
        expected: N,
        actual: bytes.len(),
    })
}

/// Map the URL-safe alphabet onto the standard one and fix up padding.
fn normalize(input: &str) -> String {
    let mut out: String = input
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    while out.ends_with('=') {
        out.pop();
    }
    let rem = out.len() % 4;
    if rem != 0 {
        out.extend(std::iter::repeat('=').take(4 - rem));
    }
    out
}
