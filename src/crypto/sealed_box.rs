// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Anonymous sealed-box encryption (`crypto_box_seal`).
//!
//! Each seal generates a fresh ephemeral key pair, so the same plaintext
//! sealed twice yields two different ciphertexts. The output is
//! `ephemeral_pk (32) || box (plaintext + 16-byte MAC)`; the nonce is derived
//! from the two public keys and is never transmitted.

use rand::rngs::OsRng;

use super::{
    codec, ensure_initialized,
    keys::{PublicKeyBytes, SecretKeyBytes, SecretKeyInput},
    CryptoError, Result,
};

/// Bytes added to the plaintext by a seal (ephemeral public key + MAC).
pub const SEAL_OVERHEAD: usize = 48;

/// Seal raw bytes to a recipient public key.
pub fn seal(plaintext: &[u8], recipient: &PublicKeyBytes) -> Result<Vec<u8>> {
    ensure_initialized()?;
    recipient
        .to_box_key()
        .seal(&mut OsRng, plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)
}

/// Open a sealed box.
///
/// The recipient public key must be the pair of `recipient_secret`; a
/// mismatch is reported exactly like a MAC failure.
pub fn open(
    ciphertext: &[u8],
    recipient_public: &PublicKeyBytes,
    recipient_secret: &SecretKeyBytes,
) -> Result<Vec<u8>> {
    ensure_initialized()?;
    open_with(ciphertext, recipient_public, SecretKeyInput::Parsed(recipient_secret))
}

fn open_with(
    ciphertext: &[u8],
    recipient_public: &PublicKeyBytes,
    recipient_secret: SecretKeyInput<'_>,
) -> Result<Vec<u8>> {
    let secret = recipient_secret.to_box_key()?;
    if secret.public_key().as_bytes() != recipient_public.as_bytes() {
        return Err(CryptoError::DecryptionFailed);
    }
    if ciphertext.len() < SEAL_OVERHEAD {
        return Err(CryptoError::DecryptionFailed);
    }
    secret
        .unseal(ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)
}

/// Seal a UTF-8 string to a base64 public key, returning base64 ciphertext.
pub fn encrypt_sealed_box(plaintext: &str, recipient_public_key: &str) -> Result<String> {
    let recipient = PublicKeyBytes::from_base64(recipient_public_key)?;
    let sealed = seal(plaintext.as_bytes(), &recipient)?;
    Ok(codec::encode(&sealed))
}

/// Open a base64 sealed box back into its UTF-8 plaintext.
///
/// The secret key may be given as base64 text or as raw bytes.
pub fn decrypt_sealed_box<'a>(
    ciphertext: &str,
    recipient_public_key: &str,
    recipient_secret_key: impl Into<SecretKeyInput<'a>>,
) -> Result<String> {
    ensure_initialized()?;
    let recipient = PublicKeyBytes::from_base64(recipient_public_key)?;
    let sealed = codec::decode(ciphertext)?;
    let opened = open_with(&sealed, &recipient, recipient_secret_key.into())?;
    String::from_utf8(opened).map_err(|_| CryptoError::InvalidPlaintext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::generate_key_pair;

    #[test]
    fn round_trip_including_empty() {
        let pair = generate_key_pair().unwrap();
        let public = pair.public_key_base64();
        let secret = pair.secret_key_base64();

        for plaintext in ["", "hello", "{\"type\":\"DATA_ACCESS\"}", "ação ✓"] {
            let sealed = encrypt_sealed_box(plaintext, &public).unwrap();
            let opened = decrypt_sealed_box(&sealed, &public, &secret).unwrap();
            assert_eq!(opened, plaintext);
        }
    }

    #[test]
    fn accepts_raw_secret_bytes() {
        let pair = generate_key_pair().unwrap();
        let public = pair.public_key_base64();
        let raw = codec::decode(&pair.secret_key_base64()).unwrap();

        let sealed = encrypt_sealed_box("raw key", &public).unwrap();
        let opened = decrypt_sealed_box(&sealed, &public, raw.as_slice()).unwrap();
        assert_eq!(opened, "raw key");
    }

    #[test]
    fn ciphertext_has_fixed_overhead() {
        let pair = generate_key_pair().unwrap();
        let sealed = seal(b"twelve bytes", &pair.public_key).unwrap();
        assert_eq!(sealed.len(), 12 + SEAL_OVERHEAD);

        let empty = seal(b"", &pair.public_key).unwrap();
        assert_eq!(empty.len(), SEAL_OVERHEAD);
        assert_eq!(open(&empty, &pair.public_key, &pair.secret_key).unwrap(), b"");
    }

    #[test]
    fn sealing_is_not_deterministic() {
        let pair = generate_key_pair().unwrap();
        let public = pair.public_key_base64();
        let a = encrypt_sealed_box("same", &public).unwrap();
        let b = encrypt_sealed_box("same", &public).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let k1 = generate_key_pair().unwrap();
        let k2 = generate_key_pair().unwrap();

        let sealed = encrypt_sealed_box("secret", &k1.public_key_base64()).unwrap();
        let err = decrypt_sealed_box(&sealed, &k2.public_key_base64(), &k2.secret_key_base64())
            .unwrap_err();
        assert_eq!(err, CryptoError::DecryptionFailed);
    }

    #[test]
    fn mismatched_public_key_fails() {
        let k1 = generate_key_pair().unwrap();
        let k2 = generate_key_pair().unwrap();

        let sealed = encrypt_sealed_box("secret", &k1.public_key_base64()).unwrap();
        let err = decrypt_sealed_box(&sealed, &k2.public_key_base64(), &k1.secret_key_base64())
            .unwrap_err();
        assert_eq!(err, CryptoError::DecryptionFailed);
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let pair = generate_key_pair().unwrap();
        let mut sealed = seal(b"do not touch", &pair.public_key).unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;

        let err = open(&sealed, &pair.public_key, &pair.secret_key).unwrap_err();
        assert_eq!(err, CryptoError::DecryptionFailed);

        let truncated = &sealed[..SEAL_OVERHEAD - 1];
        assert_eq!(
            open(truncated, &pair.public_key, &pair.secret_key).unwrap_err(),
            CryptoError::DecryptionFailed
        );
    }

    #[test]
    fn malformed_public_key_is_a_decode_error() {
        let err = encrypt_sealed_box("x", "not base64!").unwrap_err();
        assert!(err.is_decode_error());

        let short = codec::encode(&[9u8; 16]);
        let err = encrypt_sealed_box("x", &short).unwrap_err();
        assert_eq!(
            err,
            CryptoError::InvalidKeyLength {
                expected: 32,
                actual: 16
            }
        );
    }
}
