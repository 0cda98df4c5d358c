// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sender-authenticated public-key encryption (`crypto_box`).
//!
//! Unlike a sealed box the recipient learns, and can verify, who sent the
//! message. The nonce must travel with the ciphertext and must never be
//! reused for the same pair of keys.

use crypto_box::{
    aead::{generic_array::GenericArray, Aead, Nonce},
    SalsaBox,
};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};

use super::{
    codec, ensure_initialized,
    keys::{PublicKeyBytes, SecretKeyInput},
    CryptoError, Result,
};

/// Size of a box nonce in bytes.
pub const NONCE_SIZE: usize = 24;

/// Ciphertext plus the nonce it was produced with, both base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedCiphertext {
    pub encrypted: String,
    pub nonce: String,
}

/// Fresh random 24-byte nonce, base64.
pub fn generate_nonce() -> Result<String> {
    Ok(codec::encode(&random_nonce()?))
}

fn random_nonce() -> Result<[u8; NONCE_SIZE]> {
    ensure_initialized()?;
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng
        .try_fill_bytes(&mut nonce)
        .map_err(|_| CryptoError::EncryptionFailed)?;
    Ok(nonce)
}

fn parse_nonce(input: &str) -> Result<Nonce<SalsaBox>> {
    let bytes = codec::decode(input)?;
    if bytes.len() != NONCE_SIZE {
        return Err(CryptoError::InvalidNonceLength {
            expected: NONCE_SIZE,
            actual: bytes.len(),
        });
    }
    Ok(GenericArray::clone_from_slice(&bytes))
}

/// Encrypt for `recipient_public_key`, authenticated by `sender_secret_key`.
///
/// When `nonce` is `None` a fresh one is generated and returned alongside the
/// ciphertext. A supplied nonce is used as-is.
pub fn encrypt_box<'a>(
    plaintext: &str,
    recipient_public_key: &str,
    sender_secret_key: impl Into<SecretKeyInput<'a>>,
    nonce: Option<&str>,
) -> Result<AuthenticatedCiphertext> {
    ensure_initialized()?;
    let recipient = PublicKeyBytes::from_base64(recipient_public_key)?;
    let sender = sender_secret_key.into().to_box_key()?;

    let nonce_b64 = match nonce {
        Some(n) => n.to_string(),
        None => generate_nonce()?,
    };
    let nonce = parse_nonce(&nonce_b64)?;

    let encrypted = SalsaBox::new(&recipient.to_box_key(), &sender)
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|_| CryptoError::EncryptionFailed)?;

    Ok(AuthenticatedCiphertext {
        encrypted: codec::encode(&encrypted),
        nonce: codec::encode(nonce.as_slice()),
    })
}

/// Decrypt a box, verifying it came from `sender_public_key`.
pub fn decrypt_box<'a>(
    ciphertext: &str,
    nonce: &str,
    sender_public_key: &str,
    recipient_secret_key: impl Into<SecretKeyInput<'a>>,
) -> Result<String> {
    ensure_initialized()?;
    let sender = PublicKeyBytes::from_base64(sender_public_key)?;
    let recipient = recipient_secret_key.into().to_box_key()?;
    let nonce = parse_nonce(nonce)?;
    let encrypted = codec::decode(ciphertext)?;

    let opened = SalsaBox::new(&sender.to_box_key(), &recipient)
        .decrypt(&nonce, encrypted.as_slice())
        .map_err(|_| CryptoError::DecryptionFailed)?;

    String::from_utf8(opened).map_err(|_| CryptoError::InvalidPlaintext)
}
