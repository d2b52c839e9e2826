//! AES-GCM round-trip helper.
//!
//! Only the encrypt/decrypt contract is implemented here — key derivation,
//! key storage, and rotation are owned by the operator-facing tooling this
//! crate does not include.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Key, Nonce};

use crate::error::{FleetError, Result};

const NONCE_LEN: usize = 12;

/// Encrypts `plaintext` under `key` (32 bytes), returning `nonce || ciphertext`.
/// A fresh random nonce is drawn for every call.
pub fn encrypt(key: &[u8; 32], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| FleetError::Internal(format!("encryption failed: {e}")))?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(nonce.as_slice());
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypts a `nonce || ciphertext` blob produced by [`encrypt`]. Returns a
/// `Validation` error on a truncated blob, wrong key, or tampered ciphertext
/// (AES-GCM's tag check fails identically in both cases).
pub fn decrypt(key: &[u8; 32], blob: &[u8]) -> Result<Vec<u8>> {
    if blob.len() < NONCE_LEN {
        return Err(FleetError::Validation("ciphertext too short".into()));
    }
    let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let nonce = Nonce::from_slice(nonce_bytes);

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| FleetError::Validation("decryption failed: wrong key or tampered data".into()))
}
