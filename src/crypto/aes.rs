//! AES-256-GCM sealing and unsealing.
//!
//! Sealed format: Nonce (12 bytes) || Ciphertext || Auth Tag (16 bytes)
//! This is the layout the licensing server emits for every public response.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use thiserror::Error;

use super::utils::generate_iv;

/// AES-256-GCM key size in bytes (256 bits).
pub const AES_KEY_SIZE: usize = 32;

/// AES-GCM nonce size in bytes (96 bits).
pub const AES_IV_SIZE: usize = 12;

/// AES-GCM authentication tag size in bytes (128 bits).
pub const AES_TAG_SIZE: usize = 16;

/// Minimum sealed data size: nonce + auth tag (empty plaintext).
pub const MIN_SEALED_SIZE: usize = AES_IV_SIZE + AES_TAG_SIZE;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AesError {
    #[error("Encryption failed")]
    EncryptionFailed,
    #[error("Sealed data too short: {0} bytes")]
    Truncated(usize),
    #[error("Authentication tag mismatch")]
    TagMismatch,
}

fn cipher(key: &[u8; AES_KEY_SIZE]) -> Aes256Gcm {
    Aes256Gcm::new(key.into())
}

fn seal_with_nonce(
    plaintext: &[u8],
    key: &[u8; AES_KEY_SIZE],
    nonce: [u8; AES_IV_SIZE],
) -> Result<Vec<u8>, AesError> {
    let ciphertext = cipher(key)
        .encrypt(&nonce.into(), plaintext)
        .map_err(|_| AesError::EncryptionFailed)?;

    let mut sealed = Vec::with_capacity(AES_IV_SIZE + ciphertext.len());
    sealed.extend_from_slice(&nonce);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Seal data with a freshly generated nonce.
///
/// Returns: Nonce (12 bytes) || Ciphertext || Auth Tag (16 bytes)
pub fn seal_aes_gcm(plaintext: &[u8], key: &[u8; AES_KEY_SIZE]) -> Result<Vec<u8>, AesError> {
    seal_with_nonce(plaintext, key, generate_iv())
}

/// Unseal data produced by `seal_aes_gcm` (or the licensing server).
///
/// Any modified byte, nonce included, fails the tag check.
pub fn unseal_aes_gcm(sealed: &[u8], key: &[u8; AES_KEY_SIZE]) -> Result<Vec<u8>, AesError> {
    if sealed.len() < MIN_SEALED_SIZE {
        return Err(AesError::Truncated(sealed.len()));
    }

    let (nonce, ciphertext) = sealed.split_at(AES_IV_SIZE);
    cipher(key)
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| AesError::TagMismatch)
}
