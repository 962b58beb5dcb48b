//! Base64 envelope codec for licensing server payloads.
//!
//! Every public endpoint wraps its JSON body as `{"data": "<base64>"}` where
//! the decoded bytes are an AES-256-GCM sealed blob under a pre-shared key.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::aes::{seal_aes_gcm, unseal_aes_gcm, AesError, AES_KEY_SIZE};

/// Pre-shared key shipped with every client build.
///
/// Anyone holding the binary can read it; it only keeps payloads opaque on the wire.
pub const DEFAULT_ENVELOPE_KEY: &str = "EvMimti9L6yB7As37tH2VdjzLoBxYHts";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("Envelope is not valid base64: {0}")]
    Format(String),
    #[error("Envelope failed integrity check: {0}")]
    Integrity(String),
    #[error("Envelope key must be 32 bytes, got {0}")]
    InvalidKey(usize),
}

impl From<AesError> for EnvelopeError {
    fn from(err: AesError) -> Self {
        EnvelopeError::Integrity(err.to_string())
    }
}

/// The 32-byte symmetric key, taken verbatim from the UTF-8 key string.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EnvelopeKey([u8; AES_KEY_SIZE]);

impl EnvelopeKey {
    pub fn from_passphrase(key: &str) -> Result<Self, EnvelopeError> {
        let bytes: [u8; AES_KEY_SIZE] = key
            .as_bytes()
            .try_into()
            .map_err(|_| EnvelopeError::InvalidKey(key.len()))?;
        Ok(Self(bytes))
    }

    fn bytes(&self) -> &[u8; AES_KEY_SIZE] {
        &self.0
    }
}

impl Default for EnvelopeKey {
    fn default() -> Self {
        let mut bytes = [0u8; AES_KEY_SIZE];
        bytes.copy_from_slice(DEFAULT_ENVELOPE_KEY.as_bytes());
        Self(bytes)
    }
}

impl std::fmt::Debug for EnvelopeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EnvelopeKey(..)")
    }
}

/// Decode and open a base64 envelope into its plaintext JSON string.
///
/// All-or-nothing: no partial plaintext is returned on any failure.
pub fn decrypt_envelope(envelope: &str, key: &EnvelopeKey) -> Result<String, EnvelopeError> {
    let sealed = STANDARD
        .decode(envelope.trim())
        .map_err(|e| EnvelopeError::Format(e.to_string()))?;

    let plaintext = unseal_aes_gcm(&sealed, key.bytes())?;

    String::from_utf8(plaintext).map_err(|e| EnvelopeError::Format(e.to_string()))
}

/// Seal a plaintext string into a base64 envelope with a random nonce.
pub fn seal_envelope(plaintext: &str, key: &EnvelopeKey) -> Result<String, EnvelopeError> {
    let sealed = seal_aes_gcm(plaintext.as_bytes(), key.bytes())?;
    Ok(STANDARD.encode(sealed))
}
