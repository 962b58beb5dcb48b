//! Utility functions for cryptographic operations.

use rand::RngCore;

use super::aes::AES_IV_SIZE;

/// Generate a random 12-byte nonce.
pub fn generate_iv() -> [u8; AES_IV_SIZE] {
    let mut iv = [0u8; AES_IV_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut iv);
    iv
}
