//! StreamSauce crypto module.
//!
//! Opens the AES-256-GCM envelopes returned by the licensing server's
//! public endpoints.

pub mod aes;
pub mod envelope;
pub mod utils;

pub use envelope::{decrypt_envelope, seal_envelope, EnvelopeError, EnvelopeKey};
