//! Runtime settings.
//!
//! Precedence: command-line flag > environment (including `.env`) > default.

use std::path::PathBuf;

use crate::bridge::FileBridge;
use crate::crypto::{EnvelopeError, EnvelopeKey};

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:65000";
pub const DEFAULT_PLAYER: &str = "mpv";

pub const ENV_API_URL: &str = "STREAMSAUCE_API_URL";
pub const ENV_ENVELOPE_KEY: &str = "STREAMSAUCE_ENVELOPE_KEY";
pub const ENV_PLAYER: &str = "STREAMSAUCE_PLAYER";
pub const ENV_DATA_DIR: &str = "STREAMSAUCE_DATA_DIR";

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_url: Option<String>,
    pub player: Option<String>,
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_url: String,
    pub envelope_key: EnvelopeKey,
    pub player: String,
    pub data_dir: PathBuf,
}

impl Settings {
    pub fn resolve(overrides: &Overrides) -> Result<Self, EnvelopeError> {
        Self::resolve_with(overrides, |name| std::env::var(name).ok())
    }

    fn resolve_with<F>(overrides: &Overrides, lookup: F) -> Result<Self, EnvelopeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank variables count as unset.
        let env = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_url = overrides
            .api_url
            .clone()
            .or_else(|| env(ENV_API_URL))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let envelope_key = match env(ENV_ENVELOPE_KEY) {
            Some(passphrase) => EnvelopeKey::from_passphrase(&passphrase)?,
            None => EnvelopeKey::default(),
        };

        let player = overrides
            .player
            .clone()
            .or_else(|| env(ENV_PLAYER))
            .unwrap_or_else(|| DEFAULT_PLAYER.to_string());

        let data_dir = overrides
            .data_dir
            .clone()
            .or_else(|| env(ENV_DATA_DIR).map(PathBuf::from))
            .unwrap_or_else(FileBridge::default_dir);

        Ok(Self {
            api_url,
            envelope_key,
            player,
            data_dir,
        })
    }
}
