//! Session store: the single authority for the authentication flag and the
//! live `AppConfig`.
//!
//! Every change goes through one of the transitions below and is published
//! on a `watch` channel so views can re-theme and retitle themselves.

use thiserror::Error;
use tokio::sync::{watch, RwLock};

use crate::api::types::ValidationResult;
use crate::branding::{self, AppConfig};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Validation result is not valid")]
    InvalidSubscription,
}

#[derive(Debug, Default)]
struct Session {
    authenticated: bool,
    config: AppConfig,
}

pub struct SessionStore {
    inner: RwLock<Session>,
    config_tx: watch::Sender<AppConfig>,
}

impl SessionStore {
    pub fn new() -> Self {
        let (config_tx, _) = watch::channel(AppConfig::default());
        Self {
            inner: RwLock::new(Session::default()),
            config_tx,
        }
    }

    /// Commit a successful validation.
    ///
    /// Hoster branding is merged when the user is a hoster with branding
    /// attached; otherwise the current config is kept. The resulting title is
    /// always republished.
    pub async fn login(&self, result: &ValidationResult) -> Result<AppConfig, SessionError> {
        if !result.valid {
            return Err(SessionError::InvalidSubscription);
        }

        let mut session = self.inner.write().await;
        let hoster = result.user.as_ref().and_then(|u| u.hoster_branding());

        match hoster {
            Some(h) => log::info!("Applying IPTV hoster branding: {}", h.name),
            None => log::info!("Using default {} branding", branding::DEFAULT_TITLE),
        }

        session.config = branding::merge(&session.config, hoster);
        session.authenticated = true;

        let config = session.config.clone();
        self.config_tx.send_replace(config.clone());
        Ok(config)
    }

    /// Drop authentication and reset the config wholesale, dark mode included.
    pub async fn logout(&self) {
        let mut session = self.inner.write().await;
        session.authenticated = false;
        session.config = AppConfig::default();
        self.config_tx.send_replace(session.config.clone());
    }

    /// Flip dark mode in place. No authentication required.
    pub async fn toggle_dark_mode(&self) -> bool {
        let mut session = self.inner.write().await;
        session.config.dark_mode = !session.config.dark_mode;
        self.config_tx.send_replace(session.config.clone());
        session.config.dark_mode
    }

    pub async fn read_config(&self) -> AppConfig {
        self.inner.read().await.config.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.inner.read().await.authenticated
    }

    /// Receive every committed config, starting from the current one.
    pub fn subscribe(&self) -> watch::Receiver<AppConfig> {
        self.config_tx.subscribe()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
