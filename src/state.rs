//! Application context handed to every controller.
//!
//! Owns the licensing client, the session authority and the cross-view
//! bridge. Nothing here is global; the shell builds one and borrows it out.

use crate::api::{ApiClient, LicenseClient, LicenseTransport};
use crate::bridge::FileBridge;
use crate::config::Settings;
use crate::crypto::EnvelopeKey;
use crate::session::SessionStore;

pub struct AppState<T> {
    /// Calls to the two public licensing endpoints.
    pub license: LicenseClient<T>,

    /// Authentication flag and live branding config.
    pub session: SessionStore,

    /// Durable record shared between the login and browser views.
    pub bridge: FileBridge,
}

impl<T: LicenseTransport> AppState<T> {
    pub fn new(transport: T, envelope_key: EnvelopeKey, bridge: FileBridge) -> Self {
        Self {
            license: LicenseClient::new(transport, envelope_key),
            session: SessionStore::new(),
            bridge,
        }
    }
}

impl AppState<ApiClient> {
    /// Production context: reqwest transport against the configured server.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            ApiClient::new(&settings.api_url),
            settings.envelope_key.clone(),
            FileBridge::new(&settings.data_dir),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Overrides;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_from_settings() {
        let dir = tempfile::tempdir().unwrap();
        let overrides = Overrides {
            api_url: Some("http://127.0.0.1:65000/".to_string()),
            player: None,
            data_dir: Some(dir.path().to_path_buf()),
        };
        let settings = Settings::resolve(&overrides).unwrap();
        let state = AppState::from_settings(&settings);

        assert_eq!(state.license.transport().base_url(), "http://127.0.0.1:65000");
        assert_eq!(
            state.bridge.path(),
            PathBuf::from(dir.path()).join("subscription.json").as_path()
        );
        assert!(!state.session.is_authenticated().await);
    }
}
