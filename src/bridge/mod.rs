//! Cross-view session bridge.
//!
//! The login view and the browser view are bootstrapped independently. The
//! only state that passes between them is one durable record, written after a
//! successful login, read once when the browser view starts, and deleted on
//! logout.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::types::{SubscriptionPeriod, User};
use crate::branding::AppConfig;

/// Fixed name of the record; the file is `<data dir>/subscription.json`.
pub const RECORD_NAME: &str = "subscription";

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Session record I/O failed at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("Session record serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// What the login view hands to the browser view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub key: String,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub subscription: Option<SubscriptionPeriod>,
    pub app_config: AppConfig,
}

/// Durable single-record store.
pub trait BridgeStore {
    /// Write the record, replacing any previous one.
    fn persist(&self, record: &SessionRecord) -> Result<(), BridgeError>;

    /// Read the record; `None` when there is none.
    fn load(&self) -> Result<Option<SessionRecord>, BridgeError>;

    /// Delete the record. Deleting a missing record succeeds.
    fn clear(&self) -> Result<(), BridgeError>;
}

/// Record stored as a JSON file in the application data directory.
#[derive(Debug, Clone)]
pub struct FileBridge {
    path: PathBuf,
}

impl FileBridge {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(format!("{}.json", RECORD_NAME)),
        }
    }

    /// `<platform data dir>/streamsauce`, or the working directory if unknown.
    pub fn default_dir() -> PathBuf {
        let mut path = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("streamsauce");
        path
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> BridgeError {
        BridgeError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl BridgeStore for FileBridge {
    fn persist(&self, record: &SessionRecord) -> Result<(), BridgeError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|e| self.io_error(e))?;
        }

        let content = serde_json::to_string_pretty(record)?;
        // Write-then-rename so a reader never sees a half-written record.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;

        log::debug!("Session record written to {}", self.path.display());
        Ok(())
    }

    fn load(&self) -> Result<Option<SessionRecord>, BridgeError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };

        match serde_json::from_str(&content) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                log::warn!(
                    "Ignoring unreadable session record at {}: {}",
                    self.path.display(),
                    e
                );
                Ok(None)
            }
        }
    }

    fn clear(&self) -> Result<(), BridgeError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::HosterBranding;
    use chrono::{TimeZone, Utc};

    fn sample_record() -> SessionRecord {
        SessionRecord {
            key: "ABCD1234EFGH5678".to_string(),
            user: Some(User {
                id: Some(7),
                name: "alice".to_string(),
                avatar: Some("https://cdn.example/a.png".to_string()),
                tele_username: None,
                is_hoster: true,
                iptv_hoster: Some(HosterBranding {
                    id: Some(1),
                    name: "Acme".to_string(),
                    logo: None,
                    color_palette: r##"["#111","#222","#333"]"##.to_string(),
                }),
            }),
            subscription: Some(SubscriptionPeriod {
                started: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                end: Utc.with_ymd_and_hms(2030, 6, 30, 12, 0, 0).unwrap(),
            }),
            app_config: AppConfig {
                title: "Acme".to_string(),
                dark_mode: true,
                ..AppConfig::default()
            },
        }
    }

    #[test]
    fn test_persist_then_load_on_fresh_instance() {
        let dir = tempfile::tempdir().unwrap();
        let record = sample_record();

        FileBridge::new(dir.path()).persist(&record).unwrap();

        let loaded = FileBridge::new(dir.path()).load().unwrap();
        assert_eq!(loaded, Some(record));
    }

    #[test]
    fn test_clear_then_load_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = FileBridge::new(dir.path());
        bridge.persist(&sample_record()).unwrap();

        bridge.clear().unwrap();
        assert_eq!(bridge.load().unwrap(), None);
        // Clearing again is fine.
        bridge.clear().unwrap();
    }

    #[test]
    fn test_load_without_record_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(FileBridge::new(dir.path()).load().unwrap(), None);
    }

    #[test]
    fn test_persist_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = FileBridge::new(dir.path());
        bridge.persist(&sample_record()).unwrap();

        let second = SessionRecord {
            key: "SECOND".to_string(),
            user: None,
            subscription: None,
            app_config: AppConfig::default(),
        };
        bridge.persist(&second).unwrap();
        assert_eq!(bridge.load().unwrap(), Some(second));
    }

    #[test]
    fn test_persist_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let bridge = FileBridge::new(&nested);
        bridge.persist(&sample_record()).unwrap();
        assert!(bridge.path().exists());
    }

    #[test]
    fn test_corrupt_record_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = FileBridge::new(dir.path());
        fs::write(bridge.path(), "{not json").unwrap();
        assert_eq!(bridge.load().unwrap(), None);
    }

    #[test]
    fn test_record_field_names() {
        let json = serde_json::to_string(&sample_record()).unwrap();
        assert!(json.contains("\"key\":\"ABCD1234EFGH5678\""));
        assert!(json.contains("\"appConfig\":{"));
        assert!(json.contains("\"subscription\":{"));
        assert!(json.contains("\"user\":{"));
    }
}
