//! Request and response types for the licensing server API.
//!
//! Field names are snake_case to match the server's JSON format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Outer body of every public endpoint: `{"data": "<base64 envelope>"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedResponse {
    pub data: String,
}

/// Subscription status reported by `GET /api/public/validate/{key}`.
///
/// Unrecognised values decode as `Unknown`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Expired,
    NotStarted,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Decrypted payload of the validate endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub status: SubscriptionStatus,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub subscription: Option<SubscriptionPeriod>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Subscriber profile (sensitive fields are stripped by the server).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub avatar: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub tele_username: Option<String>,
    #[serde(default)]
    pub is_hoster: bool,
    #[serde(default)]
    pub iptv_hoster: Option<HosterBranding>,
}

impl User {
    /// Name shown in the user menu.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            "User"
        } else {
            &self.name
        }
    }

    /// Single-letter placeholder used when no avatar image is set.
    pub fn initial(&self) -> String {
        self.name
            .trim()
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_else(|| "?".to_string())
    }

    /// Hoster branding, only when the user is flagged as a hoster.
    pub fn hoster_branding(&self) -> Option<&HosterBranding> {
        if self.is_hoster {
            self.iptv_hoster.as_ref()
        } else {
            None
        }
    }
}

/// Branding of the IPTV reseller a user belongs to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HosterBranding {
    #[serde(default)]
    pub id: Option<u64>,
    pub name: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub logo: Option<String>,
    /// JSON-encoded array of hex colors, e.g. `["#111","#222","#333"]`.
    #[serde(default)]
    pub color_palette: String,
}

/// Validity window of a subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionPeriod {
    pub started: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SubscriptionPeriod {
    pub fn started_label(&self) -> String {
        self.started.format("%Y-%m-%d").to_string()
    }

    pub fn end_label(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }
}

/// A named bundle of channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub logo: String,
    #[serde(default)]
    pub channels: Vec<Channel>,
}

/// A single live channel backed by a DASH manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub logo: String,
    pub mpd: String,
    /// Clear-key credential in `"<kid>:<key>"` form.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub key: Option<String>,
}

/// Decrypted payload of `GET /api/public/packages`.
///
/// The server emits a bare list; a `{"packages": [...]}` wrapper is accepted too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CatalogPayload {
    List(Vec<Package>),
    Wrapped { packages: Vec<Package> },
}

impl CatalogPayload {
    pub fn into_packages(self) -> Vec<Package> {
        match self {
            CatalogPayload::List(packages) => packages,
            CatalogPayload::Wrapped { packages } => packages,
        }
    }
}

/// The server sends `""` for unset optional strings.
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_result_deserialization() {
        let json = r##"{
            "valid": true,
            "status": "active",
            "subscription": {
                "id": 4,
                "user_id": 2,
                "started": "2024-01-01T00:00:00Z",
                "end": "2030-01-01T00:00:00.5+02:00",
                "payed": 9.99,
                "key": "ABCDEF"
            },
            "user": {
                "id": 2,
                "name": "alice",
                "avatar": "",
                "tele_username": "alice_tg",
                "is_hoster": true,
                "iptv_hoster": {
                    "id": 1,
                    "name": "Acme",
                    "logo": "https://acme.example/logo.png",
                    "color_palette": "[\"#ed254e\"]"
                }
            }
        }"##;

        let result: ValidationResult = serde_json::from_str(json).unwrap();
        assert!(result.valid);
        assert_eq!(result.status, SubscriptionStatus::Active);

        let user = result.user.unwrap();
        assert_eq!(user.name, "alice");
        assert_eq!(user.avatar, None);
        assert_eq!(user.tele_username.as_deref(), Some("alice_tg"));
        let hoster = user.hoster_branding().unwrap();
        assert_eq!(hoster.name, "Acme");
        assert_eq!(hoster.color_palette, "[\"#ed254e\"]");

        let period = result.subscription.unwrap();
        assert_eq!(period.started_label(), "2024-01-01");
        assert_eq!(period.end_label(), "2029-12-31");
    }

    #[test]
    fn test_invalid_result_with_error() {
        let json = r#"{"valid": false, "error": "Subscription not found"}"#;
        let result: ValidationResult = serde_json::from_str(json).unwrap();
        assert!(!result.valid);
        assert_eq!(result.status, SubscriptionStatus::Unknown);
        assert_eq!(result.error.as_deref(), Some("Subscription not found"));
    }

    #[test]
    fn test_status_variants() {
        let expired: SubscriptionStatus = serde_json::from_str("\"expired\"").unwrap();
        assert_eq!(expired, SubscriptionStatus::Expired);

        let not_started: SubscriptionStatus = serde_json::from_str("\"not_started\"").unwrap();
        assert_eq!(not_started, SubscriptionStatus::NotStarted);

        let other: SubscriptionStatus = serde_json::from_str("\"suspended\"").unwrap();
        assert_eq!(other, SubscriptionStatus::Unknown);
    }

    #[test]
    fn test_hoster_branding_requires_flag() {
        let user = User {
            name: "bob".to_string(),
            is_hoster: false,
            iptv_hoster: Some(HosterBranding {
                name: "Acme".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(user.hoster_branding().is_none());
    }

    #[test]
    fn test_user_initial_and_display_name() {
        let user = User {
            name: "zed".to_string(),
            ..Default::default()
        };
        assert_eq!(user.initial(), "Z");
        assert_eq!(user.display_name(), "zed");

        let anonymous = User::default();
        assert_eq!(anonymous.initial(), "?");
        assert_eq!(anonymous.display_name(), "User");
    }

    #[test]
    fn test_catalog_list_and_wrapped() {
        let list = r#"[{"id":1,"name":"Sports","logo":"s.png","channels":[
            {"id":10,"name":"One","logo":"","mpd":"https://cdn/one.mpd","key":"ab:cd"},
            {"id":11,"name":"Two","mpd":"https://cdn/two.mpd","key":""}
        ]},{"id":2,"name":"Empty"}]"#;
        let packages = serde_json::from_str::<CatalogPayload>(list)
            .unwrap()
            .into_packages();
        assert_eq!(packages.len(), 2);
        assert_eq!(packages[0].channels[0].key.as_deref(), Some("ab:cd"));
        assert_eq!(packages[0].channels[1].key, None);
        assert!(packages[1].channels.is_empty());

        let wrapped = r#"{"packages":[{"id":3,"name":"News"}]}"#;
        let packages = serde_json::from_str::<CatalogPayload>(wrapped)
            .unwrap()
            .into_packages();
        assert_eq!(packages[0].name, "News");
    }
}
