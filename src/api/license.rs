//! Licensing endpoint calls: subscription validation and catalog fetch.
//!
//! Both calls are a single GET with no retry. A failed attempt surfaces
//! immediately; the caller decides whether to offer a retry.

use thiserror::Error;

use super::types::{CatalogPayload, EncryptedResponse, Package, ValidationResult};
use crate::crypto::{decrypt_envelope, EnvelopeError, EnvelopeKey};

pub const VALIDATE_PATH: &str = "/api/public/validate";
pub const PACKAGES_PATH: &str = "/api/public/packages";

#[derive(Debug, Error)]
pub enum LicenseError {
    #[error("Subscription key is empty")]
    EmptyInput,
    #[error("Request failed: {0}")]
    Network(String),
    #[error("Unexpected response: {0}")]
    Protocol(String),
    #[error("Not authenticated")]
    NotAuthenticated,
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
    #[error("Failed to parse decrypted payload: {0}")]
    Payload(String),
}

/// Raw HTTP reply handed back by a transport.
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

/// Trait abstracting the HTTP GET for testability.
///
/// In production, `ApiClient` implements this with reqwest.
/// In tests, a mock implementation serves canned replies and counts calls.
#[allow(async_fn_in_trait)]
pub trait LicenseTransport {
    /// GET a path relative to the licensing server base URL.
    async fn get(&self, path: &str) -> Result<HttpReply, LicenseError>;
}

/// Client for the two public licensing endpoints.
pub struct LicenseClient<T> {
    transport: T,
    envelope_key: EnvelopeKey,
}

impl<T: LicenseTransport> LicenseClient<T> {
    pub fn new(transport: T, envelope_key: EnvelopeKey) -> Self {
        Self {
            transport,
            envelope_key,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// `GET /api/public/validate/{key}`.
    ///
    /// A blank key is rejected before any request is made.
    pub async fn validate_key(&self, key: &str) -> Result<EncryptedResponse, LicenseError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(LicenseError::EmptyInput);
        }

        let path = format!("{}/{}", VALIDATE_PATH, urlencoding::encode(key));
        self.get_envelope(&path).await
    }

    /// `GET /api/public/packages`.
    ///
    /// `authenticated` is the caller's session flag; without it no request is made.
    pub async fn fetch_catalog(&self, authenticated: bool) -> Result<EncryptedResponse, LicenseError> {
        if !authenticated {
            return Err(LicenseError::NotAuthenticated);
        }
        self.get_envelope(PACKAGES_PATH).await
    }

    /// Decrypt and parse a validate envelope.
    pub fn open_validation(&self, envelope: &EncryptedResponse) -> Result<ValidationResult, LicenseError> {
        let plaintext = decrypt_envelope(&envelope.data, &self.envelope_key)?;
        serde_json::from_str(&plaintext).map_err(|e| LicenseError::Payload(e.to_string()))
    }

    /// Decrypt and parse a packages envelope.
    pub fn open_catalog(&self, envelope: &EncryptedResponse) -> Result<Vec<Package>, LicenseError> {
        let plaintext = decrypt_envelope(&envelope.data, &self.envelope_key)?;
        let payload: CatalogPayload =
            serde_json::from_str(&plaintext).map_err(|e| LicenseError::Payload(e.to_string()))?;
        Ok(payload.into_packages())
    }

    async fn get_envelope(&self, path: &str) -> Result<EncryptedResponse, LicenseError> {
        let reply = self.transport.get(path).await?;

        if reply.status != 200 {
            return Err(LicenseError::Protocol(format!(
                "server returned status {}",
                reply.status
            )));
        }

        serde_json::from_str(&reply.body)
            .map_err(|e| LicenseError::Protocol(format!("body is not an envelope: {}", e)))
    }
}


#[cfg(test)]
mod tests {
    use super::mock::MockTransport;
    use super::*;

    fn client() -> LicenseClient<MockTransport> {
        LicenseClient::new(MockTransport::new(), EnvelopeKey::default())
    }

    #[tokio::test]
    async fn test_blank_key_makes_no_request() {
        let client = client();
        assert!(matches!(client.validate_key("").await, Err(LicenseError::EmptyInput)));
        assert!(matches!(client.validate_key("   ").await, Err(LicenseError::EmptyInput)));
        assert_eq!(client.transport().calls(), 0);
    }

    #[tokio::test]
    async fn test_catalog_without_session_makes_no_request() {
        let client = client();
        let result = client.fetch_catalog(false).await;
        assert!(matches!(result, Err(LicenseError::NotAuthenticated)));
        assert_eq!(client.transport().calls(), 0);
    }

    #[tokio::test]
    async fn test_validate_key_path_is_trimmed_and_encoded() {
        let client = client();
        client.transport().push_sealed(r#"{"valid":true,"status":"active"}"#);

        let envelope = client.validate_key("  AB CD/1  ").await.unwrap();
        assert_eq!(
            client.transport().paths(),
            vec!["/api/public/validate/AB%20CD%2F1".to_string()]
        );

        let result = client.open_validation(&envelope).unwrap();
        assert!(result.valid);
    }

    #[tokio::test]
    async fn test_non_200_is_protocol_error() {
        let client = client();
        client.transport().push_reply(Ok(HttpReply {
            status: 500,
            body: "{}".to_string(),
        }));
        let result = client.validate_key("KEY").await;
        assert!(matches!(result, Err(LicenseError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_non_json_body_is_protocol_error() {
        let client = client();
        client.transport().push_reply(Ok(HttpReply {
            status: 200,
            body: "<html>oops</html>".to_string(),
        }));
        let result = client.fetch_catalog(true).await;
        assert!(matches!(result, Err(LicenseError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_transport_failure_is_network_error() {
        let client = client();
        client
            .transport()
            .push_reply(Err(LicenseError::Network("connection refused".to_string())));
        let result = client.validate_key("KEY").await;
        assert!(matches!(result, Err(LicenseError::Network(_))));
        assert_eq!(client.transport().calls(), 1);
    }

    #[tokio::test]
    async fn test_catalog_decrypts_packages() {
        let client = client();
        client.transport().push_sealed(
            r#"[{"id":1,"name":"Sports","logo":"","channels":[{"id":5,"name":"Arena","logo":"","mpd":"https://cdn/a.mpd","key":"k1:v1"}]}]"#,
        );

        let envelope = client.fetch_catalog(true).await.unwrap();
        let packages = client.open_catalog(&envelope).unwrap();
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].channels[0].name, "Arena");
        assert_eq!(client.transport().paths(), vec![PACKAGES_PATH.to_string()]);
    }

    #[test]
    fn test_tampered_envelope_surfaces_as_envelope_error() {
        let client = client();
        let envelope = EncryptedResponse {
            data: "AAAA".to_string(),
        };
        assert!(matches!(
            client.open_validation(&envelope),
            Err(LicenseError::Envelope(EnvelopeError::Integrity(_)))
        ));
    }

    #[test]
    fn test_garbage_plaintext_is_payload_error() {
        let client = client();
        let data = crate::crypto::seal_envelope("not json", &EnvelopeKey::default()).unwrap();
        let result = client.open_catalog(&EncryptedResponse { data });
        assert!(matches!(result, Err(LicenseError::Payload(_))));
    }
}
