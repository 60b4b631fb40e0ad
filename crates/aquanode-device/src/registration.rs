//! HTTP client for registering with the network controller.
//!
//! A device announces itself by POSTing `{"device":"<class>"}` to the
//! controller's `/registration` endpoint. The controller answers with the
//! literal body `registered` on success; anything else is a rejection.

use std::time::Duration;

use async_trait::async_trait;
use aquanode_core::DeviceClass;
use serde::Serialize;

use crate::error::{DeviceError, Result};

/// The response body that signals a successful registration.
pub const REGISTERED_MARKER: &str = "registered";

/// Path of the registration endpoint on the controller.
pub const REGISTRATION_PATH: &str = "/registration";

/// Trait for controller registration.
///
/// This trait abstracts the registration transport, allowing for mock
/// implementations in tests.
#[async_trait]
pub trait RegistrationClient: Send + Sync {
    /// Send one registration request and return the response body.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::RegistrationUnavailable` if no response arrived
    /// (timeout or transport failure).
    async fn register(&self, identity: &DeviceClass) -> Result<String>;
}

#[async_trait]
impl<T: RegistrationClient + ?Sized> RegistrationClient for Box<T> {
    async fn register(&self, identity: &DeviceClass) -> Result<String> {
        (**self).register(identity).await
    }
}

/// Request body for registration.
#[derive(Debug, Serialize)]
struct RegistrationRequest<'a> {
    device: &'a DeviceClass,
}

/// HTTP client for the controller's registration endpoint.
#[derive(Debug, Clone)]
pub struct HttpRegistrationClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRegistrationClient {
    /// Create a new registration client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the controller (e.g., "http://[fd00::1]:5683")
    /// * `timeout` - How long to wait for a response before treating the attempt as lost
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::Config` if the HTTP client cannot be created.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| DeviceError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self::with_client(client, base_url))
    }

    /// Create a new registration client with a custom reqwest client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Get the base URL of the controller.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl RegistrationClient for HttpRegistrationClient {
    async fn register(&self, identity: &DeviceClass) -> Result<String> {
        let url = format!("{}{REGISTRATION_PATH}", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&RegistrationRequest { device: identity })
            .send()
            .await
            .map_err(|e| DeviceError::RegistrationUnavailable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DeviceError::RegistrationUnavailable(e.to_string()))?;

        tracing::debug!(
            device = %identity,
            status = %status,
            body = %body,
            "Registration response received"
        );

        Ok(body)
    }
}

/// A no-op registration client for nodes running without a controller.
///
/// Every request is accepted immediately.
#[derive(Debug, Clone, Default)]
pub struct NoopRegistrationClient;

impl NoopRegistrationClient {
    /// Create a new no-op registration client.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RegistrationClient for NoopRegistrationClient {
    async fn register(&self, identity: &DeviceClass) -> Result<String> {
        tracing::warn!(
            device = %identity,
            "NoopRegistrationClient: register called but no controller configured"
        );
        Ok(REGISTERED_MARKER.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn posts_device_class_and_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/registration"))
            .and(body_json(serde_json::json!({ "device": "CO2Dispenser" })))
            .respond_with(ResponseTemplate::new(201).set_body_string("registered"))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpRegistrationClient::new(server.uri(), Duration::from_secs(2)).unwrap();
        let body = client.register(&DeviceClass::co2_dispenser()).await.unwrap();
        assert_eq!(body, REGISTERED_MARKER);
    }

    #[tokio::test]
    async fn rejection_body_is_returned_not_raised() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/registration"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let client = HttpRegistrationClient::new(server.uri(), Duration::from_secs(2)).unwrap();
        let body = client
            .register(&DeviceClass::osmotic_water_tank())
            .await
            .unwrap();
        assert_eq!(body, "");
    }

    #[tokio::test]
    async fn slow_controller_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_string("registered")
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let client =
            HttpRegistrationClient::new(server.uri(), Duration::from_millis(100)).unwrap();
        let err = client
            .register(&DeviceClass::co2_dispenser())
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceError::RegistrationUnavailable(_)));
        assert!(err.is_retriable());
    }

    #[test]
    fn base_url_is_normalised() {
        let client =
            HttpRegistrationClient::new("http://localhost:5683/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:5683");
    }

    #[tokio::test]
    async fn noop_client_always_accepts() {
        let client: Box<dyn RegistrationClient> = Box::new(NoopRegistrationClient::new());
        let body = client.register(&DeviceClass::co2_dispenser()).await.unwrap();
        assert_eq!(body, REGISTERED_MARKER);
    }
}
