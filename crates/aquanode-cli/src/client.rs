//! HTTP client for a device's resource binding.
//!
//! This module provides a typed client for interacting with `aquanode-device`.

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use aquanode_core::ResourcePath;
use aquanode_device::{Snapshot, WriteRequest};

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The device returned an error response.
    #[error("device error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("failed to parse response: {0}")]
    Parse(String),
}

/// Error body returned by the device.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Device record as reported by `GET /status`.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceStatus {
    /// Class name.
    pub device: String,
    /// Handshake phase.
    pub phase: String,
    /// When reachability was confirmed.
    pub connected_at: Option<DateTime<Utc>>,
    /// When the controller accepted the registration.
    pub registered_at: Option<DateTime<Utc>>,
    /// Resource path.
    pub resource: String,
    /// Whether forced stop is available.
    pub supports_stop: bool,
}

/// Result of a simulated button press.
#[derive(Debug, Clone, Deserialize)]
pub struct PressResult {
    /// Whether the resource was refilled.
    pub refilled: bool,
    /// Whether the resource was waiting for a refill.
    pub refill_needed: bool,
    /// State after the refill.
    pub snapshot: Option<Snapshot>,
    /// Hold time needed, when the press was too short.
    pub required_seconds: Option<u64>,
}

/// Client for one device.
#[derive(Debug, Clone)]
pub struct DeviceClient {
    client: Client,
    base_url: String,
    resource: ResourcePath,
}

impl DeviceClient {
    /// Create a new device client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the device (e.g., "http://localhost:5683")
    /// * `resource` - Resource path served by the device
    pub fn new(base_url: impl Into<String>, resource: ResourcePath) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            resource,
        }
    }

    fn resource_url(&self) -> String {
        format!("{}{}", self.base_url, self.resource.route())
    }

    /// WebSocket URL of the observe stream.
    pub fn observe_url(&self) -> String {
        let url = format!(
            "{}{}",
            self.base_url,
            self.resource.child_route("observe")
        );
        if let Some(rest) = url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            url
        }
    }

    /// Handle error responses.
    async fn handle_error(response: reqwest::Response) -> ClientError {
        let status = response.status().as_u16();
        let message = match response.json::<ApiErrorResponse>().await {
            Ok(err) => err.error.message,
            Err(_) => "unknown error".to_string(),
        };
        ClientError::Api { status, message }
    }

    /// Fetch the device record.
    pub async fn status(&self) -> Result<DeviceStatus, ClientError> {
        let url = format!("{}/status", self.base_url);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))
    }

    /// Read the resource.
    pub async fn read(&self) -> Result<Snapshot, ClientError> {
        let response = self.client.get(self.resource_url()).send().await?;

        if !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))
    }

    /// Write form fields to the resource.
    pub async fn write(&self, request: &WriteRequest) -> Result<(), ClientError> {
        let response = self
            .client
            .put(self.resource_url())
            .form(request)
            .send()
            .await?;

        if response.status() != StatusCode::NO_CONTENT && !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }

        Ok(())
    }

    /// Force the shutoff state.
    pub async fn stop(&self) -> Result<(), ClientError> {
        let response = self.client.delete(self.resource_url()).send().await?;

        if response.status() != StatusCode::NO_CONTENT && !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }

        Ok(())
    }

    /// Simulate holding the button for `held_seconds`.
    pub async fn press(&self, held_seconds: u64) -> Result<PressResult, ClientError> {
        let url = format!(
            "{}{}",
            self.base_url,
            self.resource.child_route("button")
        );

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "held_seconds": held_seconds }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))
    }
}
