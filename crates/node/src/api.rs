use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::config::NodeConfig;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never completed: connect failure, timeout, bad body.
    #[error("hub transport: {0}")]
    Transport(#[from] reqwest::Error),
    /// The hub answered with a non-success status.
    #[error("{endpoint} returned {status}")]
    Status {
        endpoint: &'static str,
        status: StatusCode,
    },
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// One sensor push. Unknown fields are omitted from the JSON body entirely,
/// which the hub reads as "this reading is unknown".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SensorUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub light_intensity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence: Option<bool>,
}

/// The hub's authoritative actuator record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DeviceStates {
    pub led: bool,
    pub fan: bool,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP client for the hub's JSON boundary. Every call carries the
/// configured connect and whole-request timeouts, so no hub outage can
/// stall a sync cycle indefinitely.
pub struct HubClient {
    http: reqwest::Client,
    base: String,
}

impl HubClient {
    pub fn new(cfg: &NodeConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .connect_timeout(cfg.connect_timeout)
            .timeout(cfg.request_timeout)
            .build()?;

        Ok(Self {
            http,
            base: cfg.hub_url.clone(),
        })
    }

    /// Reachability probe against the hub root.
    pub async fn ping(&self) -> Result<(), ApiError> {
        let response = self.http.get(&self.base).send().await?;
        check("/", response.status())
    }

    /// Push the latest readings.
    pub async fn update_sensors(&self, update: &SensorUpdate) -> Result<(), ApiError> {
        let response = self
            .http
            .post(format!("{}/api/update_sensors", self.base))
            .json(update)
            .send()
            .await?;
        check("/api/update_sensors", response.status())
    }

    /// Pull the authoritative actuator record.
    pub async fn devices(&self) -> Result<DeviceStates, ApiError> {
        let response = self
            .http
            .get(format!("{}/api/devices", self.base))
            .send()
            .await?;
        check("/api/devices", response.status())?;
        Ok(response.json().await?)
    }

    /// Tell the hub the fan was toggled locally.
    pub async fn set_fan(&self, on: bool) -> Result<(), ApiError> {
        let response = self
            .http
            .post(format!("{}/api/fan", self.base))
            .json(&serde_json::json!({ "state": on }))
            .send()
            .await?;
        check("/api/fan", response.status())
    }
}

fn check(endpoint: &'static str, status: StatusCode) -> Result<(), ApiError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(ApiError::Status { endpoint, status })
    }
}

// ===========================================================================
// Tests
// ===========================================================================
