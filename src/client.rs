//! Blocking HTTP client for the Nature Remo cloud API (appliance subset).
//!
//! - Blocking client using `ureq` (no async), one round trip per call, no retries.
//! - Bearer token is passed per call; the client itself holds no credentials.
//! - `ApplianceApi` is the seam the rest of the crate talks to, so a scripted
//!   fake can stand in for the network in tests.

use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::models::remo::{AirconSettings, Appliance, ApplianceId};

pub const DEFAULT_BASE_URL: &str = "https://api.nature.global/1";

#[derive(Debug, thiserror::Error)]
pub enum RemoClientError {
    #[error("access token is invalid or expired")]
    Unauthorized,
    #[error("http {status}: {message}")]
    RequestFailed { status: u16, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("json error: {0}")]
    Json(String),
}

impl RemoClientError {
    /// Maps a non-success status to the provider error taxonomy.
    pub fn from_status(status: u16, message: String) -> Self {
        if status == 401 {
            RemoClientError::Unauthorized
        } else {
            RemoClientError::RequestFailed { status, message }
        }
    }
}

impl From<ureq::Error> for RemoClientError {
    fn from(value: ureq::Error) -> Self {
        match value {
            ureq::Error::StatusCode(status) => RemoClientError::from_status(status, String::new()),
            other => RemoClientError::Transport(other.to_string()),
        }
    }
}

/// Calls the panel issues against the provider.
pub trait ApplianceApi {
    /// `GET /appliances`: every appliance on the account, unfiltered.
    fn list_appliances(&self, token: &str) -> Result<Vec<Appliance>, RemoClientError>;

    /// `POST /appliances/{id}/aircon_settings` with form-encoded fields.
    fn set_aircon_settings(
        &self,
        token: &str,
        appliance_id: &ApplianceId,
        fields: &[(&'static str, String)],
    ) -> Result<AirconSettings, RemoClientError>;
}

pub struct RemoClient {
    agent: ureq::Agent,
    base_url: String,
}

impl RemoClient {
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Self {
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build();
        let base_url = base_url.into().trim_end_matches('/').to_string();

        RemoClient {
            agent: config.into(),
            base_url,
        }
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn decode<T: DeserializeOwned>(
        mut res: http::Response<ureq::Body>,
    ) -> Result<T, RemoClientError> {
        let status = res.status();
        let body = res
            .body_mut()
            .read_to_string()
            .map_err(|e| RemoClientError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(RemoClientError::from_status(status.as_u16(), body));
        }

        let de = &mut serde_json::Deserializer::from_str(&body);
        serde_path_to_error::deserialize(de).map_err(|e| RemoClientError::Json(e.to_string()))
    }
}

impl ApplianceApi for RemoClient {
    fn list_appliances(&self, token: &str) -> Result<Vec<Appliance>, RemoClientError> {
        let res = self
            .agent
            .get(&self.url("/appliances"))
            .header("Accept", "application/json")
            .header("Authorization", format!("Bearer {}", token))
            .call()?;
        Self::decode(res)
    }

    fn set_aircon_settings(
        &self,
        token: &str,
        appliance_id: &ApplianceId,
        fields: &[(&'static str, String)],
    ) -> Result<AirconSettings, RemoClientError> {
        let url = self.url(&format!("/appliances/{}/aircon_settings", appliance_id.0));
        let res = self
            .agent
            .post(&url)
            .header("Accept", "application/json")
            .header("Authorization", format!("Bearer {}", token))
            .send_form(fields.iter().map(|(k, v)| (*k, v.as_str())))?;
        Self::decode(res)
    }
}
