//! Single-device commands: one `aircon_settings` round trip per call.

use log::debug;

use crate::client::{ApplianceApi, RemoClientError};
use crate::models::remo::{AirconSettings, ApplianceId, OperationMode, BUTTON_POWER_OFF};
use crate::utils::serde_enum_name;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Power {
    On,
    Off,
}

/// Partial update; omitted fields are left untouched by the provider.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParameterUpdate {
    pub power: Option<Power>,
    pub mode: Option<OperationMode>,
    pub temperature: Option<f64>,
}

impl ParameterUpdate {
    pub fn power_off() -> Self {
        ParameterUpdate {
            power: Some(Power::Off),
            ..Default::default()
        }
    }

    pub fn power_on() -> Self {
        ParameterUpdate {
            power: Some(Power::On),
            ..Default::default()
        }
    }

    /// Power on bundled with the mode and (optionally) temperature being applied.
    pub fn apply(mode: OperationMode, temperature: Option<f64>) -> Self {
        ParameterUpdate {
            power: Some(Power::On),
            mode: Some(mode),
            temperature,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.power.is_none() && self.mode.is_none() && self.temperature.is_none()
    }

    pub fn validate(&self) -> Result<(), CommandError> {
        if self.is_empty() {
            return Err(CommandError::ValidationFailed("update carries no fields".into()));
        }
        if self.power == Some(Power::Off) && (self.mode.is_some() || self.temperature.is_some()) {
            return Err(CommandError::ValidationFailed(
                "power-off cannot carry mode or temperature".into(),
            ));
        }
        if let Some(mode) = self.mode
            && !mode.is_selectable()
        {
            return Err(CommandError::ValidationFailed("mode is unknown".into()));
        }
        Ok(())
    }

    /// Form fields in wire order; absent values are omitted, never sent empty.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::with_capacity(3);
        match self.power {
            Some(Power::On) => fields.push(("button", String::new())),
            Some(Power::Off) => fields.push(("button", BUTTON_POWER_OFF.to_string())),
            None => {}
        }
        if let Some(mode) = self.mode.as_ref().and_then(serde_enum_name) {
            fields.push(("operation_mode", mode));
        }
        if let Some(t) = self.temperature {
            fields.push(("temperature", t.to_string()));
        }
        fields
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("access token is invalid or expired")]
    Unauthorized,
    #[error("request failed with status {0}")]
    RequestFailed(u16),
    #[error("invalid command: {0}")]
    ValidationFailed(String),
    #[error("network error: {0}")]
    Transport(String),
}

impl From<RemoClientError> for CommandError {
    fn from(value: RemoClientError) -> Self {
        match value {
            RemoClientError::Unauthorized => CommandError::Unauthorized,
            RemoClientError::RequestFailed { status, .. } => CommandError::RequestFailed(status),
            RemoClientError::Transport(s) => CommandError::Transport(s),
            RemoClientError::Json(s) => CommandError::Transport(format!("unreadable response: {}", s)),
        }
    }
}

pub fn set_parameters<A: ApplianceApi + ?Sized>(
    api: &A,
    token: &str,
    appliance_id: &ApplianceId,
    update: &ParameterUpdate,
) -> Result<AirconSettings, CommandError> {
    update.validate()?;
    let fields = update.form_fields();
    debug!(
        "Dispatch: {} <- {}",
        appliance_id,
        fields.iter().map(|(k, v)| format!("{}={:?}", k, v)).collect::<Vec<_>>().join(", ")
    );
    Ok(api.set_aircon_settings(token, appliance_id, &fields)?)
}
