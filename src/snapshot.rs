//! Last-synced operational status of the selected devices.
//!
//! Rebuilt wholesale from each listing; between listings only the power flag
//! is patched, and only after the provider confirmed the command.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::directory::SelectedDevice;
use crate::models::remo::{AirconSettings, Appliance, ApplianceId, OperationMode, TemperatureUnit};

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceStatus {
    pub is_on: bool,
    pub mode: OperationMode,
    pub temperature: Option<f64>,
    pub temperature_unit: TemperatureUnit,
}

impl DeviceStatus {
    pub fn from_settings(settings: &AirconSettings) -> Self {
        DeviceStatus {
            is_on: settings.is_on(),
            mode: settings.mode.unwrap_or(OperationMode::Unknown),
            temperature: settings.temperature(),
            temperature_unit: settings.temp_unit.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusSnapshot {
    entries: BTreeMap<ApplianceId, DeviceStatus>,
    synced_at: Option<DateTime<Utc>>,
}

impl StatusSnapshot {
    /// Status for each selected device the listing reports settings for.
    /// Devices missing from the listing, or without settings, stay unknown.
    pub fn from_appliances(appliances: &[Appliance], selection: &[SelectedDevice]) -> Self {
        let entries = selection
            .iter()
            .filter_map(|sel| {
                let found = appliances.iter().find(|a| a.id == sel.id)?;
                let settings = found.settings.as_ref()?;
                Some((sel.id.clone(), DeviceStatus::from_settings(settings)))
            })
            .collect();

        StatusSnapshot {
            entries,
            synced_at: Some(Utc::now()),
        }
    }

    pub fn get(&self, id: &ApplianceId) -> Option<&DeviceStatus> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn synced_at(&self) -> Option<DateTime<Utc>> {
        self.synced_at
    }

    /// Records a confirmed power change. Mode and temperature are left alone;
    /// an unknown device gets an entry carrying only the power flag.
    pub fn patch_power(&mut self, id: &ApplianceId, is_on: bool) {
        self.entries
            .entry(id.clone())
            .and_modify(|s| s.is_on = is_on)
            .or_insert(DeviceStatus {
                is_on,
                mode: OperationMode::Unknown,
                temperature: None,
                temperature_unit: TemperatureUnit::default(),
            });
    }
}
