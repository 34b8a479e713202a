//! Appliance directory (every eligible air conditioner on the account) and
//! the operator's selection of devices to monitor.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::models::remo::{Appliance, ApplianceId};

/// Directory entry. Identity is fixed for the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: ApplianceId,
    pub name: String,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

impl From<&Appliance> for Device {
    fn from(a: &Appliance) -> Self {
        Device {
            id: a.id.clone(),
            name: a.nickname.clone(),
            manufacturer: a.model.as_ref().and_then(|m| m.manufacturer.clone()),
            model: a.model.as_ref().and_then(|m| m.name.clone()),
        }
    }
}

impl Device {
    /// "Manufacturer Model", either part omitted when unknown.
    pub fn description(&self) -> String {
        [self.manufacturer.as_deref(), self.model.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Selection entry; `name` is captured when the device is selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedDevice {
    pub id: ApplianceId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("select at least one device")]
    Empty,
    #[error("device {0} is not in the directory")]
    UnknownDevice(ApplianceId),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplianceDirectory {
    devices: Vec<Device>,
}

impl ApplianceDirectory {
    /// Keeps only air conditioners, in provider order.
    pub fn from_appliances(appliances: &[Appliance]) -> Self {
        ApplianceDirectory {
            devices: appliances.iter().filter(|a| a.is_aircon()).map(Device::from).collect(),
        }
    }

    pub fn from_devices(devices: Vec<Device>) -> Self {
        ApplianceDirectory { devices }
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn get(&self, id: &ApplianceId) -> Option<&Device> {
        self.devices.iter().find(|d| &d.id == id)
    }

    /// Builds a selection in directory order. Every id must be present.
    pub fn select(&self, ids: &BTreeSet<ApplianceId>) -> Result<Vec<SelectedDevice>, SelectionError> {
        if ids.is_empty() {
            return Err(SelectionError::Empty);
        }
        if let Some(missing) = ids.iter().find(|id| self.get(id).is_none()) {
            return Err(SelectionError::UnknownDevice(missing.clone()));
        }

        Ok(self
            .devices
            .iter()
            .filter(|d| ids.contains(&d.id))
            .map(|d| SelectedDevice {
                id: d.id.clone(),
                name: d.name.clone(),
            })
            .collect())
    }
}

/// Checkbox state of the device selection screen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionDraft {
    checked: BTreeSet<ApplianceId>,
}

impl SelectionDraft {
    /// Pre-checks previously selected devices that are still in the directory.
    pub fn restore(directory: &ApplianceDirectory, previous: &[SelectedDevice]) -> Self {
        SelectionDraft {
            checked: previous
                .iter()
                .filter(|s| directory.get(&s.id).is_some())
                .map(|s| s.id.clone())
                .collect(),
        }
    }

    pub fn toggle(&mut self, id: &ApplianceId) {
        if !self.checked.remove(id) {
            self.checked.insert(id.clone());
        }
    }

    pub fn is_checked(&self, id: &ApplianceId) -> bool {
        self.checked.contains(id)
    }

    pub fn can_save(&self) -> bool {
        !self.checked.is_empty()
    }

    pub fn checked(&self) -> &BTreeSet<ApplianceId> {
        &self.checked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::fixture;

    fn id(s: &str) -> ApplianceId {
        ApplianceId(s.to_string())
    }

    #[test]
    fn keeps_only_aircons() {
        let dir = ApplianceDirectory::from_appliances(&fixture());
        let ids: Vec<_> = dir.devices().iter().map(|d| d.id.0.as_str()).collect();
        assert_eq!(ids, vec!["ac-living-0001", "ac-bedroom-0003"]);
        assert_eq!(dir.devices()[0].description(), "Daikin Daikin AC 001");
    }

    #[test]
    fn selection_follows_directory_order() {
        let dir = ApplianceDirectory::from_appliances(&fixture());
        let ids: BTreeSet<_> = [id("ac-bedroom-0003"), id("ac-living-0001")].into_iter().collect();
        let sel = dir.select(&ids).unwrap();
        assert_eq!(sel[0].name, "Living");
        assert_eq!(sel[1].name, "Bedroom");
    }

    #[test]
    fn selection_rejects_unknown_and_empty() {
        let dir = ApplianceDirectory::from_appliances(&fixture());
        assert_eq!(dir.select(&BTreeSet::new()), Err(SelectionError::Empty));

        let ids: BTreeSet<_> = [id("tv-0002")].into_iter().collect();
        assert_eq!(dir.select(&ids), Err(SelectionError::UnknownDevice(id("tv-0002"))));
    }

    #[test]
    fn draft_restores_only_known_ids() {
        let dir = ApplianceDirectory::from_appliances(&fixture());
        let previous = vec![
            SelectedDevice { id: id("ac-living-0001"), name: "Living".into() },
            SelectedDevice { id: id("gone"), name: "Gone".into() },
        ];
        let mut draft = SelectionDraft::restore(&dir, &previous);
        assert!(draft.is_checked(&id("ac-living-0001")));
        assert!(!draft.is_checked(&id("gone")));
        assert!(draft.can_save());

        draft.toggle(&id("ac-living-0001"));
        assert!(!draft.can_save());
    }
}
