//! Models for the subset of the Nature Remo cloud API used by the panel.
//!
//! Notes
//! - Only fields the panel reads are modeled; unknown fields are ignored on decode.
//! - `AirconSettings` doubles as the response body of the settings endpoint.

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Appliance `type` value the panel controls.
pub const AIRCON_TYPE: &str = "AC";

/// `settings.button` value reported (and sent) for a powered-off unit.
pub const BUTTON_POWER_OFF: &str = "power-off";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplianceId(pub String);

impl std::fmt::Display for ApplianceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OperationMode {
    #[default]
    Auto,
    Cool,
    Warm,
    Dry,
    Blow,
    #[serde(other)]
    Unknown,
}

impl OperationMode {
    /// Modes an operator can pick on the detail screen, in display order.
    pub const SELECTABLE: [OperationMode; 5] = [
        OperationMode::Auto,
        OperationMode::Cool,
        OperationMode::Warm,
        OperationMode::Dry,
        OperationMode::Blow,
    ];

    pub fn is_selectable(self) -> bool {
        !matches!(self, OperationMode::Unknown)
    }
}

impl std::str::FromStr for OperationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(OperationMode::Auto),
            "cool" => Ok(OperationMode::Cool),
            "warm" => Ok(OperationMode::Warm),
            "dry" => Ok(OperationMode::Dry),
            "blow" => Ok(OperationMode::Blow),
            other => Err(format!("unknown mode: {}", other)),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum TemperatureUnit {
    // c
    #[default]
    Celsius,
    // f
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn wire_name(self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "c",
            TemperatureUnit::Fahrenheit => "f",
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
        }
    }
}

impl Serialize for TemperatureUnit {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.wire_name())
    }
}

impl<'de> Deserialize<'de> for TemperatureUnit {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // The API reports "" for units that never had a temperature set.
        let raw = String::deserialize(deserializer)?;
        match raw.as_str() {
            "" | "c" | "C" => Ok(TemperatureUnit::Celsius),
            "f" | "F" => Ok(TemperatureUnit::Fahrenheit),
            other => {
                warn!("Unrecognised temp_unit {:?}, assuming Celsius", other);
                Ok(TemperatureUnit::default())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ApplianceModel {
    pub id: Option<String>,
    pub manufacturer: Option<String>,
    pub name: Option<String>,
    pub remote_name: Option<String>,
    pub series: Option<String>,
}

/// Last settings the cloud holds for an air conditioner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AirconSettings {
    /// String-encoded decimal; empty when no temperature applies.
    pub temp: Option<String>,
    pub temp_unit: Option<TemperatureUnit>,
    pub mode: Option<OperationMode>,
    pub vol: Option<String>,
    pub dir: Option<String>,
    pub button: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl AirconSettings {
    pub fn is_on(&self) -> bool {
        self.button.as_deref() != Some(BUTTON_POWER_OFF)
    }

    pub fn temperature(&self) -> Option<f64> {
        self.temp
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|v| v.is_finite())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appliance {
    pub id: ApplianceId,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub r#type: String,
    #[serde(default)]
    pub model: Option<ApplianceModel>,
    #[serde(default)]
    pub settings: Option<AirconSettings>,
}

impl Appliance {
    pub fn is_aircon(&self) -> bool {
        self.r#type == AIRCON_TYPE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_fixture() -> Vec<Appliance> {
        let json = std::fs::read_to_string("tests/data/appliances.json").expect("fixture present");
        serde_json::from_str(&json).expect("parse appliances")
    }

    #[test]
    fn decodes_fixture_listing() {
        let appliances = load_fixture();
        assert_eq!(appliances.len(), 3);
        assert_eq!(appliances.iter().filter(|a| a.is_aircon()).count(), 2);

        let living = &appliances[0];
        assert_eq!(living.nickname, "Living");
        let settings = living.settings.as_ref().expect("living has settings");
        assert!(settings.is_on());
        assert_eq!(settings.mode, Some(OperationMode::Cool));
        assert_eq!(settings.temperature(), Some(26.0));
        assert_eq!(settings.temp_unit, Some(TemperatureUnit::Celsius));
        assert_eq!(
            living.model.as_ref().and_then(|m| m.manufacturer.as_deref()),
            Some("Daikin")
        );
    }

    #[test]
    fn power_off_button_and_empty_temp() {
        let settings: AirconSettings =
            serde_json::from_str(r#"{"temp":"","temp_unit":"","mode":"blow","button":"power-off"}"#).unwrap();
        assert!(!settings.is_on());
        assert_eq!(settings.temperature(), None);
        assert_eq!(settings.temp_unit, Some(TemperatureUnit::Celsius));
    }

    #[test]
    fn unrecognised_mode_is_unknown() {
        let settings: AirconSettings = serde_json::from_str(r#"{"mode":"turbo"}"#).unwrap();
        assert_eq!(settings.mode, Some(OperationMode::Unknown));
        assert!(!OperationMode::Unknown.is_selectable());
    }

    #[test]
    fn unknown_unit_falls_back_to_celsius() {
        let settings: AirconSettings = serde_json::from_str(r#"{"temp":"22","temp_unit":"k"}"#).unwrap();
        assert_eq!(settings.temp_unit, Some(TemperatureUnit::Celsius));
        assert_eq!(settings.temperature(), Some(22.0));
    }

    #[test]
    fn one_odd_unit_does_not_sink_the_listing() {
        let json = r#"[
            {"id":"a","nickname":"A","type":"AC","settings":{"temp":"25","temp_unit":"kelvin","mode":"cool"}},
            {"id":"b","nickname":"B","type":"AC","settings":{"temp":"24","temp_unit":"c","mode":"warm"}}
        ]"#;
        let appliances: Vec<Appliance> = serde_json::from_str(json).unwrap();
        assert_eq!(appliances.len(), 2);
    }

    #[test]
    fn non_finite_temperature_is_absent() {
        for raw in ["NaN", "inf", "-infinity"] {
            let json = format!(r#"{{"temp":"{}","temp_unit":"c","mode":"cool"}}"#, raw);
            let settings: AirconSettings = serde_json::from_str(&json).unwrap();
            assert_eq!(settings.temperature(), None, "temp {:?}", raw);
        }
    }

    #[test]
    fn parses_mode_names() {
        assert_eq!("Warm".parse::<OperationMode>(), Ok(OperationMode::Warm));
        assert!("unknown".parse::<OperationMode>().is_err());
    }
}
