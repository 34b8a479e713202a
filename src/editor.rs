//! Mode and temperature editing for one device while its detail screen is open.
//!
//! Auto mode takes a relative offset, every other mode an absolute setpoint.
//! Both values are remembered side by side so switching modes back and forth
//! never loses either one.

use crate::directory::SelectedDevice;
use crate::dispatcher::ParameterUpdate;
use crate::models::remo::{ApplianceId, OperationMode, TemperatureUnit};
use crate::snapshot::DeviceStatus;
use crate::utils::{format_decimal, round_tenth};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TempDomain {
    pub min: f64,
    pub max: f64,
    pub step: f64,
    /// Seed used when stepping from an empty value.
    pub default: f64,
}

pub const AUTO_DOMAIN: TempDomain = TempDomain {
    min: -5.0,
    max: 5.0,
    step: 1.0,
    default: 0.0,
};

pub const CELSIUS_DOMAIN: TempDomain = TempDomain {
    min: 16.0,
    max: 30.0,
    step: 0.5,
    default: 24.0,
};

pub const FAHRENHEIT_DOMAIN: TempDomain = TempDomain {
    min: 60.0,
    max: 86.0,
    step: 0.5,
    default: 72.0,
};

impl TempDomain {
    pub fn for_mode(mode: OperationMode, unit: TemperatureUnit) -> Self {
        match mode {
            OperationMode::Auto => AUTO_DOMAIN,
            _ => Self::absolute(unit),
        }
    }

    pub fn absolute(unit: TemperatureUnit) -> Self {
        match unit {
            TemperatureUnit::Celsius => CELSIUS_DOMAIN,
            TemperatureUnit::Fahrenheit => FAHRENHEIT_DOMAIN,
        }
    }

    /// Clamp into bounds, snapping to the nearest step.
    pub fn normalize(&self, value: f64) -> f64 {
        let snapped = round_tenth((value / self.step).round() * self.step);
        snapped.clamp(self.min, self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn on_step(&self, value: f64) -> bool {
        let steps = (value - self.min) / self.step;
        (steps - steps.round()).abs() < 1e-9
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TempSlots {
    pub auto: Option<f64>,
    pub absolute: Option<f64>,
}

impl TempSlots {
    fn get(&self, mode: OperationMode) -> Option<f64> {
        match mode {
            OperationMode::Auto => self.auto,
            _ => self.absolute,
        }
    }

    fn set(&mut self, mode: OperationMode, value: f64) {
        match mode {
            OperationMode::Auto => self.auto = Some(value),
            _ => self.absolute = Some(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditError {
    #[error("mode cannot be selected: {0:?}")]
    UnselectableMode(OperationMode),
    #[error("not a number: {0:?}")]
    NotANumber(String),
    #[error("{value} is outside {min}..{max}")]
    OutOfRange { value: f64, min: f64, max: f64 },
    #[error("{value} is not a multiple of {step}")]
    OffStep { value: f64, step: f64 },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditingSession {
    device_id: ApplianceId,
    device_name: String,
    selected_mode: OperationMode,
    unit: TemperatureUnit,
    slots: TempSlots,
}

impl EditingSession {
    /// Seeds mode, unit and the matching temperature slot from the last
    /// known status. Unknown status opens in auto mode with both slots empty.
    pub fn open(device: &SelectedDevice, status: Option<&DeviceStatus>) -> Self {
        let selected_mode = status
            .map(|s| s.mode)
            .filter(|m| m.is_selectable())
            .unwrap_or(OperationMode::Auto);
        let unit = status.map(|s| s.temperature_unit).unwrap_or_default();

        let mut slots = TempSlots::default();
        if let Some(st) = status
            && let Some(t) = st.temperature.filter(|t| t.is_finite())
        {
            if st.mode == OperationMode::Auto {
                slots.auto = Some(AUTO_DOMAIN.normalize(t));
            } else {
                slots.absolute = Some(TempDomain::absolute(unit).normalize(t));
            }
        }

        EditingSession {
            device_id: device.id.clone(),
            device_name: device.name.clone(),
            selected_mode,
            unit,
            slots,
        }
    }

    pub fn device_id(&self) -> &ApplianceId {
        &self.device_id
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn selected_mode(&self) -> OperationMode {
        self.selected_mode
    }

    pub fn unit(&self) -> TemperatureUnit {
        self.unit
    }

    pub fn slots(&self) -> &TempSlots {
        &self.slots
    }

    pub fn domain(&self) -> TempDomain {
        TempDomain::for_mode(self.selected_mode, self.unit)
    }

    pub fn active_temp(&self) -> Option<f64> {
        self.slots.get(self.selected_mode)
    }

    pub fn select_mode(&mut self, mode: OperationMode) -> Result<(), EditError> {
        if !mode.is_selectable() {
            return Err(EditError::UnselectableMode(mode));
        }
        self.selected_mode = mode;
        Ok(())
    }

    pub fn increment_temp(&mut self) {
        self.step(Direction::Up);
    }

    pub fn decrement_temp(&mut self) {
        self.step(Direction::Down);
    }

    fn step(&mut self, direction: Direction) {
        let domain = self.domain();
        let next = match (self.active_temp(), direction) {
            (None, _) => domain.default,
            (Some(t), Direction::Up) if t < domain.max => round_tenth(t + domain.step).min(domain.max),
            (Some(t), Direction::Down) if t > domain.min => round_tenth(t - domain.step).max(domain.min),
            (Some(t), _) => t,
        };
        self.slots.set(self.selected_mode, next);
    }

    /// The up control is disabled exactly when the active value sits on the maximum.
    pub fn can_increment(&self) -> bool {
        self.active_temp().is_none_or(|t| t < self.domain().max)
    }

    pub fn can_decrement(&self) -> bool {
        self.active_temp().is_none_or(|t| t > self.domain().min)
    }

    /// Free-text entry; the value must lie in the active domain on a step boundary.
    pub fn enter_temp(&mut self, text: &str) -> Result<f64, EditError> {
        let trimmed = text.trim();
        let value: f64 = trimmed
            .parse()
            .ok()
            .filter(|v: &f64| v.is_finite())
            .ok_or_else(|| EditError::NotANumber(trimmed.to_string()))?;

        let domain = self.domain();
        if !domain.contains(value) {
            return Err(EditError::OutOfRange {
                value,
                min: domain.min,
                max: domain.max,
            });
        }
        if !domain.on_step(value) {
            return Err(EditError::OffStep {
                value,
                step: domain.step,
            });
        }

        let value = round_tenth(value);
        self.slots.set(self.selected_mode, value);
        Ok(value)
    }

    /// "+2", "0", "-3" in auto mode; "24", "24.5" otherwise; "--" when unset.
    pub fn display_temp(&self) -> String {
        match (self.active_temp(), self.selected_mode) {
            (None, _) => "--".to_string(),
            (Some(t), OperationMode::Auto) => {
                let sign = if t > 0.0 { "+" } else { "" };
                format!("{}{:.0}", sign, t)
            }
            (Some(t), _) => format_decimal(t),
        }
    }

    pub fn unit_label(&self) -> &'static str {
        match self.selected_mode {
            OperationMode::Auto => "",
            _ => self.unit.suffix(),
        }
    }

    pub fn build_command_payload(&self) -> ParameterUpdate {
        ParameterUpdate::apply(self.selected_mode, self.active_temp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::Power;

    fn device() -> SelectedDevice {
        SelectedDevice {
            id: ApplianceId("ac-1".into()),
            name: "Living".into(),
        }
    }

    fn status(mode: OperationMode, temp: Option<f64>, unit: TemperatureUnit) -> DeviceStatus {
        DeviceStatus {
            is_on: true,
            mode,
            temperature: temp,
            temperature_unit: unit,
        }
    }

    #[test]
    fn unknown_status_opens_in_auto_with_empty_slots() {
        let s = EditingSession::open(&device(), None);
        assert_eq!(s.selected_mode(), OperationMode::Auto);
        assert_eq!(s.unit(), TemperatureUnit::Celsius);
        assert_eq!(s.slots(), &TempSlots::default());
        assert_eq!(s.display_temp(), "--");

        let unknown = status(OperationMode::Unknown, Some(25.0), TemperatureUnit::Celsius);
        let s = EditingSession::open(&device(), Some(&unknown));
        assert_eq!(s.selected_mode(), OperationMode::Auto);
        assert_eq!(s.slots().absolute, Some(25.0));
        assert_eq!(s.active_temp(), None);
    }

    #[test]
    fn steps_stay_within_bounds_for_every_mode_and_unit() {
        for unit in [TemperatureUnit::Celsius, TemperatureUnit::Fahrenheit] {
            for mode in OperationMode::SELECTABLE {
                let mut s = EditingSession::open(&device(), Some(&status(mode, None, unit)));
                let domain = s.domain();
                for _ in 0..80 {
                    s.increment_temp();
                    let t = s.active_temp().unwrap();
                    assert!(t >= domain.min && t <= domain.max, "{mode:?}/{unit:?}: {t}");
                }
                assert_eq!(s.active_temp(), Some(domain.max));
                assert!(!s.can_increment());
                for _ in 0..80 {
                    s.decrement_temp();
                    let t = s.active_temp().unwrap();
                    assert!(t >= domain.min && t <= domain.max, "{mode:?}/{unit:?}: {t}");
                }
                assert_eq!(s.active_temp(), Some(domain.min));
                assert!(!s.can_decrement());
            }
        }
    }

    #[test]
    fn empty_slot_seeds_default_instead_of_stepping() {
        let mut s = EditingSession::open(&device(), None);
        s.decrement_temp();
        assert_eq!(s.active_temp(), Some(0.0));

        s.select_mode(OperationMode::Cool).unwrap();
        s.increment_temp();
        assert_eq!(s.active_temp(), Some(24.0));

        let f = status(OperationMode::Warm, None, TemperatureUnit::Fahrenheit);
        let mut s = EditingSession::open(&device(), Some(&f));
        s.increment_temp();
        assert_eq!(s.active_temp(), Some(72.0));
        assert_eq!(s.unit_label(), "°F");
    }

    #[test]
    fn celsius_max_is_a_noop_and_disables_up() {
        let st = status(OperationMode::Cool, Some(30.0), TemperatureUnit::Celsius);
        let mut s = EditingSession::open(&device(), Some(&st));
        assert!(!s.can_increment());
        s.increment_temp();
        assert_eq!(s.active_temp(), Some(30.0));
        assert!(s.can_decrement());
        s.decrement_temp();
        assert_eq!(s.active_temp(), Some(29.5));
    }

    #[test]
    fn switching_modes_preserves_both_slots() {
        let st = status(OperationMode::Cool, Some(26.0), TemperatureUnit::Celsius);
        let mut s = EditingSession::open(&device(), Some(&st));
        s.increment_temp();
        assert_eq!(s.active_temp(), Some(26.5));

        s.select_mode(OperationMode::Auto).unwrap();
        assert_eq!(s.active_temp(), None);
        s.increment_temp();
        s.increment_temp();
        assert_eq!(s.active_temp(), Some(1.0));

        s.select_mode(OperationMode::Dry).unwrap();
        assert_eq!(s.active_temp(), Some(26.5));
        s.select_mode(OperationMode::Auto).unwrap();
        assert_eq!(s.active_temp(), Some(1.0));
        assert_eq!(s.slots(), &TempSlots {
            auto: Some(1.0),
            absolute: Some(26.5)
        });
    }

    #[test]
    fn half_steps_never_drift() {
        let st = status(OperationMode::Warm, Some(16.0), TemperatureUnit::Celsius);
        let mut s = EditingSession::open(&device(), Some(&st));
        for _ in 0..7 {
            s.increment_temp();
        }
        assert_eq!(s.display_temp(), "19.5");
        assert_eq!(s.build_command_payload().temperature, Some(19.5));
    }

    #[test]
    fn non_finite_server_temperature_is_ignored() {
        let settings: crate::models::remo::AirconSettings =
            serde_json::from_str(r#"{"temp":"NaN","temp_unit":"c","mode":"cool"}"#).unwrap();
        let mut s = EditingSession::open(&device(), Some(&DeviceStatus::from_settings(&settings)));
        assert_eq!(s.active_temp(), None);
        assert!(s.can_increment());

        let st = status(OperationMode::Cool, Some(f64::INFINITY), TemperatureUnit::Celsius);
        let mut direct = EditingSession::open(&device(), Some(&st));
        assert_eq!(direct.active_temp(), None);

        s.increment_temp();
        direct.decrement_temp();
        assert_eq!(s.active_temp(), Some(24.0));
        assert_eq!(direct.active_temp(), Some(24.0));
        assert_eq!(s.build_command_payload().temperature, Some(24.0));
    }

    #[test]
    fn display_formats() {
        let st = status(OperationMode::Auto, Some(2.0), TemperatureUnit::Celsius);
        let mut s = EditingSession::open(&device(), Some(&st));
        assert_eq!(s.display_temp(), "+2");
        assert_eq!(s.unit_label(), "");
        for _ in 0..5 {
            s.decrement_temp();
        }
        assert_eq!(s.display_temp(), "-3");
        s.increment_temp();
        s.increment_temp();
        s.increment_temp();
        assert_eq!(s.display_temp(), "0");

        s.select_mode(OperationMode::Cool).unwrap();
        s.increment_temp();
        assert_eq!(s.display_temp(), "24");
        assert_eq!(s.unit_label(), "°C");
    }

    #[test]
    fn payload_always_powers_on_and_omits_absent_temperature() {
        let mut s = EditingSession::open(&device(), None);
        let p = s.build_command_payload();
        assert_eq!(p.power, Some(Power::On));
        assert_eq!(p.mode, Some(OperationMode::Auto));
        assert_eq!(p.temperature, None);

        s.select_mode(OperationMode::Blow).unwrap();
        s.increment_temp();
        let p = s.build_command_payload();
        assert_eq!(p.mode, Some(OperationMode::Blow));
        assert_eq!(p.temperature, Some(24.0));
    }

    #[test]
    fn auto_round_trip_sends_server_value() {
        let st = status(OperationMode::Auto, Some(2.0), TemperatureUnit::Celsius);
        let s = EditingSession::open(&device(), Some(&st));
        let fields = s.build_command_payload().form_fields();
        assert!(fields.contains(&("temperature", "2".to_string())));
        assert!(fields.contains(&("operation_mode", "auto".to_string())));
    }

    #[test]
    fn free_text_entry_is_validated() {
        let st = status(OperationMode::Cool, Some(25.0), TemperatureUnit::Celsius);
        let mut s = EditingSession::open(&device(), Some(&st));

        assert!(matches!(s.enter_temp("warm"), Err(EditError::NotANumber(_))));
        assert!(matches!(s.enter_temp("31"), Err(EditError::OutOfRange { .. })));
        assert!(matches!(s.enter_temp("24.3"), Err(EditError::OffStep { .. })));
        assert_eq!(s.active_temp(), Some(25.0));

        assert_eq!(s.enter_temp(" 22.5 "), Ok(22.5));
        assert_eq!(s.active_temp(), Some(22.5));
        assert!(s.select_mode(OperationMode::Unknown).is_err());
        assert_eq!(s.selected_mode(), OperationMode::Cool);
    }

    #[test]
    fn out_of_range_server_value_is_clamped_on_open() {
        let st = status(OperationMode::Cool, Some(31.0), TemperatureUnit::Celsius);
        let s = EditingSession::open(&device(), Some(&st));
        assert_eq!(s.active_temp(), Some(30.0));
    }
}
