use serde::Serialize;

/// Serialize a serde-backed enum into its string name (e.g. lowercase wire name).
pub fn serde_enum_name<T: Serialize>(val: &T) -> Option<String> {
    serde_json::to_value(val).ok()?.as_str().map(|s| s.to_string())
}

/// Round to one decimal place, normalising `-0.0` to `0.0`.
pub fn round_tenth(value: f64) -> f64 {
    let rounded = (value * 10.0).round() / 10.0;
    if rounded == 0.0 { 0.0 } else { rounded }
}

/// Integer when whole, otherwise one decimal ("24", "24.5").
pub fn format_decimal(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.1}", value)
    }
}
