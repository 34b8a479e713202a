//! Pure projection of `AppState` into what one screen shows, plus a
//! plain-text layout of it. Only the current view is ever projected.

use std::fmt::Write as _;

use crate::editor::EditingSession;
use crate::models::remo::{OperationMode, TemperatureUnit};
use crate::snapshot::DeviceStatus;
use crate::utils::format_decimal;
use crate::view::{AppState, Control, View};

#[derive(Debug, Clone, PartialEq)]
pub struct SelectRow {
    pub name: String,
    pub description: String,
    pub checked: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceCard {
    pub name: String,
    pub badge: &'static str,
    pub subtitle: String,
    pub busy: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetailPanel {
    pub title: String,
    pub modes: Vec<(OperationMode, bool)>,
    pub temp_value: String,
    pub temp_unit: &'static str,
    pub can_decrement: bool,
    pub can_increment: bool,
    pub error: Option<String>,
    pub applying: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    Loading,
    TokenEntry { error: Option<String>, connecting: bool },
    DeviceSelect { rows: Vec<SelectRow>, can_save: bool },
    Main { cards: Vec<DeviceCard>, synced_at: Option<String>, all_off_busy: bool },
    Detail(DetailPanel),
}

pub fn mode_label(mode: Option<OperationMode>) -> &'static str {
    match mode {
        Some(OperationMode::Auto) => "Auto",
        Some(OperationMode::Cool) => "Cool",
        Some(OperationMode::Warm) => "Heat",
        Some(OperationMode::Dry) => "Dry",
        Some(OperationMode::Blow) => "Fan",
        Some(OperationMode::Unknown) | None => "—",
    }
}

/// Unknown status renders as `?`, never as off.
pub fn status_badge(status: Option<&DeviceStatus>) -> &'static str {
    match status.map(|s| s.is_on) {
        Some(true) => "ON",
        Some(false) => "OFF",
        None => "?",
    }
}

fn temperature_text(temp: f64, mode: OperationMode, unit: TemperatureUnit) -> String {
    if mode == OperationMode::Auto {
        let sign = if temp > 0.0 { "+" } else { "" };
        format!("{}{}", sign, format_decimal(temp))
    } else {
        format!("{}{}", format_decimal(temp), unit.suffix())
    }
}

pub fn subtitle(status: Option<&DeviceStatus>) -> String {
    let Some(st) = status else {
        return "—".to_string();
    };
    let mut parts = Vec::new();
    if st.mode.is_selectable() {
        parts.push(mode_label(Some(st.mode)).to_string());
    }
    if let Some(t) = st.temperature {
        parts.push(temperature_text(t, st.mode, st.temperature_unit));
    }
    if parts.is_empty() {
        "—".to_string()
    } else {
        parts.join(" / ")
    }
}

fn detail_panel(state: &AppState, session: &EditingSession) -> DetailPanel {
    let status = state.snapshot.get(session.device_id());
    DetailPanel {
        title: format!("{} ({})", session.device_name(), mode_label(status.map(|s| s.mode))),
        modes: OperationMode::SELECTABLE
            .iter()
            .map(|m| (*m, *m == session.selected_mode()))
            .collect(),
        temp_value: session.display_temp(),
        temp_unit: session.unit_label(),
        can_decrement: session.can_decrement(),
        can_increment: session.can_increment(),
        error: state.detail_error.clone(),
        applying: state.is_busy(&Control::Apply(session.device_id().clone())),
    }
}

pub fn screen(state: &AppState) -> Screen {
    match &state.view {
        View::Loading => Screen::Loading,
        View::TokenEntry => Screen::TokenEntry {
            error: state.token_error.clone(),
            connecting: state.is_busy(&Control::Connect),
        },
        View::DeviceSelect => Screen::DeviceSelect {
            rows: state
                .directory
                .devices()
                .iter()
                .map(|d| SelectRow {
                    name: d.name.clone(),
                    description: d.description(),
                    checked: state.draft.is_checked(&d.id),
                })
                .collect(),
            can_save: state.draft.can_save(),
        },
        View::Main => Screen::Main {
            cards: state
                .selection
                .iter()
                .map(|sel| {
                    let status = state.snapshot.get(&sel.id);
                    DeviceCard {
                        name: sel.name.clone(),
                        badge: status_badge(status),
                        subtitle: subtitle(status),
                        busy: state.is_busy(&Control::Power(sel.id.clone())),
                    }
                })
                .collect(),
            synced_at: state
                .snapshot
                .synced_at()
                .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
            all_off_busy: state.is_busy(&Control::AllOff),
        },
        View::Detail(_) => match &state.session {
            Some(session) => Screen::Detail(detail_panel(state, session)),
            None => Screen::Loading,
        },
    }
}

fn flag(enabled: bool, text: &str) -> String {
    if enabled {
        format!("[{}]", text)
    } else {
        format!("({} disabled)", text)
    }
}

pub fn to_text(screen: &Screen) -> String {
    let mut out = String::new();
    match screen {
        Screen::Loading => out.push_str("Loading...\n"),
        Screen::TokenEntry { error, connecting } => {
            out.push_str("== Connect ==\nEnter your Nature Remo access token: connect <token>\n");
            if let Some(e) = error {
                let _ = writeln!(out, "! {}", e);
            }
            if *connecting {
                out.push_str("Connecting...\n");
            }
        }
        Screen::DeviceSelect { rows, can_save } => {
            out.push_str("== Select air conditioners ==\n");
            for (i, row) in rows.iter().enumerate() {
                let mark = if row.checked { "x" } else { " " };
                let _ = writeln!(out, "{:>2}. [{}] {}  {}", i + 1, mark, row.name, row.description);
            }
            let _ = writeln!(out, "toggle <n> | {} | back", flag(*can_save, "save"));
        }
        Screen::Main {
            cards,
            synced_at,
            all_off_busy,
        } => {
            out.push_str("== Air conditioners ==\n");
            for (i, card) in cards.iter().enumerate() {
                let busy = if card.busy { " ..." } else { "" };
                let _ = writeln!(out, "{:>2}. {:<16} {:<3} {}{}", i + 1, card.name, card.badge, card.subtitle, busy);
            }
            if let Some(t) = synced_at {
                let _ = writeln!(out, "Synced {}", t);
            }
            let _ = writeln!(
                out,
                "on <n> | off <n> | open <n> | {} | settings | disconnect",
                flag(!*all_off_busy, "alloff")
            );
        }
        Screen::Detail(panel) => {
            let _ = writeln!(out, "== {} ==", panel.title);
            let modes = panel
                .modes
                .iter()
                .map(|(m, active)| {
                    let label = mode_label(Some(*m));
                    if *active { format!("<{}>", label) } else { label.to_string() }
                })
                .collect::<Vec<_>>()
                .join(" ");
            let _ = writeln!(out, "Mode: {}", modes);
            let _ = writeln!(
                out,
                "Temperature: {}{}  {} {}",
                panel.temp_value,
                panel.temp_unit,
                flag(panel.can_decrement, "down"),
                flag(panel.can_increment, "up")
            );
            if let Some(e) = &panel.error {
                let _ = writeln!(out, "! {}", e);
            }
            let _ = writeln!(out, "mode <name> | temp <value> | {} | back", flag(!panel.applying, "apply"));
        }
    }
    out
}
