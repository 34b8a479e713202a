//! Line-oriented front end: prints the current screen, reads one command per
//! line and forwards it to the controller as an operator intent.

use log::debug;
use std::io::{self, BufRead, Write};

use crate::client::ApplianceApi;
use crate::dispatcher::Power;
use crate::models::remo::{ApplianceId, OperationMode};
use crate::render;
use crate::store::KeyValueStore;
use crate::view::{Controller, NoticeKind, View};

#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Connect(String),
    Toggle(usize),
    Save,
    Back,
    Settings,
    Open(usize),
    Power(usize, Power),
    AllOff,
    Mode(OperationMode),
    Up,
    Down,
    Temp(String),
    Apply,
    Disconnect,
    Help,
    Quit,
}

fn index(arg: Option<&str>) -> Result<usize, String> {
    let raw = arg.ok_or_else(|| "missing device number".to_string())?;
    match raw.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(format!("not a device number: {}", raw)),
    }
}

impl std::str::FromStr for Intent {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let cmd = parts.next().ok_or_else(|| "empty command".to_string())?;
        let arg = parts.next();
        let intent = match cmd.to_ascii_lowercase().as_str() {
            "connect" => Intent::Connect(arg.ok_or_else(|| "connect requires a token".to_string())?.to_string()),
            "toggle" | "t" => Intent::Toggle(index(arg)?),
            "save" => Intent::Save,
            "back" | "b" => Intent::Back,
            "settings" => Intent::Settings,
            "open" => Intent::Open(index(arg)?),
            "on" => Intent::Power(index(arg)?, Power::On),
            "off" => Intent::Power(index(arg)?, Power::Off),
            "alloff" => Intent::AllOff,
            "mode" => Intent::Mode(arg.ok_or_else(|| "mode requires a name".to_string())?.parse::<OperationMode>()?),
            "up" | "+" => Intent::Up,
            "down" | "-" => Intent::Down,
            "temp" => Intent::Temp(arg.ok_or_else(|| "temp requires a value".to_string())?.to_string()),
            "apply" => Intent::Apply,
            "disconnect" => Intent::Disconnect,
            "help" | "?" => Intent::Help,
            "quit" | "exit" | "q" => Intent::Quit,
            other => return Err(format!("unknown command: {}", other)),
        };
        Ok(intent)
    }
}

const HELP: &str = "\
Commands:
  connect <token>            token screen
  toggle <n> | save | back   device selection
  on <n> | off <n> | open <n> | alloff | settings | disconnect
  mode <auto|cool|warm|dry|blow> | up | down | temp <value> | apply | back
  help | quit
";

fn device_at<A: ApplianceApi, S: KeyValueStore>(c: &Controller<A, S>, n: usize) -> Option<ApplianceId> {
    let state = c.state();
    let i = n.checked_sub(1)?;
    match &state.view {
        View::DeviceSelect => state.directory.devices().get(i).map(|d| d.id.clone()),
        _ => state.selection.get(i).map(|d| d.id.clone()),
    }
}

/// Applies one intent. Returns `false` when the operator asked to quit.
pub fn handle<A: ApplianceApi, S: KeyValueStore>(c: &mut Controller<A, S>, intent: Intent) -> bool {
    debug!("Intent: {:?}", intent);
    let keep_running = intent != Intent::Quit;
    let view = c.state().view.clone();
    match intent {
        Intent::Connect(token) => c.connect(&token),
        Intent::Toggle(n) => {
            if let Some(id) = device_at(c, n) {
                c.toggle_device(&id);
            }
        }
        Intent::Save => c.save_selection(),
        Intent::Back => match view {
            View::DeviceSelect => c.back_to_token(),
            View::Detail(_) => c.back_to_main(),
            _ => {}
        },
        Intent::Settings => c.open_settings(),
        Intent::Open(n) => {
            if let Some(id) = device_at(c, n) {
                c.open_detail(&id);
            }
        }
        Intent::Power(n, power) => {
            if let Some(id) = device_at(c, n) {
                c.set_power(&id, power);
            }
        }
        Intent::AllOff => c.all_off(),
        Intent::Mode(mode) => c.select_mode(mode),
        Intent::Up => c.increment_temp(),
        Intent::Down => c.decrement_temp(),
        Intent::Temp(text) => c.enter_temp(&text),
        Intent::Apply => c.apply_detail(),
        Intent::Disconnect => c.disconnect(),
        Intent::Help | Intent::Quit => {}
    }
    keep_running
}

pub fn run<A, S, R, W>(c: &mut Controller<A, S>, input: R, mut output: W) -> io::Result<()>
where
    A: ApplianceApi,
    S: KeyValueStore,
    R: BufRead,
    W: Write,
{
    let mut lines = input.lines();
    loop {
        if let Some(notice) = c.take_notice() {
            let marker = match notice.kind {
                NoticeKind::Success => "*",
                NoticeKind::Error => "!",
            };
            writeln!(output, "{} {}", marker, notice.message)?;
        }
        write!(output, "{}> ", render::to_text(&render::screen(c.state())))?;
        output.flush()?;

        let Some(line) = lines.next().transpose()? else {
            writeln!(output)?;
            return Ok(());
        };
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<Intent>() {
            Ok(Intent::Help) => write!(output, "{}", HELP)?,
            Ok(intent) => {
                if !handle(c, intent) {
                    return Ok(());
                }
            }
            Err(e) => writeln!(output, "! {}", e)?,
        }
    }
}
