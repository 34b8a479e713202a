//! Minimal runtime configuration helpers.
//! Environment first, then command-line overrides.

use std::path::PathBuf;
use std::time::Duration;

use crate::client::DEFAULT_BASE_URL;

pub const DEFAULT_STATE_FILE: &str = "remo-panel.json";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_base: String,
    /// JSON file backing the token, directory and selection.
    pub state_file: PathBuf,
    /// Token used to pre-seed an empty store.
    pub token: Option<String>,
    /// Global HTTP timeout; `None` waits indefinitely.
    pub http_timeout: Option<Duration>,
    /// Clear the store before starting.
    pub reset: bool,
}

/// Command-line overrides, all optional.
#[derive(Debug, Clone, Default, clap::Parser)]
#[command(version, about = "Control panel for Nature Remo air conditioners")]
pub struct CliArgs {
    /// State file path (overrides REMO_STATE_FILE)
    #[arg(long)]
    pub state_file: Option<PathBuf>,
    /// API base URL (overrides REMO_API_BASE)
    #[arg(long)]
    pub api_base: Option<String>,
    /// Access token used when none is stored (overrides REMO_TOKEN)
    #[arg(long)]
    pub token: Option<String>,
    /// Forget the stored token and selection before starting
    #[arg(long)]
    pub reset: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_base = non_empty("REMO_API_BASE").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        check_api_base(&api_base)?;

        let state_file = non_empty("REMO_STATE_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_FILE));

        let http_timeout = match non_empty("REMO_HTTP_TIMEOUT_SECS") {
            Some(s) => Some(Duration::from_secs(
                s.parse::<u64>()
                    .map_err(|_| "REMO_HTTP_TIMEOUT_SECS must be a whole number of seconds".to_string())?,
            )),
            None => None,
        };

        Ok(Config {
            api_base,
            state_file,
            token: non_empty("REMO_TOKEN"),
            http_timeout,
            reset: false,
        })
    }

    pub fn with_cli(mut self, cli: CliArgs) -> Result<Self, String> {
        if let Some(path) = cli.state_file {
            self.state_file = path;
        }
        if let Some(base) = cli.api_base.map(|b| b.trim().to_string()).filter(|b| !b.is_empty()) {
            check_api_base(&base)?;
            self.api_base = base;
        }
        if let Some(token) = cli.token.filter(|t| !t.trim().is_empty()) {
            self.token = Some(token.trim().to_string());
        }
        self.reset = cli.reset;
        Ok(self)
    }
}

fn check_api_base(base: &str) -> Result<(), String> {
    if base.starts_with("http://") || base.starts_with("https://") {
        Ok(())
    } else {
        Err(format!("API base must be an http(s) URL, got {}", base))
    }
}
