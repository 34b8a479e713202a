pub mod models {
    pub mod remo;
}

pub mod bulk;
pub mod client;
pub mod config;
pub mod directory;
pub mod dispatcher;
pub mod editor;
pub mod render;
pub mod snapshot;
pub mod store;
pub mod terminal;
pub mod utils;
pub mod view;

use crate::client::RemoClient;
use crate::config::{CliArgs, Config};
use crate::store::{FileStore, KeyValueStore, PersistedState, StoreKey};
use crate::view::Controller;
use clap::Parser;
use log::{error, info};

fn seed_token(store: &mut FileStore, token: Option<&str>) -> Result<(), String> {
    let Some(token) = token else {
        return Ok(());
    };
    let stored = store
        .get(&[StoreKey::Token])
        .map_err(|e| format!("reading state failed: {}", e))?;
    if stored.token.is_none() {
        store
            .set(PersistedState {
                token: Some(token.to_string()),
                ..Default::default()
            })
            .map_err(|e| format!("storing token failed: {}", e))?;
        info!("Seeded access token from configuration");
    }
    Ok(())
}

pub fn run(cli: CliArgs) -> Result<(), String> {
    // 1) Load config
    let cfg = Config::from_env()?.with_cli(cli)?;
    info!(
        "Config loaded (api_base={}, state_file={}, http_timeout={}, token_from_config={}, reset={})",
        cfg.api_base,
        cfg.state_file.display(),
        cfg.http_timeout
            .map(|d| format!("{}s", d.as_secs()))
            .unwrap_or_else(|| "-".to_string()),
        cfg.token.is_some(),
        cfg.reset
    );

    // 2) Open the state store
    let mut store = FileStore::new(&cfg.state_file);
    if cfg.reset {
        store.clear().map_err(|e| format!("reset failed: {}", e))?;
        info!("Stored token and selection cleared");
    }
    seed_token(&mut store, cfg.token.as_deref())?;

    // 3) Init Remo client
    let client = RemoClient::new(cfg.api_base.clone(), cfg.http_timeout);

    // 4) Resolve the first screen, then hand over to the terminal
    let mut controller = Controller::new(client, store);
    controller.boot();

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    terminal::run(&mut controller, stdin.lock(), stdout.lock()).map_err(|e| format!("terminal i/o failed: {}", e))
}

fn main() {
    let cli = CliArgs::parse();

    let default_filter = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(default_filter)
        .format_timestamp_secs()
        .init();

    info!(
        "remo-panel {} (git {}) starting",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TIME_GIT_HASH")
    );
    if let Err(e) = run(cli) {
        error!("fatal: {}", e);
        std::process::exit(1);
    }
}
