//! Screen state machine and the application state it owns.
//!
//! Every operator intent is a method on `Controller`; the presentation layer
//! only reads `Controller::state` to render. Exactly one `View` is current.

use log::{debug, info, warn};
use std::collections::BTreeSet;

use crate::bulk;
use crate::client::{ApplianceApi, RemoClientError};
use crate::directory::{ApplianceDirectory, SelectedDevice, SelectionDraft, SelectionError};
use crate::dispatcher::{set_parameters, CommandError, ParameterUpdate, Power};
use crate::editor::{EditError, EditingSession};
use crate::models::remo::{ApplianceId, OperationMode};
use crate::snapshot::StatusSnapshot;
use crate::store::{KeyValueStore, PersistedState, StoreError, StoreKey};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Loading,
    TokenEntry,
    DeviceSelect,
    Main,
    Detail(ApplianceId),
}

/// Controls that are disabled while their request is in flight.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Control {
    Connect,
    Power(ApplianceId),
    Apply(ApplianceId),
    AllOff,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

/// Screen-level failures. All are recoverable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PanelError {
    #[error("Invalid token")]
    Unauthorized,
    #[error("No air conditioners found")]
    NoEligibleDevices,
    #[error("API error: {0}")]
    RequestFailed(u16),
    #[error("{0}")]
    ValidationFailed(String),
    #[error("Network error: {0}")]
    Transport(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<RemoClientError> for PanelError {
    fn from(value: RemoClientError) -> Self {
        match value {
            RemoClientError::Unauthorized => PanelError::Unauthorized,
            RemoClientError::RequestFailed { status, .. } => PanelError::RequestFailed(status),
            RemoClientError::Transport(s) | RemoClientError::Json(s) => PanelError::Transport(s),
        }
    }
}

impl From<CommandError> for PanelError {
    fn from(value: CommandError) -> Self {
        match value {
            CommandError::Unauthorized => PanelError::Unauthorized,
            CommandError::RequestFailed(status) => PanelError::RequestFailed(status),
            CommandError::ValidationFailed(s) => PanelError::ValidationFailed(s),
            CommandError::Transport(s) => PanelError::Transport(s),
        }
    }
}

impl From<EditError> for PanelError {
    fn from(value: EditError) -> Self {
        PanelError::ValidationFailed(value.to_string())
    }
}

impl From<SelectionError> for PanelError {
    fn from(value: SelectionError) -> Self {
        PanelError::ValidationFailed(value.to_string())
    }
}

impl From<StoreError> for PanelError {
    fn from(value: StoreError) -> Self {
        PanelError::Storage(value.to_string())
    }
}

#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub view: View,
    pub directory: ApplianceDirectory,
    pub selection: Vec<SelectedDevice>,
    pub draft: SelectionDraft,
    pub snapshot: StatusSnapshot,
    pub session: Option<EditingSession>,
    pub token_error: Option<String>,
    pub detail_error: Option<String>,
    pub notice: Option<Notice>,
    in_flight: BTreeSet<Control>,
}

impl AppState {
    pub fn is_busy(&self, control: &Control) -> bool {
        self.in_flight.contains(control)
    }
}

pub struct Controller<A, S> {
    api: A,
    store: S,
    token: Option<String>,
    state: AppState,
}

impl<A: ApplianceApi, S: KeyValueStore> Controller<A, S> {
    pub fn new(api: A, store: S) -> Self {
        Controller {
            api,
            store,
            token: None,
            state: AppState::default(),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.state.notice.take()
    }

    // ---- Loading ----

    pub fn boot(&mut self) {
        let stored = self.load(&[StoreKey::Token, StoreKey::AllAircons, StoreKey::SelectedAircons]);
        self.state.directory = ApplianceDirectory::from_devices(stored.all_aircons.unwrap_or_default());
        let has_selection = stored.selected_aircons.as_ref().is_some_and(|s| !s.is_empty());

        match stored.token {
            Some(_) if has_selection => self.enter_main(),
            Some(token) => match self.fetch_directory(&token) {
                Ok(directory) => {
                    if let Err(e) = self.persist(PersistedState {
                        all_aircons: Some(directory.devices().to_vec()),
                        ..Default::default()
                    }) {
                        warn!("Boot: could not store directory: {}", e);
                    }
                    self.token = Some(token);
                    self.enter_device_select(directory);
                }
                Err(e) => {
                    warn!("Boot: directory fetch failed: {}", e);
                    self.show_token_entry(Some(e.to_string()));
                }
            },
            None => self.show_token_entry(None),
        }
    }

    // ---- TokenEntry ----

    pub fn connect(&mut self, token: &str) {
        if self.state.view != View::TokenEntry {
            return;
        }
        let token = token.trim().to_string();
        if token.is_empty() {
            self.state.token_error = Some("Enter an access token".to_string());
            return;
        }
        self.state.token_error = None;

        self.with_lock(Control::Connect, |this| {
            let connected = this.fetch_directory(&token).and_then(|directory| {
                this.persist(PersistedState {
                    token: Some(token.clone()),
                    all_aircons: Some(directory.devices().to_vec()),
                    ..Default::default()
                })?;
                Ok(directory)
            });
            match connected {
                Ok(directory) => {
                    info!("Connected: {} air conditioner(s) on the account", directory.len());
                    this.token = Some(token.clone());
                    this.enter_device_select(directory);
                }
                Err(e) => {
                    warn!("Connect failed: {}", e);
                    this.state.token_error = Some(e.to_string());
                }
            }
        });
    }

    // ---- DeviceSelect ----

    pub fn toggle_device(&mut self, id: &ApplianceId) {
        if self.state.view == View::DeviceSelect && self.state.directory.get(id).is_some() {
            self.state.draft.toggle(id);
        }
    }

    pub fn save_selection(&mut self) {
        if self.state.view != View::DeviceSelect {
            return;
        }
        let selection = match self.state.directory.select(self.state.draft.checked()) {
            Ok(s) => s,
            Err(e) => {
                debug!("Save ignored: {}", e);
                return;
            }
        };
        if let Err(e) = self.persist(PersistedState {
            selected_aircons: Some(selection.clone()),
            ..Default::default()
        }) {
            self.notify(NoticeKind::Error, e.to_string());
            return;
        }
        info!("Selection saved: {} device(s)", selection.len());
        self.state.selection = selection;
        self.enter_main();
    }

    pub fn back_to_token(&mut self) {
        if self.state.view == View::DeviceSelect {
            self.show_token_entry(None);
        }
    }

    // ---- Main ----

    pub fn open_settings(&mut self) {
        if self.state.view != View::Main {
            return;
        }
        match self.load(&[StoreKey::AllAircons]).all_aircons {
            Some(devices) if !devices.is_empty() => {
                self.enter_device_select(ApplianceDirectory::from_devices(devices))
            }
            _ => self.show_token_entry(None),
        }
    }

    pub fn open_detail(&mut self, id: &ApplianceId) {
        if self.state.view != View::Main {
            return;
        }
        let Some(device) = self.selected(id) else {
            return;
        };
        self.state.session = Some(EditingSession::open(&device, self.state.snapshot.get(id)));
        self.state.detail_error = None;
        self.show(View::Detail(id.clone()));
    }

    pub fn set_power(&mut self, id: &ApplianceId, power: Power) {
        if self.state.view != View::Main {
            return;
        }
        let Some(device) = self.selected(id) else {
            return;
        };
        let Some(token) = self.token.clone() else {
            self.show_token_entry(None);
            return;
        };

        self.with_lock(Control::Power(id.clone()), |this| {
            let update = match power {
                Power::On => ParameterUpdate::power_on(),
                Power::Off => ParameterUpdate::power_off(),
            };
            let label = if power == Power::On { "ON" } else { "OFF" };
            match set_parameters(&this.api, &token, &device.id, &update) {
                Ok(_) => {
                    this.state.snapshot.patch_power(&device.id, power == Power::On);
                    this.notify(NoticeKind::Success, format!("{} turned {}", device.name, label));
                }
                Err(e) => {
                    this.notify(NoticeKind::Error, format!("Failed to operate {} ({})", device.name, e));
                    if e == CommandError::Unauthorized {
                        this.require_auth();
                    }
                }
            }
        });
    }

    pub fn all_off(&mut self) {
        if self.state.view != View::Main {
            return;
        }
        let Some(token) = self.token.clone() else {
            self.show_token_entry(None);
            return;
        };

        let report = self.with_lock(Control::AllOff, |this| {
            bulk::all_off(&this.api, &token, &this.state.selection, &mut this.state.snapshot)
        });
        if let Some(report) = report {
            let kind = if report.is_complete() {
                NoticeKind::Success
            } else {
                NoticeKind::Error
            };
            self.notify(kind, report.message());
        }
    }

    pub fn disconnect(&mut self) {
        if let Err(e) = self.store.clear() {
            warn!("Disconnect: could not clear store: {}", e);
        }
        info!("Disconnected; stored token and selection cleared");
        self.token = None;
        self.state = AppState::default();
        self.show_token_entry(None);
    }

    // ---- Detail ----

    pub fn back_to_main(&mut self) {
        if matches!(self.state.view, View::Detail(_)) {
            self.enter_main();
        }
    }

    pub fn select_mode(&mut self, mode: OperationMode) {
        let res = self.session_mut().map(|s| s.select_mode(mode));
        self.record_edit(res);
    }

    pub fn increment_temp(&mut self) {
        if let Some(s) = self.session_mut() {
            s.increment_temp();
        }
    }

    pub fn decrement_temp(&mut self) {
        if let Some(s) = self.session_mut() {
            s.decrement_temp();
        }
    }

    pub fn enter_temp(&mut self, text: &str) {
        let res = self.session_mut().map(|s| s.enter_temp(text).map(|_| ()));
        self.record_edit(res);
    }

    pub fn apply_detail(&mut self) {
        let View::Detail(id) = self.state.view.clone() else {
            return;
        };
        let Some(session) = self.state.session.clone() else {
            return;
        };
        let Some(token) = self.token.clone() else {
            self.show_token_entry(None);
            return;
        };
        self.state.detail_error = None;

        self.with_lock(Control::Apply(id.clone()), |this| {
            match set_parameters(&this.api, &token, &id, &session.build_command_payload()) {
                Ok(_) => {
                    this.notify(NoticeKind::Success, format!("{} settings updated", session.device_name()));
                    this.enter_main();
                }
                Err(CommandError::Unauthorized) => this.require_auth(),
                Err(e) => this.state.detail_error = Some(format!("Update failed ({})", e)),
            }
        });
    }

    // ---- internals ----

    fn show(&mut self, view: View) {
        debug!("View: {:?} -> {:?}", self.state.view, view);
        if !matches!(view, View::Detail(_)) {
            self.state.session = None;
        }
        self.state.view = view;
    }

    fn show_token_entry(&mut self, error: Option<String>) {
        self.state.token_error = error;
        self.show(View::TokenEntry);
    }

    fn require_auth(&mut self) {
        self.token = None;
        self.show_token_entry(Some(PanelError::Unauthorized.to_string()));
    }

    /// Re-reads token and selection, then refreshes the snapshot. Listing
    /// failures other than 401 leave every device with unknown status.
    fn enter_main(&mut self) {
        let stored = self.load(&[StoreKey::Token, StoreKey::SelectedAircons]);
        let selection = stored.selected_aircons.filter(|s| !s.is_empty());
        let (Some(token), Some(selection)) = (stored.token, selection) else {
            self.show_token_entry(None);
            return;
        };
        self.token = Some(token.clone());
        self.state.selection = selection;

        let snapshot = match self.api.list_appliances(&token) {
            Ok(appliances) => StatusSnapshot::from_appliances(&appliances, &self.state.selection),
            Err(RemoClientError::Unauthorized) => {
                self.require_auth();
                return;
            }
            Err(e) => {
                warn!("Status fetch failed: {}", e);
                StatusSnapshot::default()
            }
        };
        self.state.snapshot = snapshot;
        self.show(View::Main);
    }

    fn enter_device_select(&mut self, directory: ApplianceDirectory) {
        let previous = self
            .load(&[StoreKey::SelectedAircons])
            .selected_aircons
            .unwrap_or_default();
        self.state.draft = SelectionDraft::restore(&directory, &previous);
        self.state.directory = directory;
        self.show(View::DeviceSelect);
    }

    fn fetch_directory(&self, token: &str) -> Result<ApplianceDirectory, PanelError> {
        let appliances = self.api.list_appliances(token)?;
        let directory = ApplianceDirectory::from_appliances(&appliances);
        if directory.is_empty() {
            return Err(PanelError::NoEligibleDevices);
        }
        Ok(directory)
    }

    fn selected(&self, id: &ApplianceId) -> Option<SelectedDevice> {
        self.state.selection.iter().find(|s| &s.id == id).cloned()
    }

    fn session_mut(&mut self) -> Option<&mut EditingSession> {
        match self.state.view {
            View::Detail(_) => self.state.session.as_mut(),
            _ => None,
        }
    }

    fn record_edit(&mut self, res: Option<Result<(), EditError>>) {
        match res {
            Some(Ok(())) => self.state.detail_error = None,
            Some(Err(e)) => self.state.detail_error = Some(PanelError::from(e).to_string()),
            None => {}
        }
    }

    fn notify(&mut self, kind: NoticeKind, message: String) {
        match kind {
            NoticeKind::Success => info!("{}", message),
            NoticeKind::Error => warn!("{}", message),
        }
        self.state.notice = Some(Notice { kind, message });
    }

    fn load(&self, keys: &[StoreKey]) -> PersistedState {
        self.store.get(keys).unwrap_or_else(|e| {
            warn!("Store read failed: {}", e);
            PersistedState::default()
        })
    }

    fn persist(&mut self, record: PersistedState) -> Result<(), PanelError> {
        Ok(self.store.set(record)?)
    }

    /// Runs `f` with `control` marked in flight; the mark is cleared on every
    /// path out. Returns `None` without running when already in flight.
    fn with_lock<T>(&mut self, control: Control, f: impl FnOnce(&mut Self) -> T) -> Option<T> {
        if !self.state.in_flight.insert(control.clone()) {
            debug!("Ignoring {:?}: request already in flight", control);
            return None;
        }
        let out = f(self);
        self.state.in_flight.remove(&control);
        Some(out)
    }
}
