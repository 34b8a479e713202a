//! Durable key-value record: the token, the last-fetched directory and the
//! operator's selection. Snapshot data is never written here.

use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::directory::{Device, SelectedDevice};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StoreKey {
    Token,
    AllAircons,
    SelectedAircons,
}

/// Partial record; `None` means "not stored" on read and "leave as is" on write.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_aircons: Option<Vec<Device>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_aircons: Option<Vec<SelectedDevice>>,
}

impl PersistedState {
    pub fn only(&self, keys: &[StoreKey]) -> PersistedState {
        PersistedState {
            token: keys.contains(&StoreKey::Token).then(|| self.token.clone()).flatten(),
            all_aircons: keys
                .contains(&StoreKey::AllAircons)
                .then(|| self.all_aircons.clone())
                .flatten(),
            selected_aircons: keys
                .contains(&StoreKey::SelectedAircons)
                .then(|| self.selected_aircons.clone())
                .flatten(),
        }
    }

    pub fn merge(&mut self, update: PersistedState) {
        if update.token.is_some() {
            self.token = update.token;
        }
        if update.all_aircons.is_some() {
            self.all_aircons = update.all_aircons;
        }
        if update.selected_aircons.is_some() {
            self.selected_aircons = update.selected_aircons;
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("state file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("state file {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub trait KeyValueStore {
    fn get(&self, keys: &[StoreKey]) -> Result<PersistedState, StoreError>;
    fn set(&mut self, record: PersistedState) -> Result<(), StoreError>;
    fn clear(&mut self) -> Result<(), StoreError>;
}

/// JSON document on disk, read and rewritten whole on every call.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore { path: path.into() }
    }

    fn io_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn load(&self) -> Result<PersistedState, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(s) if s.trim().is_empty() => Ok(PersistedState::default()),
            Ok(s) => serde_json::from_str(&s).map_err(|source| StoreError::Json {
                path: self.path.clone(),
                source,
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(PersistedState::default()),
            Err(e) => Err(self.io_err(e)),
        }
    }

    fn save(&self, state: &PersistedState) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(state).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| self.io_err(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, keys: &[StoreKey]) -> Result<PersistedState, StoreError> {
        Ok(self.load()?.only(keys))
    }

    fn set(&mut self, record: PersistedState) -> Result<(), StoreError> {
        let mut state = self.load()?;
        state.merge(record);
        self.save(&state)?;
        debug!("Store: wrote {}", self.path.display());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_err(e)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: PersistedState,
}

impl MemoryStore {
    pub fn new(state: PersistedState) -> Self {
        MemoryStore { state }
    }

    pub fn state(&self) -> &PersistedState {
        &self.state
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, keys: &[StoreKey]) -> Result<PersistedState, StoreError> {
        Ok(self.state.only(keys))
    }

    fn set(&mut self, record: PersistedState) -> Result<(), StoreError> {
        self.state.merge(record);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.state = PersistedState::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::remo::ApplianceId;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("remo-panel-{}-{}.json", name, std::process::id()))
    }

    fn selection() -> Vec<SelectedDevice> {
        vec![SelectedDevice {
            id: ApplianceId("ac-1".into()),
            name: "Living".into(),
        }]
    }

    #[test]
    fn set_merges_and_get_filters_keys() {
        let mut store = MemoryStore::default();
        store
            .set(PersistedState {
                token: Some("tok".into()),
                ..Default::default()
            })
            .unwrap();
        store
            .set(PersistedState {
                selected_aircons: Some(selection()),
                ..Default::default()
            })
            .unwrap();

        let got = store.get(&[StoreKey::Token]).unwrap();
        assert_eq!(got.token.as_deref(), Some("tok"));
        assert_eq!(got.selected_aircons, None);

        let got = store.get(&[StoreKey::Token, StoreKey::SelectedAircons]).unwrap();
        assert_eq!(got.selected_aircons, Some(selection()));

        store.clear().unwrap();
        assert_eq!(store.get(&[StoreKey::Token]).unwrap(), PersistedState::default());
    }

    #[test]
    fn file_store_round_trips_with_wire_key_names() {
        let path = temp_path("roundtrip");
        let mut store = FileStore::new(&path);
        store.clear().unwrap();
        assert_eq!(store.get(&[StoreKey::Token]).unwrap(), PersistedState::default());

        store
            .set(PersistedState {
                token: Some("tok".into()),
                selected_aircons: Some(selection()),
                ..Default::default()
            })
            .unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"selectedAircons\""));
        assert!(!raw.contains("\"allAircons\""));

        let reopened = FileStore::new(&path);
        let got = reopened.get(&[StoreKey::Token, StoreKey::SelectedAircons]).unwrap();
        assert_eq!(got.token.as_deref(), Some("tok"));
        assert_eq!(got.selected_aircons, Some(selection()));

        store.clear().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn corrupt_file_is_reported() {
        let path = temp_path("corrupt");
        fs::write(&path, "{not json").unwrap();
        let store = FileStore::new(&path);
        assert!(matches!(store.get(&[StoreKey::Token]), Err(StoreError::Json { .. })));
        fs::remove_file(&path).unwrap();
    }
}
