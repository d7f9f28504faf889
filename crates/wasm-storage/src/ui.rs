//! Site-wide UI state with a persisted menu flag

use serde::{Deserialize, Serialize};
use spacetechs_shared::StorageError;

use crate::KeyValueStore;

/// Storage key holding the persisted UI state
pub const UI_STORE_KEY: &str = "ui-store";

const STORE_VERSION: u32 = 0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiState {
    pub is_menu_open: bool,
    /// Transient; never persisted
    #[serde(skip)]
    pub scroll_y: f64,
    /// Transient; never persisted
    #[serde(skip)]
    pub is_loading: bool,
}

#[derive(Serialize, Deserialize)]
struct PersistedUi {
    state: UiState,
    version: u32,
}

pub struct UiStore<S: KeyValueStore> {
    storage: S,
    state: UiState,
}

impl<S: KeyValueStore> UiStore<S> {
    /// Rehydrate from `storage`; missing or unreadable data yields defaults
    pub fn load(storage: S) -> Self {
        let state = match storage.get_json::<PersistedUi>(UI_STORE_KEY) {
            Ok(Some(persisted)) if persisted.version == STORE_VERSION => persisted.state,
            Ok(Some(persisted)) => {
                log::warn!(
                    "Discarding UI state with unknown version {}",
                    persisted.version
                );
                UiState::default()
            }
            Ok(None) => UiState::default(),
            Err(e) => {
                log::warn!("Failed to restore UI state: {}", e);
                UiState::default()
            }
        };
        Self { storage, state }
    }

    pub fn state(&self) -> UiState {
        self.state
    }

    pub fn is_menu_open(&self) -> bool {
        self.state.is_menu_open
    }

    pub fn set_menu_open(&mut self, open: bool) {
        self.state.is_menu_open = open;
        self.persist();
    }

    pub fn toggle_menu(&mut self) {
        self.set_menu_open(!self.state.is_menu_open);
    }

    pub fn scroll_y(&self) -> f64 {
        self.state.scroll_y
    }

    pub fn set_scroll_y(&mut self, scroll_y: f64) {
        self.state.scroll_y = scroll_y;
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.state.is_loading = loading;
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Write failures are logged; the in-memory state stays authoritative
    fn persist(&self) {
        if let Err(e) = self.try_persist() {
            log::warn!("Failed to persist UI state: {}", e);
        }
    }

    fn try_persist(&self) -> Result<(), StorageError> {
        self.storage.set_json(
            UI_STORE_KEY,
            &PersistedUi {
                state: self.state,
                version: STORE_VERSION,
            },
        )
    }
}
