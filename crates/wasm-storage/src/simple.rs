use spacetechs_shared::StorageError;
use wasm_bindgen::JsValue;

use crate::KeyValueStore;

/// `localStorage` / `sessionStorage` backed store
#[derive(Debug, Clone, Copy)]
pub struct BrowserStorage {
    use_session: bool,
}

impl BrowserStorage {
    pub fn local() -> Self {
        Self { use_session: false }
    }

    pub fn session() -> Self {
        Self { use_session: true }
    }

    /// All keys currently held by the backing storage
    pub fn keys(&self) -> Result<Vec<String>, StorageError> {
        let storage = self.get_storage()?;
        let mut keys = Vec::new();

        for i in 0..storage.length().map_err(unavailable)? {
            if let Some(key) = storage.key(i).map_err(unavailable)? {
                keys.push(key);
            }
        }

        Ok(keys)
    }

    fn get_storage(&self) -> Result<web_sys::Storage, StorageError> {
        let window = web_sys::window().ok_or_else(|| StorageError::Unavailable {
            message: "No window object".to_string(),
        })?;

        let (storage, name) = if self.use_session {
            (window.session_storage(), "SessionStorage")
        } else {
            (window.local_storage(), "LocalStorage")
        };

        storage
            .map_err(|_| StorageError::Unavailable {
                message: format!("{} not available", name),
            })?
            .ok_or_else(|| StorageError::Unavailable {
                message: format!("{} not supported", name),
            })
    }
}

fn unavailable(err: JsValue) -> StorageError {
    StorageError::Unavailable {
        message: err
            .as_string()
            .unwrap_or_else(|| format!("{:?}", err)),
    }
}

impl KeyValueStore for BrowserStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.get_storage()?.get_item(key).map_err(unavailable)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.get_storage()?.set_item(key, value).map_err(unavailable)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.get_storage()?.remove_item(key).map_err(unavailable)
    }
}
