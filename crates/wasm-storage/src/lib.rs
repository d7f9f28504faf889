//! Persisted UI preferences for the SpaceTechs site
//!
//! [`KeyValueStore`] abstracts the browser's string storage so the UI store
//! can be driven by `localStorage` in the browser and by [`MemoryStorage`]
//! everywhere else.

use std::cell::RefCell;
use std::collections::HashMap;

pub use spacetechs_shared::StorageError;

#[cfg(target_arch = "wasm32")]
pub mod simple;
pub mod ui;

#[cfg(target_arch = "wasm32")]
pub use simple::BrowserStorage;
pub use ui::{UiState, UiStore, UI_STORE_KEY};

/// String key/value storage
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    fn get_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError>
    where
        Self: Sized,
    {
        match self.get(key)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn set_json<T: serde::Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError>
    where
        Self: Sized,
    {
        let json = serde_json::to_string(value)?;
        self.set(key, &json)
    }
}

/// In-process storage; used off the browser and in tests
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

impl<S: KeyValueStore> KeyValueStore for std::rc::Rc<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Prefs {
        theme: String,
    }

    #[test]
    fn test_memory_storage_json() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get_json::<Prefs>("prefs").unwrap(), None);

        storage
            .set_json(
                "prefs",
                &Prefs {
                    theme: "dark".to_string(),
                },
            )
            .unwrap();
        let prefs: Prefs = storage.get_json("prefs").unwrap().unwrap();
        assert_eq!(prefs.theme, "dark");

        storage.remove("prefs").unwrap();
        assert!(storage.is_empty());
    }

    #[test]
    fn test_corrupt_json_is_serialization_error() {
        let storage = MemoryStorage::new();
        storage.set("prefs", "{not json").unwrap();
        let err = storage.get_json::<Prefs>("prefs").unwrap_err();
        assert!(matches!(err, StorageError::Serialization { .. }));
    }
}
