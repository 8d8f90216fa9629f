use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

/// Minimal synchronous key/value persistence the token store is built on.
///
/// Implementations log failures instead of returning them. A storage that cannot be written
/// simply behaves like an empty one, leaving the user unauthenticated.
pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// In-memory storage. Clones share their data.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    items: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.items.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.items.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.items.lock().insert(key.to_owned(), value.to_owned());
    }

    fn remove(&self, key: &str) {
        self.items.lock().remove(key);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    Local,
    Session,
}

/// `window.localStorage` or `window.sessionStorage`.
///
/// The storage object is looked up on every access, so this type stays `Send + Sync` and can live
/// in a Leptos context. Only usable in the browser.
#[derive(Debug, Clone, Copy)]
pub struct WebStorage {
    storage_type: StorageType,
}

impl WebStorage {
    pub fn local() -> Self {
        Self {
            storage_type: StorageType::Local,
        }
    }

    pub fn session() -> Self {
        Self {
            storage_type: StorageType::Session,
        }
    }

    fn storage(&self) -> Option<web_sys::Storage> {
        let window = web_sys::window()?;
        let storage = match self.storage_type {
            StorageType::Local => window.local_storage(),
            StorageType::Session => window.session_storage(),
        };
        match storage {
            Ok(storage) => storage,
            Err(err) => {
                tracing::error!(?err, storage_type = ?self.storage_type, "Storage not available.");
                None
            }
        }
    }
}

impl KeyValueStorage for WebStorage {
    fn get(&self, key: &str) -> Option<String> {
        match self.storage()?.get_item(key) {
            Ok(value) => value,
            Err(err) => {
                tracing::error!(?err, "Error reading '{key}' from storage.");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) {
        let Some(storage) = self.storage() else {
            return;
        };
        if let Err(err) = storage.set_item(key, value) {
            tracing::error!(?err, "Error writing '{key}' to storage.");
        }
    }

    fn remove(&self, key: &str) {
        let Some(storage) = self.storage() else {
            return;
        };
        if let Err(err) = storage.remove_item(key) {
            tracing::error!(?err, "Error removing '{key}' from storage.");
        }
    }
}
