//! Key-value persistence backends.
//!
//! The score store only ever reads and writes one blob under one key, so the
//! interface is just `get` and `set` by key. The browser backend
//! wraps `window.localStorage`; [`MemoryStore`] keeps everything in a map and
//! is what the tests run against.

use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use wasm_bindgen::JsValue;

/// Failure reported by a storage backend.
#[derive(Debug, Clone, PartialEq)]
pub enum StorageError {
    /// No storage is reachable (no window, storage disabled, private mode).
    Unavailable,
    Read(String),
    Write(String),
    /// The record could not be serialized.
    Encode(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Unavailable => write!(f, "Storage is not available"),
            StorageError::Read(msg) => write!(f, "Failed to read from storage: {}", msg),
            StorageError::Write(msg) => write!(f, "Failed to write to storage: {}", msg),
            StorageError::Encode(msg) => write!(f, "Failed to encode record: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {}

/// Minimal get/set interface over a string key-value store.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

fn js_message(value: JsValue) -> String {
    value
        .as_string()
        .unwrap_or_else(|| format!("{:?}", value))
}

/// `window.localStorage` backend.
///
/// The storage object is looked up on every call, so a store created while
/// storage is blocked simply reports [`StorageError::Unavailable`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStore;

impl LocalStore {
    fn storage(&self) -> Result<web_sys::Storage, StorageError> {
        gloo_utils::window()
            .local_storage()
            .map_err(|e| StorageError::Read(js_message(e)))?
            .ok_or(StorageError::Unavailable)
    }
}

impl KeyValueStore for LocalStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage()?
            .get_item(key)
            .map_err(|e| StorageError::Read(js_message(e)))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage()?
            .set_item(key, value)
            .map_err(|e| StorageError::Write(js_message(e)))
    }
}

/// In-memory backend.
///
/// Clones share the same map, so a test can keep a handle and inspect what
/// was written after handing a clone to the code under test.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
    read_only: bool,
    unreadable: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a single entry.
    pub fn with_entry(key: &str, value: &str) -> Self {
        let store = Self::new();
        store
            .entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        store
    }

    /// A clone of this store that rejects every write, sharing the same map.
    pub fn read_only(&self) -> Self {
        Self {
            entries: Rc::clone(&self.entries),
            read_only: true,
            unreadable: self.unreadable,
        }
    }

    /// A clone of this store that fails every read, sharing the same map.
    pub fn unreadable(&self) -> Self {
        Self {
            entries: Rc::clone(&self.entries),
            read_only: self.read_only,
            unreadable: true,
        }
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        if self.unreadable {
            return Err(StorageError::Read(format!("{} is unreadable", key)));
        }
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.read_only {
            debug!("Rejecting write to read-only memory store: {}", key);
            return Err(StorageError::Write("store is read-only".into()));
        }
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
