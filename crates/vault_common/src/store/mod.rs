//! Persistent store adapter.
//!
//! Reads and writes JSON-serialized collections under fixed keys. Reads are
//! lenient: an absent key or malformed JSON yields an empty collection and a
//! warning, never an error. Writes replace the whole value in one backend
//! call.

pub mod backend;

pub use backend::{FileBackend, KvBackend, MemoryBackend};

use crate::config::{BackendKind, StorageSettings};
use crate::error::StoreError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Simulated `auth.users` table
pub const USERS_KEY: &str = "identity_users";
/// Currently authenticated user
pub const SESSION_KEY: &str = "identity_session";
/// Simulated `user_progress` table
pub const PROGRESS_KEY: &str = "progress_records";

/// JSON facade over a `KvBackend`
#[derive(Clone)]
pub struct JsonStore {
    backend: Arc<dyn KvBackend>,
}

impl JsonStore {
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self { backend }
    }

    /// Isolated in-memory store
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Store described by the `[storage]` config section
    pub fn from_settings(settings: &StorageSettings) -> Self {
        match settings.backend {
            BackendKind::File => Self::new(Arc::new(FileBackend::new(&settings.data_dir))),
            BackendKind::Memory => Self::in_memory(),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Collection under `key`, or empty when absent or unreadable
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        match self.backend.get(key) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<T>>(&raw) {
                Ok(items) => {
                    debug!(key, count = items.len(), "store read");
                    items
                }
                Err(e) => {
                    warn!(key, error = %e, "malformed collection, treating as empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(key, error = %e, "store read failed, treating as empty");
                Vec::new()
            }
        }
    }

    /// Overwrite the full collection under `key`
    pub fn write<T: Serialize>(&self, key: &str, items: &[T]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(items)?;
        self.backend.set(key, &raw)?;
        debug!(key, count = items.len(), "store write");
        Ok(())
    }

    /// Single record under `key`, or `None` when absent or unreadable
    pub fn read_record<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.backend.get(key) {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(key, error = %e, "malformed record, ignoring");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key, error = %e, "store read failed");
                None
            }
        }
    }

    pub fn write_record<T: Serialize>(&self, key: &str, record: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(record)?;
        self.backend.set(key, &raw)
    }

    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.backend.remove(key)
    }
}
