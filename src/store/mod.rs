//! Key-value persistence for serialized application state.
//!
//! Blobs are `serde_json::Value`s stored under short keys. A [`SyncedStore`]
//! pairs a backend with a [`Publisher`] on the in-process [`ChangeBus`] so
//! every write and clear is announced to the other sessions.

mod bus;
mod file;
mod memory;
pub mod persist;

pub use bus::{ChangeBus, Publisher, StoreEvent, Subscription};
pub use file::FileStore;
pub use memory::MemoryStore;

use serde_json::Value;
use std::sync::Arc;

/// Prefix applied to every key by the file backend
pub const KEY_PREFIX: &str = "k2_part2_";

/// Event key announcing that every stored key was cleared
pub const ALL_KEYS: &str = "__ALL__";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode blob: {0}")]
    Encode(#[from] serde_json::Error),
}

pub trait KeyValueStore: Send + Sync {
    fn save(&self, key: &str, blob: &Value) -> Result<(), StoreError>;

    /// Missing and malformed blobs both read as `None`.
    fn load(&self, key: &str) -> Result<Option<Value>, StoreError>;

    fn clear(&self, key: &str) -> Result<(), StoreError>;

    fn clear_all(&self) -> Result<(), StoreError>;
}

/// A backend whose writes are broadcast on the change bus
#[derive(Clone)]
pub struct SyncedStore {
    backend: Arc<dyn KeyValueStore>,
    publisher: Publisher,
}

impl SyncedStore {
    pub fn new(backend: Arc<dyn KeyValueStore>, publisher: Publisher) -> Self {
        SyncedStore { backend, publisher }
    }

    pub fn save(&self, key: &str, blob: Value) -> Result<(), StoreError> {
        self.backend.save(key, &blob)?;
        self.publisher.publish(StoreEvent {
            key: key.to_string(),
            blob: Some(blob),
        });
        Ok(())
    }

    pub fn load(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.backend.load(key)
    }

    pub fn clear(&self, key: &str) -> Result<(), StoreError> {
        self.backend.clear(key)?;
        self.publisher.publish(StoreEvent {
            key: key.to_string(),
            blob: None,
        });
        Ok(())
    }

    pub fn clear_all(&self) -> Result<(), StoreError> {
        self.backend.clear_all()?;
        self.publisher.publish(StoreEvent {
            key: ALL_KEYS.to_string(),
            blob: None,
        });
        Ok(())
    }
}
