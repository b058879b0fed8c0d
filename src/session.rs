//! One execution context over the shared store.
//!
//! A session loads the stored state once, schedules a debounced save after
//! every update, and replaces its state wholesale when another session
//! announces a new `app_state` blob.

use crate::core::AppState;
use crate::store::persist::{self, DebouncedWriter, APP_STATE_KEY};
use crate::store::{ChangeBus, KeyValueStore, StoreError, Subscription, SyncedStore};
use std::sync::Arc;
use std::time::Duration;

pub struct Session {
    state: AppState,
    store: SyncedStore,
    inbox: Subscription,
    writer: DebouncedWriter,
    restored: bool,
}

impl Session {
    pub fn open(backend: Arc<dyn KeyValueStore>, bus: &ChangeBus, debounce: Duration) -> Self {
        let (publisher, inbox) = bus.join();
        let store = SyncedStore::new(backend, publisher);
        let loaded = persist::load_state(&store);
        let restored = loaded.is_some();
        if !restored {
            log::info!("no stored state, starting empty");
        }
        let writer = DebouncedWriter::spawn(store.clone(), APP_STATE_KEY, debounce);
        Session {
            state: loaded.unwrap_or_default(),
            store,
            inbox,
            writer,
            restored,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Whether state was found in the store at startup
    pub fn restored(&self) -> bool {
        self.restored
    }

    pub fn store(&self) -> &SyncedStore {
        &self.store
    }

    /// Mutate the state and schedule a save.
    pub fn update<T>(&mut self, f: impl FnOnce(&mut AppState) -> T) -> T {
        let out = f(&mut self.state);
        match serde_json::to_value(&self.state) {
            Ok(blob) => self.writer.schedule(blob),
            Err(e) => log::error!("failed to encode state: {}", e),
        }
        out
    }

    /// Apply broadcasts from other sessions. Returns true if the state was
    /// replaced.
    pub fn sync(&mut self) -> bool {
        let mut replaced = false;
        for event in self.inbox.drain() {
            if event.key != APP_STATE_KEY {
                continue;
            }
            let Some(blob) = event.blob else {
                continue;
            };
            if let Some(state) = persist::state_from_blob(&blob) {
                self.state.replace(state);
                replaced = true;
            }
        }
        if replaced {
            log::debug!("state replaced from broadcast");
        }
        replaced
    }

    pub fn flush(&self) {
        self.writer.flush();
    }

    /// Forget everything: pending saves are written first so the clear wins.
    pub fn reset(&mut self) -> Result<(), StoreError> {
        self.writer.flush();
        self.state = AppState::default();
        self.store.clear_all()
    }
}
