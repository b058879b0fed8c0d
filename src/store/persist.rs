//! Loading and debounced saving of the composite application state.

use super::SyncedStore;
use crate::core::AppState;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

pub const APP_STATE_KEY: &str = "app_state";

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Read the stored state. Absent, malformed or unreadable blobs yield `None`.
pub fn load_state(store: &SyncedStore) -> Option<AppState> {
    match store.load(APP_STATE_KEY) {
        Ok(Some(blob)) => state_from_blob(&blob),
        Ok(None) => None,
        Err(e) => {
            log::error!("failed to load {}: {}", APP_STATE_KEY, e);
            None
        }
    }
}

/// Decode a stored blob. Each slice falls back to its default on its own
/// when missing or undecodable; a blob that is not an object is rejected.
pub fn state_from_blob(blob: &Value) -> Option<AppState> {
    let Some(object) = blob.as_object() else {
        log::error!("stored {} is not an object, ignoring", APP_STATE_KEY);
        return None;
    };
    Some(AppState::from_parts(
        slice(object, "entities"),
        slice(object, "aggregation"),
        slice(object, "ui"),
    ))
}

fn slice<T: DeserializeOwned + Default>(object: &Map<String, Value>, name: &str) -> T {
    match object.get(name) {
        None | Some(Value::Null) => T::default(),
        Some(value) => serde_json::from_value(value.clone()).unwrap_or_else(|e| {
            log::warn!("stored slice {} is invalid, using defaults: {}", name, e);
            T::default()
        }),
    }
}

enum WriteRequest {
    Save(Value),
    Flush(Sender<()>),
}

/// Background writer coalescing bursts of saves into one.
///
/// Each scheduled blob replaces the pending one and restarts the window.
/// Dropping the writer writes whatever is still pending.
pub struct DebouncedWriter {
    sender: Option<Sender<WriteRequest>>,
    handle: Option<JoinHandle<()>>,
}

impl DebouncedWriter {
    pub fn spawn(store: SyncedStore, key: &str, window: Duration) -> Self {
        let (sender, receiver) = mpsc::channel();
        let key = key.to_string();
        let handle = std::thread::spawn(move || {
            let mut pending: Option<Value> = None;
            let mut deadline: Option<Instant> = None;
            loop {
                let request = match deadline {
                    Some(at) => receiver.recv_timeout(at.saturating_duration_since(Instant::now())),
                    None => receiver.recv().map_err(|_| RecvTimeoutError::Disconnected),
                };
                match request {
                    Ok(WriteRequest::Save(blob)) => {
                        pending = Some(blob);
                        deadline = Some(Instant::now() + window);
                    }
                    Ok(WriteRequest::Flush(done)) => {
                        write(&store, &key, pending.take());
                        deadline = None;
                        let _ = done.send(());
                    }
                    Err(RecvTimeoutError::Timeout) => {
                        write(&store, &key, pending.take());
                        deadline = None;
                    }
                    Err(RecvTimeoutError::Disconnected) => {
                        write(&store, &key, pending.take());
                        break;
                    }
                }
            }
            log::debug!("writer for {} stopped", key);
        });
        DebouncedWriter {
            sender: Some(sender),
            handle: Some(handle),
        }
    }

    pub fn schedule(&self, blob: Value) {
        if let Some(sender) = &self.sender {
            if sender.send(WriteRequest::Save(blob)).is_err() {
                log::error!("state writer has stopped, save dropped");
            }
        }
    }

    /// Write the pending blob now and wait for it
    pub fn flush(&self) {
        let Some(sender) = &self.sender else {
            return;
        };
        let (done, wait) = mpsc::channel();
        if sender.send(WriteRequest::Flush(done)).is_ok() {
            let _ = wait.recv();
        }
    }
}

impl Drop for DebouncedWriter {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("state writer thread panicked");
            }
        }
    }
}

fn write(store: &SyncedStore, key: &str, blob: Option<Value>) {
    let Some(blob) = blob else {
        return;
    };
    // failures are reported only; in-memory state stays as it is
    if let Err(e) = store.save(key, blob) {
        log::error!("failed to save {}: {}", key, e);
    }
}
