use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};

/// A write or clear observed on the store. `blob` is `None` for clears.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreEvent {
    pub key: String,
    pub blob: Option<Value>,
}

type Peers = Vec<(u64, Sender<StoreEvent>)>;

/// In-process pub/sub between sessions sharing a store
#[derive(Clone, Default)]
pub struct ChangeBus {
    peers: Arc<Mutex<Peers>>,
    next_id: Arc<AtomicU64>,
}

impl ChangeBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a peer. Events it publishes are never delivered to its own
    /// subscription.
    pub fn join(&self) -> (Publisher, Subscription) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel();
        self.lock().push((id, sender));
        (
            Publisher {
                id,
                bus: self.clone(),
            },
            Subscription { id, receiver },
        )
    }

    fn broadcast(&self, from: u64, event: StoreEvent) {
        let mut peers = self.lock();
        // drop peers whose subscription is gone
        peers.retain(|(id, sender)| *id == from || sender.send(event.clone()).is_ok());
    }

    fn lock(&self) -> MutexGuard<'_, Peers> {
        match self.peers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[derive(Clone)]
pub struct Publisher {
    id: u64,
    bus: ChangeBus,
}

impl Publisher {
    pub fn publish(&self, event: StoreEvent) {
        log::debug!("peer {} published {}", self.id, event.key);
        self.bus.broadcast(self.id, event);
    }
}

pub struct Subscription {
    id: u64,
    receiver: Receiver<StoreEvent>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Every event received so far, oldest first
    pub fn drain(&self) -> Vec<StoreEvent> {
        self.receiver.try_iter().collect()
    }
}
