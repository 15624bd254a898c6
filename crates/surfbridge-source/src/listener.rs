//! Per-instance listener registration.
//!
//! Platform callbacks arrive through foreign trampolines that can only carry an integer
//! cookie. Instead of casting that cookie back to a pointer, each item registers its signal
//! in a [`ListenerTable`] and hands the platform a [`ListenerKey`]. Late callbacks for an
//! unregistered key are dropped.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use crate::signal::FrameAvailableSignal;

/// Opaque cookie handed to the platform producer. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerKey(pub u64);

#[derive(Debug)]
pub struct ListenerTable {
    next_key: AtomicU64,
    entries: Mutex<HashMap<ListenerKey, Weak<FrameAvailableSignal>>>,
}

impl ListenerTable {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_key: AtomicU64::new(1),
            entries: Mutex::new(HashMap::new()),
        })
    }

    /// Process-wide table for trampolines that cannot carry a table reference.
    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<ListenerTable>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(ListenerTable::new))
    }

    pub fn register(self: &Arc<Self>, signal: &Arc<FrameAvailableSignal>) -> ListenerRegistration {
        let key = ListenerKey(self.next_key.fetch_add(1, Ordering::Relaxed));
        self.entries.lock().insert(key, Arc::downgrade(signal));
        tracing::debug!(key = key.0, item = %signal.item(), "frame listener registered");
        ListenerRegistration {
            listener: FrameListener {
                key,
                table: Arc::clone(self),
            },
        }
    }

    /// Raises the signal registered under `key`.
    ///
    /// Safe from any thread. Returns `false` for unknown or already released keys.
    pub fn dispatch(&self, key: ListenerKey) -> bool {
        let signal = self.entries.lock().get(&key).and_then(Weak::upgrade);
        match signal {
            Some(signal) => {
                signal.raise();
                true
            }
            None => {
                tracing::trace!(key = key.0, "frame available for unregistered listener");
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: ListenerKey) -> bool {
        self.entries.lock().contains_key(&key)
    }

    fn unregister(&self, key: ListenerKey) -> bool {
        self.entries.lock().remove(&key).is_some()
    }
}

/// The adapter handed to the producer. Its only job is to forward into the table.
#[derive(Debug, Clone)]
pub struct FrameListener {
    key: ListenerKey,
    table: Arc<ListenerTable>,
}

impl FrameListener {
    pub fn key(&self) -> ListenerKey {
        self.key
    }

    /// Called by the producer, on whatever thread it decodes on.
    pub fn on_frame_available(&self) {
        self.table.dispatch(self.key);
    }
}

/// Owns one table entry; dropping it unregisters the key.
#[derive(Debug)]
pub struct ListenerRegistration {
    listener: FrameListener,
}

impl ListenerRegistration {
    pub fn key(&self) -> ListenerKey {
        self.listener.key
    }

    pub fn listener(&self) -> FrameListener {
        self.listener.clone()
    }
}

impl Drop for ListenerRegistration {
    fn drop(&mut self) {
        let key = self.listener.key;
        if self.listener.table.unregister(key) {
            tracing::debug!(key = key.0, "frame listener unregistered");
        } else {
            tracing::warn!(key = key.0, "frame listener was already unregistered");
        }
    }
}
