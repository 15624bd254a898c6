//! Cross-thread "a new frame is ready" plumbing.
//!
//! The producer thread only ever touches a [`FrameAvailableSignal`]: it flips the pending
//! flag and, on a clear -> set transition, queues one update request for the render thread.
//! Everything else happens on the render thread after it drains the [`UpdateReceiver`].

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use surfbridge_core::ItemId;

/// Creates the queued dispatch channel between producer threads and one render loop.
pub fn update_queue() -> (UpdateRequester, UpdateReceiver) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (UpdateRequester { tx }, UpdateReceiver { rx })
}

/// Sending half. Safe to call from any thread; never blocks.
#[derive(Debug, Clone)]
pub struct UpdateRequester {
    tx: Sender<ItemId>,
}

impl UpdateRequester {
    /// Asks the render loop to re-evaluate `item` on its next traversal.
    ///
    /// Returns `false` when the render loop has gone away.
    pub fn request_update(&self, item: ItemId) -> bool {
        self.tx.send(item).is_ok()
    }
}

/// Receiving half, owned by the render loop.
#[derive(Debug)]
pub struct UpdateReceiver {
    rx: Receiver<ItemId>,
}

impl UpdateReceiver {
    /// Moves every queued request into `dirty`. Returns how many raw requests were drained.
    ///
    /// Duplicate requests for the same item collapse in the set.
    pub fn drain_into(&self, dirty: &mut BTreeSet<ItemId>) -> usize {
        let mut n = 0;
        for item in self.rx.try_iter() {
            dirty.insert(item);
            n += 1;
        }
        n
    }

    /// Blocks until one request arrives or `timeout` elapses.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ItemId> {
        match self.rx.recv_timeout(timeout) {
            Ok(item) => Some(item),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

/// Coalescing frame-available notification for one item.
#[derive(Debug)]
pub struct FrameAvailableSignal {
    item: ItemId,
    pending: AtomicBool,
    raised: AtomicU64,
    requests: AtomicU64,
    requester: UpdateRequester,
}

impl FrameAvailableSignal {
    pub fn new(item: ItemId, requester: UpdateRequester) -> Self {
        Self {
            item,
            pending: AtomicBool::new(false),
            raised: AtomicU64::new(0),
            requests: AtomicU64::new(0),
            requester,
        }
    }

    pub fn item(&self) -> ItemId {
        self.item
    }

    /// Producer side. Returns `true` if this call queued an update request, `false` if it
    /// collapsed into one that is still pending.
    pub fn raise(&self) -> bool {
        self.raised.fetch_add(1, Ordering::Relaxed);
        if self.pending.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.requests.fetch_add(1, Ordering::Relaxed);
        if !self.requester.request_update(self.item) {
            tracing::trace!(item = %self.item, "frame available after render loop shut down");
        }
        true
    }

    /// Render side. Clears the flag and reports whether it was set.
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Total notifications received, coalesced or not.
    pub fn raised_count(&self) -> u64 {
        self.raised.load(Ordering::Relaxed)
    }

    /// Notifications that turned into a queued update request.
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }
}
