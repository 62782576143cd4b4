//! Table of transmitted requests awaiting their responses.
//!
//! Whoever removes an item from this table also frees its device: the
//! correlator on a response, the worker on a transmit failure or an expired
//! lease, and the dispatcher when its caller gives up.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::address::RequestId;
use crate::sync::lock;
use crate::work_item::{ItemState, WorkItem};

struct Parked {
    item: Arc<WorkItem>,
    since: Instant,
}

/// What the dispatcher found when its caller gave up.
#[derive(Debug)]
pub(crate) enum Abandoned {
    /// The item was parked; it has been removed and its device released.
    Unparked,
    /// The item was not parked and is now orphaned; the state it held
    /// before is attached.
    Orphaned(ItemState),
}

#[derive(Default)]
pub(crate) struct PendingTable {
    entries: Mutex<HashMap<RequestId, Parked>>,
}

impl PendingTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Moves a claimed item in flight and records it as pending.
    ///
    /// Fails when the caller abandoned the item after the worker claimed it;
    /// the state check and the insert share one critical section so the
    /// dispatcher's [`abandon`](Self::abandon) sees one or the other.
    pub(crate) fn park(&self, item: &Arc<WorkItem>) -> bool {
        let mut entries = lock(&self.entries, "pending table");
        if !item.begin_flight() {
            return false;
        }
        entries.insert(
            item.id(),
            Parked {
                item: Arc::clone(item),
                since: Instant::now(),
            },
        );
        true
    }

    /// Removes the item for `id` and frees its device.
    pub(crate) fn remove(&self, id: RequestId) -> Option<Arc<WorkItem>> {
        let parked = lock(&self.entries, "pending table").remove(&id)?;
        parked.item.queue().release(id);
        Some(parked.item)
    }

    /// Withdraws a caller's interest in `item`.
    pub(crate) fn abandon(&self, item: &WorkItem) -> Abandoned {
        let mut entries = lock(&self.entries, "pending table");
        if let Some(parked) = entries.remove(&item.id()) {
            drop(entries);
            parked.item.queue().release(item.id());
            parked.item.orphan();
            return Abandoned::Unparked;
        }
        Abandoned::Orphaned(item.orphan())
    }

    /// Removes every item parked for longer than `lease` and frees their
    /// devices.
    pub(crate) fn reap_expired(&self, lease: Duration) -> Vec<Arc<WorkItem>> {
        let now = Instant::now();
        let mut entries = lock(&self.entries, "pending table");
        let expired: Vec<RequestId> = entries
            .iter()
            .filter(|(_, parked)| now.duration_since(parked.since) >= lease)
            .map(|(id, _)| *id)
            .collect();
        let reaped: Vec<Arc<WorkItem>> = expired
            .into_iter()
            .filter_map(|id| entries.remove(&id))
            .map(|parked| parked.item)
            .collect();
        drop(entries);
        for item in &reaped {
            item.queue().release(item.id());
        }
        reaped
    }

    /// Removes every parked item.
    pub(crate) fn drain(&self) -> Vec<Arc<WorkItem>> {
        lock(&self.entries, "pending table")
            .drain()
            .map(|(_, parked)| parked.item)
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        lock(&self.entries, "pending table").len()
    }
}
