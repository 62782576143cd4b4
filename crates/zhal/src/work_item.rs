//! In-flight request records and their completion handoff.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, SyncSender, sync_channel};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::address::{DeviceAddress, RequestId};
use crate::errors::ZhalError;
use crate::queue::DeviceQueue;
use crate::sync::lock;

/// Result delivered to a waiting caller.
pub(crate) type Outcome = Result<Value, ZhalError>;

/// Lifecycle of a [`WorkItem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ItemState {
    /// Waiting in its device FIFO.
    Queued,
    /// Registered as pending and handed to the transport.
    InFlight,
    /// An outcome was delivered to the caller.
    Completed,
    /// The caller stopped waiting before an outcome was delivered.
    Orphaned,
}

struct ItemInner {
    state: ItemState,
    completion: Option<SyncSender<Outcome>>,
}

/// One outstanding command.
///
/// Shared through `Arc` between the device FIFO or pending table, the worker,
/// and the dispatcher; the last holder to drop it frees it.
pub(crate) struct WorkItem {
    id: RequestId,
    address: DeviceAddress,
    request: Value,
    queue: Arc<DeviceQueue>,
    inner: Mutex<ItemInner>,
    live: Arc<AtomicUsize>,
}

impl WorkItem {
    /// Builds an item and the receiver its caller blocks on.
    ///
    /// The channel exists before the item is shared, so no completer can
    /// signal ahead of the caller's wait.
    pub(crate) fn new(
        id: RequestId,
        request: Value,
        queue: Arc<DeviceQueue>,
        live: Arc<AtomicUsize>,
    ) -> (Arc<Self>, Receiver<Outcome>) {
        let (sender, receiver) = sync_channel(1);
        live.fetch_add(1, Ordering::SeqCst);
        let item = Arc::new(Self {
            id,
            address: queue.address(),
            request,
            queue,
            inner: Mutex::new(ItemInner {
                state: ItemState::Queued,
                completion: Some(sender),
            }),
            live,
        });
        (item, receiver)
    }

    pub(crate) const fn id(&self) -> RequestId {
        self.id
    }

    pub(crate) const fn address(&self) -> DeviceAddress {
        self.address
    }

    pub(crate) const fn request(&self) -> &Value {
        &self.request
    }

    pub(crate) fn queue(&self) -> &DeviceQueue {
        &self.queue
    }

    pub(crate) fn state(&self) -> ItemState {
        lock(&self.inner, "work item").state
    }

    /// Moves a queued item in flight; fails when its caller already left.
    pub(crate) fn begin_flight(&self) -> bool {
        let mut inner = lock(&self.inner, "work item");
        if inner.state != ItemState::Queued {
            return false;
        }
        inner.state = ItemState::InFlight;
        true
    }

    /// Delivers `outcome` to the caller.
    ///
    /// Returns `false` when the caller has been marked orphaned or an outcome
    /// was already delivered; the outcome is then dropped.
    pub(crate) fn complete(&self, outcome: Outcome) -> bool {
        let mut inner = lock(&self.inner, "work item");
        if matches!(inner.state, ItemState::Orphaned | ItemState::Completed) {
            return false;
        }
        inner.state = ItemState::Completed;
        let Some(sender) = inner.completion.take() else {
            return false;
        };
        // The channel holds one outcome and this is the only send, so a
        // failure means the caller dropped its receiver.
        sender.try_send(outcome).is_ok()
    }

    /// Marks the caller as gone and returns the state it replaced.
    ///
    /// A completed item keeps its state.
    pub(crate) fn orphan(&self) -> ItemState {
        let mut inner = lock(&self.inner, "work item");
        let previous = inner.state;
        if previous != ItemState::Completed {
            inner.state = ItemState::Orphaned;
            inner.completion = None;
        }
        previous
    }
}

impl Drop for WorkItem {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for WorkItem {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("WorkItem")
            .field("id", &self.id)
            .field("address", &self.address)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
