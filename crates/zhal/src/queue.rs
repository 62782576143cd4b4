//! Per-device FIFOs and the busy flag that serializes each device.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::address::{DeviceAddress, RequestId};
use crate::sync::lock;
use crate::work_item::WorkItem;

const QUEUE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::queue");

/// Point-in-time view of one device queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceStatus {
    /// Device the queue serves.
    pub address: DeviceAddress,
    /// Requests waiting behind the in-flight one.
    pub queued: usize,
    /// Whether a request to this device is awaiting its response.
    pub busy: bool,
}

#[derive(Default)]
struct QueueState {
    fifo: VecDeque<Arc<WorkItem>>,
    busy: Option<RequestId>,
}

/// Requests waiting for one device, plus the id currently holding it.
pub(crate) struct DeviceQueue {
    address: DeviceAddress,
    state: Mutex<QueueState>,
}

impl DeviceQueue {
    pub(crate) fn new(address: DeviceAddress) -> Self {
        Self {
            address,
            state: Mutex::new(QueueState::default()),
        }
    }

    pub(crate) const fn address(&self) -> DeviceAddress {
        self.address
    }

    pub(crate) fn push(&self, item: Arc<WorkItem>) {
        lock(&self.state, "device queue").fifo.push_back(item);
    }

    /// Pops the head item and claims the device for it.
    ///
    /// Returns `None` while the device is busy or the FIFO is empty.
    pub(crate) fn take_ready(&self) -> Option<Arc<WorkItem>> {
        let mut state = lock(&self.state, "device queue");
        if state.busy.is_some() {
            return None;
        }
        let item = state.fifo.pop_front()?;
        state.busy = Some(item.id());
        Some(item)
    }

    /// Removes a still-queued item; `false` once the worker has taken it.
    pub(crate) fn withdraw(&self, id: RequestId) -> bool {
        let mut state = lock(&self.state, "device queue");
        let Some(position) = state.fifo.iter().position(|item| item.id() == id) else {
            return false;
        };
        state.fifo.remove(position);
        true
    }

    /// Frees the device if `id` holds it.
    pub(crate) fn release(&self, id: RequestId) -> bool {
        let mut state = lock(&self.state, "device queue");
        if state.busy != Some(id) {
            return false;
        }
        state.busy = None;
        true
    }

    #[cfg(test)]
    pub(crate) fn is_busy(&self) -> bool {
        lock(&self.state, "device queue").busy.is_some()
    }

    fn status(&self) -> DeviceStatus {
        let state = lock(&self.state, "device queue");
        DeviceStatus {
            address: self.address,
            queued: state.fifo.len(),
            busy: state.busy.is_some(),
        }
    }

    /// Empties the FIFO and clears the busy flag.
    pub(crate) fn drain(&self) -> Vec<Arc<WorkItem>> {
        let mut state = lock(&self.state, "device queue");
        state.busy = None;
        state.fifo.drain(..).collect()
    }
}

/// Device queues keyed by address, created on first use.
#[derive(Default)]
pub(crate) struct DeviceRegistry {
    queues: Mutex<BTreeMap<DeviceAddress, Arc<DeviceQueue>>>,
}

impl DeviceRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns the queue for `address`, creating it on first use.
    pub(crate) fn get_or_create(&self, address: DeviceAddress) -> Arc<DeviceQueue> {
        let mut queues = lock(&self.queues, "device registry");
        Arc::clone(
            queues
                .entry(address)
                .or_insert_with(|| Arc::new(DeviceQueue::new(address))),
        )
    }

    /// Claims the head of every idle, non-empty device queue.
    pub(crate) fn harvest(&self) -> Vec<Arc<WorkItem>> {
        lock(&self.queues, "device registry")
            .values()
            .filter_map(|queue| queue.take_ready())
            .collect()
    }

    pub(crate) fn snapshot(&self) -> Vec<DeviceStatus> {
        lock(&self.queues, "device registry")
            .values()
            .map(|queue| queue.status())
            .collect()
    }

    /// Removes every queue and returns the items still waiting in them.
    pub(crate) fn drain(&self) -> Vec<Arc<WorkItem>> {
        let queues = std::mem::take(&mut *lock(&self.queues, "device registry"));
        let mut drained = Vec::new();
        for (address, queue) in queues {
            let items = queue.drain();
            if !items.is_empty() {
                warn!(
                    target: QUEUE_TARGET,
                    address = %address,
                    dropped = items.len(),
                    "discarding queued requests"
                );
            }
            drained.extend(items);
        }
        drained
    }
}
