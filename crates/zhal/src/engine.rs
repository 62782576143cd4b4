//! Shared state of one client instance.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::Receiver;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::address::{DeviceAddress, RequestIdAllocator};
use crate::errors::ZhalError;
use crate::pending::PendingTable;
use crate::protocol::stamp_request_id;
use crate::queue::DeviceRegistry;
use crate::signal::WorkerSignal;
use crate::work_item::{Outcome, WorkItem};

const ENGINE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::engine");

/// Registries, wakeup signal, and id source shared by the dispatcher, the
/// worker, and the correlator.
pub(crate) struct Engine {
    pub(crate) registry: DeviceRegistry,
    pub(crate) pending: PendingTable,
    pub(crate) signal: WorkerSignal,
    pub(crate) ids: RequestIdAllocator,
    live_items: Arc<AtomicUsize>,
    running: AtomicBool,
    busy_lease: Option<Duration>,
}

impl Engine {
    pub(crate) fn new(busy_lease: Option<Duration>) -> Self {
        Self {
            registry: DeviceRegistry::new(),
            pending: PendingTable::new(),
            signal: WorkerSignal::new(),
            ids: RequestIdAllocator::new(),
            live_items: Arc::new(AtomicUsize::new(0)),
            running: AtomicBool::new(true),
            busy_lease,
        }
    }

    /// Work items not yet freed.
    pub(crate) fn live_count(&self) -> usize {
        self.live_items.load(Ordering::SeqCst)
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub(crate) const fn busy_lease(&self) -> Option<Duration> {
        self.busy_lease
    }

    /// Assigns a request id, queues the request behind earlier ones for
    /// `address`, and wakes the worker.
    pub(crate) fn enqueue(
        &self,
        address: DeviceAddress,
        fields: Map<String, Value>,
    ) -> (Arc<WorkItem>, Receiver<Outcome>) {
        let id = self.ids.next();
        let queue = self.registry.get_or_create(address);
        let (item, receiver) = WorkItem::new(
            id,
            stamp_request_id(fields, id),
            Arc::clone(&queue),
            Arc::clone(&self.live_items),
        );
        queue.push(Arc::clone(&item));
        debug!(
            target: ENGINE_TARGET,
            request_id = %id,
            address = %address,
            "request queued"
        );
        self.signal.notify();
        (item, receiver)
    }

    /// Stops accepting requests; returns `false` if already stopped.
    pub(crate) fn stop(&self) -> bool {
        self.running.swap(false, Ordering::SeqCst)
    }

    /// Empties the registries and fails every caller still waiting.
    pub(crate) fn release_all(&self) {
        let queued = self.registry.drain();
        let parked = self.pending.drain();
        if !parked.is_empty() {
            warn!(
                target: ENGINE_TARGET,
                dropped = parked.len(),
                "discarding requests awaiting responses"
            );
        }
        for item in queued {
            item.complete(Err(ZhalError::Terminated { transmitted: false }));
        }
        for item in parked {
            item.complete(Err(ZhalError::Terminated { transmitted: true }));
        }
    }
}
