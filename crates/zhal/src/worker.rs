//! Background thread that moves queued requests onto the wire.
//!
//! Each cycle claims the head of every idle device queue, then transmits the
//! batch one command at a time. A device stays claimed from the moment its
//! head is popped until the request leaves the pending table, so no device
//! ever has two commands in flight.

use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::engine::Engine;
use crate::errors::ZhalError;
use crate::signal::Wake;
use crate::transport::Transport;
use crate::work_item::WorkItem;

const WORKER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::worker");
const WORKER_THREAD_NAME: &str = "zhal-worker";
const LEASE_POLL_CEILING: Duration = Duration::from_millis(200);

/// Errors raised while starting or stopping the worker thread.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The operating system refused to start the thread.
    #[error("failed to spawn worker thread: {source}")]
    Spawn {
        /// Underlying spawn failure.
        #[source]
        source: io::Error,
    },
    /// The worker thread panicked.
    #[error("worker thread panicked")]
    ThreadPanic,
}

/// Spawns the worker thread for `engine`.
pub(crate) fn spawn(
    engine: Arc<Engine>,
    transport: Arc<dyn Transport>,
) -> Result<WorkerHandle, WorkerError> {
    let loop_engine = Arc::clone(&engine);
    let handle = thread::Builder::new()
        .name(WORKER_THREAD_NAME.to_owned())
        .spawn(move || run(&loop_engine, transport.as_ref()))
        .map_err(|source| WorkerError::Spawn { source })?;
    Ok(WorkerHandle {
        engine,
        handle: Some(handle),
    })
}

/// Handle to the background worker thread.
pub(crate) struct WorkerHandle {
    engine: Arc<Engine>,
    handle: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    pub(crate) fn shutdown(&self) {
        self.engine.signal.shutdown();
    }

    pub(crate) fn join(mut self) -> Result<(), WorkerError> {
        self.handle.take().map_or(Ok(()), |handle| {
            handle.join().map_err(|_| WorkerError::ThreadPanic)
        })
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.engine.signal.shutdown();
    }
}

fn run(engine: &Engine, transport: &dyn Transport) {
    let poll = engine
        .busy_lease()
        .map(|lease| lease.min(LEASE_POLL_CEILING));
    info!(target: WORKER_TARGET, lease = ?engine.busy_lease(), "worker started");

    let mut rescan = true;
    loop {
        if rescan {
            if engine.signal.is_shutdown() {
                break;
            }
        } else if engine.signal.wait(poll) == Wake::Shutdown {
            break;
        }

        let reaped = engine
            .busy_lease()
            .map_or(0, |lease| reap_expired(engine, lease));
        let batch = engine.registry.harvest();
        rescan = reaped > 0 || !batch.is_empty();
        for item in batch {
            if engine.is_running() && !engine.signal.is_shutdown() {
                process(engine, transport, &item);
            } else {
                withhold(&item);
            }
        }
    }

    info!(target: WORKER_TARGET, "worker stopped");
}

fn process(engine: &Engine, transport: &dyn Transport, item: &Arc<WorkItem>) {
    if !engine.pending.park(item) {
        item.queue().release(item.id());
        debug!(
            target: WORKER_TARGET,
            request_id = %item.id(),
            address = %item.address(),
            "skipping abandoned request"
        );
        return;
    }

    match transport.transmit(item.id(), item.request()) {
        Ok(()) => debug!(
            target: WORKER_TARGET,
            request_id = %item.id(),
            address = %item.address(),
            "request transmitted"
        ),
        Err(error) => {
            warn!(
                target: WORKER_TARGET,
                request_id = %item.id(),
                address = %item.address(),
                error = %error,
                "transmit failed"
            );
            // A response or timeout may already have claimed the item.
            if engine.pending.remove(item.id()).is_some() {
                item.complete(Err(ZhalError::from(error)));
            }
        }
    }
}

/// Fails a claimed item without transmitting it once teardown has begun.
fn withhold(item: &WorkItem) {
    item.queue().release(item.id());
    debug!(
        target: WORKER_TARGET,
        request_id = %item.id(),
        address = %item.address(),
        "withholding request during shutdown"
    );
    item.complete(Err(ZhalError::Terminated { transmitted: false }));
}

fn reap_expired(engine: &Engine, lease: Duration) -> usize {
    let reaped = engine.pending.reap_expired(lease);
    for item in &reaped {
        warn!(
            target: WORKER_TARGET,
            request_id = %item.id(),
            address = %item.address(),
            lease = ?lease,
            "busy lease expired, releasing device"
        );
        item.complete(Err(ZhalError::LeaseExpired {
            request_id: item.id(),
            address: item.address(),
            lease,
        }));
    }
    reaped.len()
}
