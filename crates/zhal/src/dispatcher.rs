//! Blocking entry point that turns a request into its response.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::address::DeviceAddress;
use crate::engine::Engine;
use crate::errors::ZhalError;
use crate::pending::Abandoned;
use crate::work_item::{ItemState, Outcome, WorkItem};

const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatcher");

/// Queues `request` for `address` and blocks until it completes or
/// `timeout` elapses.
pub(crate) fn send(
    engine: &Engine,
    address: DeviceAddress,
    request: Value,
    timeout: Duration,
) -> Result<Value, ZhalError> {
    let Value::Object(fields) = request else {
        return Err(ZhalError::invalid_request(format!(
            "request must be a JSON object, got {}",
            json_kind(&request)
        )));
    };
    if !engine.is_running() {
        return Err(ZhalError::Terminated { transmitted: false });
    }

    let (item, receiver) = engine.enqueue(address, fields);
    // Teardown may have drained the registries just before the push.
    if !engine.is_running() {
        return match abandon(engine, &item, &receiver) {
            Abandonment::Late(outcome) => outcome,
            Abandonment::Withdrawn { transmitted } => Err(ZhalError::Terminated { transmitted }),
        };
    }

    match receiver.recv_timeout(timeout) {
        Ok(outcome) => outcome,
        Err(RecvTimeoutError::Disconnected) => Err(ZhalError::internal(format!(
            "completion channel for request {} closed without an outcome",
            item.id()
        ))),
        Err(RecvTimeoutError::Timeout) => match abandon(engine, &item, &receiver) {
            Abandonment::Late(outcome) => outcome,
            Abandonment::Withdrawn { .. } => Err(ZhalError::Timeout {
                request_id: item.id(),
                address,
                timeout,
            }),
        },
    }
}

/// Result of withdrawing a caller's interest in its request.
#[derive(Debug)]
enum Abandonment {
    /// An outcome landed after the caller stopped waiting.
    Late(Outcome),
    /// No outcome arrived. `transmitted` is set when the command may already
    /// have reached ZigbeeCore.
    Withdrawn { transmitted: bool },
}

/// Withdraws the caller's interest in `item` from wherever it now sits.
fn abandon(engine: &Engine, item: &Arc<WorkItem>, receiver: &Receiver<Outcome>) -> Abandonment {
    let transmitted = if item.queue().withdraw(item.id()) {
        item.orphan();
        debug!(
            target: DISPATCH_TARGET,
            request_id = %item.id(),
            address = %item.address(),
            "withdrew request before transmission"
        );
        false
    } else {
        match engine.pending.abandon(item) {
            Abandoned::Unparked => {
                engine.signal.notify();
                debug!(
                    target: DISPATCH_TARGET,
                    request_id = %item.id(),
                    address = %item.address(),
                    "abandoned request awaiting response"
                );
                true
            }
            Abandoned::Orphaned(previous) => {
                debug!(
                    target: DISPATCH_TARGET,
                    request_id = %item.id(),
                    address = %item.address(),
                    state = ?previous,
                    "orphaned request held by another thread"
                );
                previous != ItemState::Queued
            }
        }
    };
    receiver
        .try_recv()
        .map_or(Abandonment::Withdrawn { transmitted }, Abandonment::Late)
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
