//! Control-plane client for the ZigbeeCore radio process.
//!
//! The gateway's device-management service calls [`Zhal::send_request`] from
//! ordinary blocking threads. Each request is queued behind any earlier
//! request for the same end-device, transmitted by a single background
//! worker over a short-lived TCP connection, and completed when ZigbeeCore
//! pushes the matching asynchronous response to the client's receiver.
//!
//! ## Request lifecycle
//!
//! 1. The dispatcher assigns a request id, pushes a work item onto the
//!    device's FIFO, and blocks on a single-use completion channel.
//! 2. The worker pops at most one item per idle device each cycle, parks it
//!    in the pending-response table, marks the device busy, and transmits.
//!    ZigbeeCore acknowledges with `{"resultCode": 0}` when it accepts the
//!    command for asynchronous processing.
//! 3. The receiver decodes inbound frames. Frames carrying a `requestId` are
//!    correlated against the pending table, which frees the device and wakes
//!    the caller. All other frames are events for the [`EventHandler`].
//!
//! A caller that times out withdraws its item from wherever it currently
//! sits. Work items are reference counted, so whichever thread drops the
//! last reference frees the item; the busy flag is always released by the
//! party that removed the item from the pending table.

mod address;
mod bootstrap;
mod client;
pub mod codec;
mod correlator;
mod dispatcher;
mod engine;
mod errors;
mod events;
mod pending;
mod protocol;
mod queue;
mod receiver;
mod signal;
mod sync;
pub mod telemetry;
mod transport;
mod work_item;
mod worker;

pub use address::{AddressParseError, DeviceAddress, RequestId};
pub use bootstrap::{
    BootstrapError, ConfigLoader, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use client::{InitError, TerminateError, Zhal};
pub use errors::ZhalError;
pub use events::{DiscardEvents, EventHandler};
pub use protocol::{Ack, REQUEST_ID_FIELD};
pub use queue::DeviceStatus;
pub use receiver::ReceiverError;
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::{TcpTransport, Transport, TransportError, TransportTimeouts};
pub use worker::WorkerError;

#[cfg(test)]
mod tests;
