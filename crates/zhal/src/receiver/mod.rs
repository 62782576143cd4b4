//! Listener for frames ZigbeeCore pushes to the client.
//!
//! The receiver binds the configured event endpoint and accepts connections
//! in a background thread. Each connection is read on its own thread as a
//! sequence of length-prefixed JSON frames until the peer closes it.

mod connection;
mod errors;
mod listener;
#[cfg(test)]
mod test_utils;

use serde_json::Value;

pub use self::errors::ReceiverError;
pub(crate) use self::listener::{FrameListener, ReceiverHandle};
#[cfg(test)]
pub(crate) use self::test_utils::RecordingHandler;

const RECEIVER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::receiver");

/// Consumes decoded inbound frames.
pub(crate) trait InboundHandler: Send + Sync + 'static {
    /// Handles one frame. Implementations should avoid panicking.
    fn handle_frame(&self, frame: Value);
}
