//! Command transport towards ZigbeeCore.
//!
//! Each command uses its own TCP connection: the request frame is written,
//! the synchronous acknowledgement is read, and the connection is closed.
//! Socket timeouts bound only this handshake; the asynchronous response
//! arrives later through the receiver.

mod errors;
mod tcp;

use serde_json::Value;

use crate::address::RequestId;

pub use self::errors::TransportError;
pub use self::tcp::{TcpTransport, TransportTimeouts};

const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");

/// Delivers one command to ZigbeeCore and waits for its acknowledgement.
///
/// The worker calls this synchronously, one command at a time.
/// Implementations must not retry: commands are not always idempotent.
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send + Sync {
    /// Transmits `request`, already stamped with `request_id`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the command was not accepted.
    fn transmit(&self, request_id: RequestId, request: &Value) -> Result<(), TransportError>;
}
