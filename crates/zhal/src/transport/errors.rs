//! Error types for the command transport.

use std::io;

use thiserror::Error;
use zhal_config::EndpointError;

use crate::address::RequestId;
use crate::codec::FrameError;

/// Failures of the synchronous transmit handshake.
///
/// Every variant means ZigbeeCore did not accept the command, so the caller
/// can treat it as definitely not executed.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The ZigbeeCore endpoint could not be resolved.
    #[error("failed to resolve ZigbeeCore endpoint: {source}")]
    Resolve {
        /// Resolver failure.
        #[source]
        source: EndpointError,
    },

    /// The TCP connection could not be established or configured.
    #[error("failed to connect to ZigbeeCore at {endpoint}: {source}")]
    Connect {
        /// Endpoint being dialled.
        endpoint: String,
        /// Socket error.
        #[source]
        source: io::Error,
    },

    /// The command frame could not be encoded or written.
    #[error("failed to send request {request_id}: {source}")]
    Send {
        /// Request being sent.
        request_id: RequestId,
        /// Framing or socket error.
        #[source]
        source: FrameError,
    },

    /// The acknowledgement could not be read or decoded.
    #[error("failed to receive acknowledgement for request {request_id}: {source}")]
    Receive {
        /// Request awaiting acknowledgement.
        request_id: RequestId,
        /// Framing or socket error, including short reads.
        #[source]
        source: FrameError,
    },

    /// ZigbeeCore answered with a non-zero result code.
    #[error("ZigbeeCore rejected request {request_id} with result code {result_code}")]
    Reject {
        /// Rejected request.
        request_id: RequestId,
        /// Result code from the acknowledgement.
        result_code: i64,
    },
}
