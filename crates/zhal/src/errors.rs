//! Failures surfaced to callers of [`crate::Zhal::send_request`].

use std::time::Duration;

use thiserror::Error;

use crate::address::{DeviceAddress, RequestId};
use crate::transport::TransportError;

/// Outcome of a request that did not produce a response document.
#[derive(Debug, Error)]
pub enum ZhalError {
    /// The command never reached ZigbeeCore, or ZigbeeCore refused it.
    ///
    /// Reported as soon as the worker's transmit step fails, without waiting
    /// out the caller's timeout.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// No response arrived before the caller's deadline.
    ///
    /// The command may still be executing on the device.
    #[error("request {request_id} to {address} timed out after {timeout:?}")]
    Timeout {
        /// Request that timed out.
        request_id: RequestId,
        /// Device the request targeted.
        address: DeviceAddress,
        /// Deadline the caller supplied.
        timeout: Duration,
    },

    /// The device stayed busy past its lease and was released.
    #[error("request {request_id} to {address} exceeded the {lease:?} busy lease")]
    LeaseExpired {
        /// Request whose lease expired.
        request_id: RequestId,
        /// Device that was released.
        address: DeviceAddress,
        /// Configured lease.
        lease: Duration,
    },

    /// The client was terminated before the request completed.
    ///
    /// When `transmitted` is set ZigbeeCore had already accepted the command,
    /// so it may still take effect.
    #[error("client terminated (request transmitted: {transmitted})")]
    Terminated {
        /// Whether the command had been handed to ZigbeeCore.
        transmitted: bool,
    },

    /// The request document cannot be sent.
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// Reason for the rejection.
        message: String,
    },

    /// An internal invariant failed.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the failure.
        message: String,
    },
}

impl ZhalError {
    /// Returns `true` when the command definitely did not run.
    ///
    /// Timeouts, expired leases, and terminations after transmission return
    /// `false`: ZigbeeCore accepted or may have accepted the command, so it
    /// may still take effect.
    #[must_use]
    pub const fn is_definite(&self) -> bool {
        !matches!(
            self,
            Self::Timeout { .. }
                | Self::LeaseExpired { .. }
                | Self::Terminated { transmitted: true }
        )
    }

    /// Creates an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
