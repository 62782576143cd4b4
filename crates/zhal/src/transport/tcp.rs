//! One-connection-per-command TCP transport.

use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use serde_json::Value;
use tracing::debug;
use zhal_config::{Config, TcpEndpoint};

use super::{TRANSPORT_TARGET, Transport, TransportError};
use crate::address::RequestId;
use crate::codec::{self, FrameError, HEADER_BYTES};
use crate::protocol::Ack;

/// Socket timeouts for the synchronous handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportTimeouts {
    /// Bound on establishing the connection.
    pub connect: Duration,
    /// Bound on writing the command frame.
    pub send: Duration,
    /// Bound on reading the acknowledgement.
    pub receive: Duration,
}

impl TransportTimeouts {
    /// Reads the timeouts from the client configuration.
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self {
            connect: config.connect_timeout(),
            send: config.send_timeout(),
            receive: config.receive_timeout(),
        }
    }
}

/// Transport that dials ZigbeeCore afresh for every command.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    endpoint: TcpEndpoint,
    timeouts: TransportTimeouts,
}

impl TcpTransport {
    /// Builds a transport for `endpoint`.
    #[must_use]
    pub const fn new(endpoint: TcpEndpoint, timeouts: TransportTimeouts) -> Self {
        Self { endpoint, timeouts }
    }

    /// Builds a transport for the configured ZigbeeCore endpoint.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.core_endpoint(),
            TransportTimeouts::from_config(config),
        )
    }

    /// Endpoint commands are sent to.
    #[must_use]
    pub const fn endpoint(&self) -> &TcpEndpoint {
        &self.endpoint
    }

    fn connect(&self) -> Result<TcpStream, TransportError> {
        let addr = self
            .endpoint
            .resolve()
            .map_err(|source| TransportError::Resolve { source })?;
        let connect_error = |source| TransportError::Connect {
            endpoint: self.endpoint.to_string(),
            source,
        };
        let stream = TcpStream::connect_timeout(&addr, self.timeouts.connect).map_err(connect_error)?;
        stream
            .set_write_timeout(Some(self.timeouts.send))
            .map_err(connect_error)?;
        stream
            .set_read_timeout(Some(self.timeouts.receive))
            .map_err(connect_error)?;
        stream.set_nodelay(true).map_err(connect_error)?;
        Ok(stream)
    }
}

impl Transport for TcpTransport {
    fn transmit(&self, request_id: RequestId, request: &Value) -> Result<(), TransportError> {
        // Encode first so an oversized command never opens a connection.
        let frame = codec::encode_frame(request)
            .map_err(|source| TransportError::Send { request_id, source })?;
        let mut stream = self.connect()?;

        std::io::Write::write_all(&mut stream, &frame).map_err(|source| TransportError::Send {
            request_id,
            source: FrameError::Io(source),
        })?;

        let ack: Ack = codec::read_frame(&mut stream)
            .map_err(|source| TransportError::Receive { request_id, source })?
            .ok_or(TransportError::Receive {
                request_id,
                source: FrameError::Truncated {
                    expected: HEADER_BYTES,
                    received: 0,
                },
            })?;

        if let Err(error) = stream.shutdown(Shutdown::Both) {
            debug!(
                target: TRANSPORT_TARGET,
                request_id = %request_id,
                error = %error,
                "ignoring shutdown failure on command connection"
            );
        }

        if !ack.accepted() {
            return Err(TransportError::Reject {
                request_id,
                result_code: ack.result_code,
            });
        }

        debug!(
            target: TRANSPORT_TARGET,
            request_id = %request_id,
            endpoint = %self.endpoint,
            "command accepted"
        );
        Ok(())
    }
}
