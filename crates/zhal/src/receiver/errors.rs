//! Error types for the inbound frame receiver.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;
use zhal_config::EndpointError;

/// Errors surfaced while binding or running the receiver.
#[derive(Debug, Error)]
pub enum ReceiverError {
    /// The configured event endpoint did not resolve.
    #[error("failed to resolve event endpoint: {source}")]
    Resolve {
        /// Resolution failure.
        #[source]
        source: EndpointError,
    },
    /// The listening socket could not be bound.
    #[error("failed to bind event listener at {addr}: {source}")]
    Bind {
        /// Address the bind was attempted on.
        addr: SocketAddr,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },
    /// The bound socket could not report its address.
    #[error("failed to read event listener address: {source}")]
    LocalAddr {
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },
    /// The listener could not be switched to non-blocking mode.
    #[error("failed to enable non-blocking listener: {source}")]
    NonBlocking {
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },
    /// The accept thread could not be started.
    #[error("failed to spawn receiver thread: {source}")]
    Spawn {
        /// Underlying spawn failure.
        #[source]
        source: io::Error,
    },
    /// The accept thread panicked.
    #[error("receiver thread panicked")]
    ThreadPanic,
}
