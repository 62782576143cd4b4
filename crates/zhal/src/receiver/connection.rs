//! Per-connection frame reading.

use std::collections::HashMap;
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use serde_json::Value;
use tracing::{debug, warn};

use super::{InboundHandler, RECEIVER_TARGET};
use crate::codec::{self, FrameError};
use crate::sync::lock;

/// Open inbound connections, kept so shutdown can unblock their readers.
#[derive(Debug, Default)]
pub(super) struct OpenConnections {
    next: AtomicU64,
    streams: Mutex<HashMap<u64, TcpStream>>,
}

impl OpenConnections {
    /// Tracks a clone of `stream` so [`close_all`](Self::close_all) can reach
    /// it; returns the id to [`forget`](Self::forget) it by.
    pub(super) fn register(&self, stream: &TcpStream) -> Option<u64> {
        let id = self.next.fetch_add(1, Ordering::Relaxed);
        let clone = stream
            .try_clone()
            .map_err(|error| {
                warn!(
                    target: RECEIVER_TARGET,
                    error = %error,
                    "cannot track inbound connection"
                );
            })
            .ok()?;
        lock(&self.streams, "open connections").insert(id, clone);
        Some(id)
    }

    pub(super) fn forget(&self, id: u64) {
        lock(&self.streams, "open connections").remove(&id);
    }

    /// Shuts down every tracked stream.
    pub(super) fn close_all(&self) {
        let streams = std::mem::take(&mut *lock(&self.streams, "open connections"));
        for stream in streams.into_values() {
            if let Err(error) = stream.shutdown(Shutdown::Both) {
                debug!(
                    target: RECEIVER_TARGET,
                    error = %error,
                    "inbound connection already closed"
                );
            }
        }
    }
}

/// Reads frames from `stream` until EOF, a malformed frame, or shutdown.
///
/// `tracked` is the id `stream` was registered under, if any.
pub(super) fn serve(
    mut stream: TcpStream,
    tracked: Option<u64>,
    handler: &dyn InboundHandler,
    connections: &OpenConnections,
    shutdown: &AtomicBool,
) {
    let peer = stream
        .peer_addr()
        .map_or_else(|_| "unknown".to_owned(), |addr| addr.to_string());
    debug!(target: RECEIVER_TARGET, peer = %peer, "inbound connection opened");

    loop {
        match codec::read_frame::<_, Value>(&mut stream) {
            Ok(Some(frame)) => {
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }
                handler.handle_frame(frame);
            }
            Ok(None) => break,
            Err(FrameError::Io(error)) if shutdown.load(Ordering::SeqCst) => {
                debug!(
                    target: RECEIVER_TARGET,
                    peer = %peer,
                    error = %error,
                    "inbound connection closed by shutdown"
                );
                break;
            }
            Err(error) => {
                warn!(
                    target: RECEIVER_TARGET,
                    peer = %peer,
                    error = %error,
                    "closing inbound connection after bad frame"
                );
                break;
            }
        }
    }

    if let Some(id) = tracked {
        connections.forget(id);
    }
    debug!(target: RECEIVER_TARGET, peer = %peer, "inbound connection closed");
}
