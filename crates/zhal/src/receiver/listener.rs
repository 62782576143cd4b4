//! Accept loop for the event endpoint.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

use tracing::{info, warn};
use zhal_config::TcpEndpoint;

use super::connection::{self, OpenConnections};
use super::{InboundHandler, RECEIVER_TARGET, ReceiverError};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);
const RECEIVER_THREAD_NAME: &str = "zhal-receiver";
const READER_THREAD_NAME: &str = "zhal-receiver-conn";

/// Listener bound to the event endpoint but not yet accepting.
#[derive(Debug)]
pub(crate) struct FrameListener {
    endpoint: TcpEndpoint,
    listener: TcpListener,
}

impl FrameListener {
    pub(crate) fn bind(endpoint: &TcpEndpoint) -> Result<Self, ReceiverError> {
        let addr = endpoint
            .resolve()
            .map_err(|source| ReceiverError::Resolve { source })?;
        let listener =
            TcpListener::bind(addr).map_err(|source| ReceiverError::Bind { addr, source })?;
        Ok(Self {
            endpoint: endpoint.clone(),
            listener,
        })
    }

    /// Address actually bound, which differs from the endpoint for port 0.
    pub(crate) fn local_addr(&self) -> Result<SocketAddr, ReceiverError> {
        self.listener
            .local_addr()
            .map_err(|source| ReceiverError::LocalAddr { source })
    }

    pub(crate) fn start(
        self,
        handler: Arc<dyn InboundHandler>,
    ) -> Result<ReceiverHandle, ReceiverError> {
        self.listener
            .set_nonblocking(true)
            .map_err(|source| ReceiverError::NonBlocking { source })?;
        let shutdown = Arc::new(AtomicBool::new(false));
        let connections = Arc::new(OpenConnections::default());
        let loop_shutdown = Arc::clone(&shutdown);
        let loop_connections = Arc::clone(&connections);
        let handle = thread::Builder::new()
            .name(RECEIVER_THREAD_NAME.to_owned())
            .spawn(move || run_accept_loop(&self, &loop_shutdown, &loop_connections, &handler))
            .map_err(|source| ReceiverError::Spawn { source })?;
        Ok(ReceiverHandle {
            shutdown,
            connections,
            handle: Some(handle),
        })
    }
}

/// Handle to the background accept thread.
pub(crate) struct ReceiverHandle {
    shutdown: Arc<AtomicBool>,
    connections: Arc<OpenConnections>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ReceiverHandle {
    /// Stops accepting and closes every open inbound connection.
    ///
    /// [`join`](Self::join) returns once every connection reader has exited.
    pub(crate) fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.connections.close_all();
    }

    pub(crate) fn join(mut self) -> Result<(), ReceiverError> {
        self.handle.take().map_or(Ok(()), |handle| {
            handle.join().map_err(|_| ReceiverError::ThreadPanic)
        })
    }
}

impl Drop for ReceiverHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_accept_loop(
    listener: &FrameListener,
    shutdown: &Arc<AtomicBool>,
    connections: &Arc<OpenConnections>,
    handler: &Arc<dyn InboundHandler>,
) {
    info!(
        target: RECEIVER_TARGET,
        endpoint = %listener.endpoint,
        "event receiver active"
    );
    let mut last_error = None::<io::ErrorKind>;
    let mut readers = Vec::new();
    while !shutdown.load(Ordering::SeqCst) {
        match accept_connection(&listener.listener) {
            Ok(Some(stream)) => {
                last_error = None;
                let tracked = connections.register(&stream);
                // A shutdown that raced this accept may already have swept the
                // open set; the final sweep below closes this stream.
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }
                if let Some(reader) = spawn_reader(stream, tracked, shutdown, connections, handler)
                {
                    readers.push(reader);
                }
            }
            Ok(None) => thread::sleep(ACCEPT_BACKOFF),
            Err(error) => {
                let kind = error.kind();
                if last_error != Some(kind) {
                    warn!(
                        target: RECEIVER_TARGET,
                        error = %error,
                        "event accept error"
                    );
                }
                last_error = Some(kind);
                thread::sleep(ERROR_BACKOFF);
            }
        }
        readers.retain(|reader| !reader.is_finished());
    }
    connections.close_all();
    for reader in readers {
        if reader.join().is_err() {
            warn!(target: RECEIVER_TARGET, "inbound connection reader panicked");
        }
    }
    info!(target: RECEIVER_TARGET, "event receiver stopped");
}

fn spawn_reader(
    stream: TcpStream,
    tracked: Option<u64>,
    shutdown: &Arc<AtomicBool>,
    connections: &Arc<OpenConnections>,
    handler: &Arc<dyn InboundHandler>,
) -> Option<thread::JoinHandle<()>> {
    let reader_handler = Arc::clone(handler);
    let reader_connections = Arc::clone(connections);
    let reader_shutdown = Arc::clone(shutdown);
    let spawned = thread::Builder::new()
        .name(READER_THREAD_NAME.to_owned())
        .spawn(move || {
            connection::serve(
                stream,
                tracked,
                reader_handler.as_ref(),
                &reader_connections,
                &reader_shutdown,
            );
        });
    spawned
        .map_err(|error| {
            warn!(
                target: RECEIVER_TARGET,
                error = %error,
                "cannot spawn reader for inbound connection"
            );
            if let Some(id) = tracked {
                connections.forget(id);
            }
        })
        .ok()
}

fn accept_connection(listener: &TcpListener) -> Result<Option<TcpStream>, io::Error> {
    match listener.accept() {
        Ok((stream, _)) => {
            stream.set_nonblocking(false)?;
            Ok(Some(stream))
        }
        Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
        Err(error) => Err(error),
    }
}
