//! Client lifecycle: one engine, its worker thread, and its receiver.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};
use zhal_config::{Config, ConfigError};

use crate::address::DeviceAddress;
use crate::correlator::correlate;
use crate::dispatcher;
use crate::engine::Engine;
use crate::errors::ZhalError;
use crate::events::EventHandler;
use crate::protocol::request_id_of;
use crate::queue::DeviceStatus;
use crate::receiver::{FrameListener, InboundHandler, ReceiverError, ReceiverHandle};
use crate::sync::lock;
use crate::transport::{TcpTransport, Transport};
use crate::worker::{self, WorkerError, WorkerHandle};

const CLIENT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::client");

/// Errors raised by [`Zhal::init`].
#[derive(Debug, Error)]
pub enum InitError {
    /// The configuration holds values the client cannot run with.
    #[error("invalid configuration: {source}")]
    Config {
        /// Validation failure.
        #[source]
        source: ConfigError,
    },
    /// The event receiver could not be started.
    #[error("failed to start event receiver: {source}")]
    Receiver {
        /// Receiver failure.
        #[source]
        source: ReceiverError,
    },
    /// The worker thread could not be started.
    #[error("failed to start worker: {source}")]
    Worker {
        /// Worker failure.
        #[source]
        source: WorkerError,
    },
}

/// Errors raised by [`Zhal::terminate`].
///
/// The registries are released even when one of these is returned.
#[derive(Debug, Error)]
pub enum TerminateError {
    /// The receiver thread did not stop cleanly.
    #[error("event receiver did not stop cleanly: {source}")]
    Receiver {
        /// Receiver failure.
        #[source]
        source: ReceiverError,
    },
    /// The worker thread did not stop cleanly.
    #[error("worker did not stop cleanly: {source}")]
    Worker {
        /// Worker failure.
        #[source]
        source: WorkerError,
    },
}

/// Routes inbound frames: responses to the correlator, the rest to the
/// event handler.
struct InboundRouter {
    engine: Arc<Engine>,
    events: Arc<dyn EventHandler>,
}

impl InboundHandler for InboundRouter {
    fn handle_frame(&self, frame: Value) {
        if let Some(request_id) = request_id_of(&frame) {
            correlate(&self.engine, request_id, frame);
        } else if self.engine.is_running() {
            self.events.handle_event(frame);
        } else {
            debug!(target: CLIENT_TARGET, "dropping event received after terminate");
        }
    }
}

struct Threads {
    worker: WorkerHandle,
    receiver: ReceiverHandle,
}

/// A running ZigbeeCore client.
///
/// `send_request` may be called from any number of threads. Dropping the
/// client terminates it.
pub struct Zhal {
    engine: Arc<Engine>,
    router: Arc<InboundRouter>,
    threads: Mutex<Option<Threads>>,
    receiver_addr: SocketAddr,
}

impl Zhal {
    /// Starts a client that sends commands over TCP to the configured
    /// ZigbeeCore endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`InitError`] when the configuration is invalid, the event
    /// endpoint cannot be bound, or the worker cannot be spawned.
    pub fn init(config: &Config, events: Arc<dyn EventHandler>) -> Result<Self, InitError> {
        Self::init_with(config, Arc::new(TcpTransport::from_config(config)), events)
    }

    /// Starts a client that sends commands through `transport`.
    ///
    /// # Errors
    ///
    /// See [`Zhal::init`].
    pub fn init_with(
        config: &Config,
        transport: Arc<dyn Transport>,
        events: Arc<dyn EventHandler>,
    ) -> Result<Self, InitError> {
        config
            .validate()
            .map_err(|source| InitError::Config { source })?;

        let listener = FrameListener::bind(&config.event_endpoint())
            .map_err(|source| InitError::Receiver { source })?;
        let receiver_addr = listener
            .local_addr()
            .map_err(|source| InitError::Receiver { source })?;

        let engine = Arc::new(Engine::new(config.busy_lease()));
        let worker = worker::spawn(Arc::clone(&engine), transport)
            .map_err(|source| InitError::Worker { source })?;

        let router = Arc::new(InboundRouter {
            engine: Arc::clone(&engine),
            events,
        });
        let receiver = match listener.start(Arc::clone(&router) as Arc<dyn InboundHandler>) {
            Ok(receiver) => receiver,
            Err(source) => {
                worker.shutdown();
                if let Err(error) = worker.join() {
                    warn!(target: CLIENT_TARGET, error = %error, "worker failed during init rollback");
                }
                return Err(InitError::Receiver { source });
            }
        };

        info!(
            target: CLIENT_TARGET,
            core = %config.core_endpoint(),
            receiver = %receiver_addr,
            "client initialised"
        );
        Ok(Self {
            engine,
            router,
            threads: Mutex::new(Some(Threads { worker, receiver })),
            receiver_addr,
        })
    }

    /// Sends `request` to `address` and blocks until its response arrives.
    ///
    /// `request` must be a JSON object; its `requestId` field is overwritten
    /// with a fresh id. Requests to the same device run one at a time in
    /// submission order.
    ///
    /// # Errors
    ///
    /// Returns [`ZhalError`] when the request is rejected, fails in
    /// transport, times out, or the client has been terminated.
    pub fn send_request(
        &self,
        address: DeviceAddress,
        request: Value,
        timeout: Duration,
    ) -> Result<Value, ZhalError> {
        dispatcher::send(&self.engine, address, request, timeout)
    }

    /// Routes one inbound frame as the built-in receiver does.
    ///
    /// For services that run their own receiver for ZigbeeCore frames.
    pub fn handle_inbound(&self, frame: Value) {
        self.router.handle_frame(frame);
    }

    /// Queue depth and busy state for every device seen so far.
    #[must_use]
    pub fn device_snapshot(&self) -> Vec<DeviceStatus> {
        self.engine.registry.snapshot()
    }

    /// Requests not yet freed, including abandoned ones still held by the
    /// worker or the pending table.
    #[must_use]
    pub fn live_requests(&self) -> usize {
        self.engine.live_count()
    }

    /// Address the event receiver is bound to.
    #[must_use]
    pub const fn receiver_addr(&self) -> SocketAddr {
        self.receiver_addr
    }

    /// Stops the receiver and worker and fails every request still waiting
    /// with [`ZhalError::Terminated`].
    ///
    /// Calling this more than once is harmless.
    ///
    /// # Errors
    ///
    /// Returns [`TerminateError`] when a background thread panicked.
    pub fn terminate(&self) -> Result<(), TerminateError> {
        if !self.engine.stop() {
            return Ok(());
        }
        let mut result = Ok(());
        let threads = lock(&self.threads, "client threads").take();
        if let Some(Threads { worker, receiver }) = threads {
            receiver.shutdown();
            worker.shutdown();
            if let Err(source) = receiver.join() {
                result = Err(TerminateError::Receiver { source });
            }
            if let Err(source) = worker.join() {
                result = Err(TerminateError::Worker { source });
            }
        }
        self.engine.release_all();
        info!(target: CLIENT_TARGET, "client terminated");
        result
    }
}

impl Drop for Zhal {
    fn drop(&mut self) {
        if let Err(error) = self.terminate() {
            warn!(target: CLIENT_TARGET, error = %error, "client terminated uncleanly");
        }
    }
}

impl std::fmt::Debug for Zhal {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Zhal")
            .field("receiver_addr", &self.receiver_addr)
            .field("running", &self.engine.is_running())
            .finish_non_exhaustive()
    }
}
