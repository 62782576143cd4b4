//! In-memory transport and a scripted responder that answers through
//! [`Zhal::handle_inbound`].

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde_json::{Value, json};

use crate::address::RequestId;
use crate::client::Zhal;
use crate::sync::lock;
use crate::transport::{Transport, TransportError};

/// One command handed to the transport.
#[derive(Debug, Clone)]
pub struct Transmitted {
    pub id: RequestId,
    pub request: Value,
}

/// Transport that accepts every command and forwards it over a channel.
pub struct ChannelTransport {
    outbox: Mutex<Sender<Transmitted>>,
}

impl ChannelTransport {
    pub fn new() -> (Arc<Self>, Receiver<Transmitted>) {
        let (outbox, inbox) = mpsc::channel();
        (
            Arc::new(Self {
                outbox: Mutex::new(outbox),
            }),
            inbox,
        )
    }
}

impl Transport for ChannelTransport {
    fn transmit(&self, request_id: RequestId, request: &Value) -> Result<(), TransportError> {
        let transmitted = Transmitted {
            id: request_id,
            request: request.clone(),
        };
        // A closed inbox means the test stopped listening; the command is
        // still accepted.
        lock(&self.outbox, "channel transport")
            .send(transmitted)
            .unwrap_or_default();
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Ledger {
    in_flight: HashMap<u64, u64>,
    violations: usize,
    peak_in_flight: usize,
    order: Vec<Value>,
}

/// Answers every transmitted command after `delay`, checking that no device
/// ever has two commands outstanding.
///
/// Commands must carry a numeric `device` field.
pub struct Responder {
    ledger: Arc<Mutex<Ledger>>,
    handle: Option<JoinHandle<()>>,
}

impl Responder {
    pub fn spawn(client: Arc<Zhal>, inbox: Receiver<Transmitted>, delay: Duration) -> Self {
        let ledger = Arc::new(Mutex::new(Ledger::default()));
        let handle = {
            let shared_ledger = Arc::clone(&ledger);
            thread::spawn(move || {
                let mut answers = Vec::new();
                for transmitted in inbox {
                    let device = transmitted.request["device"].as_u64().unwrap_or_default();
                    {
                        let mut entries = lock(&shared_ledger, "responder ledger");
                        if entries
                            .in_flight
                            .insert(device, transmitted.id.get())
                            .is_some()
                        {
                            entries.violations += 1;
                        }
                        entries.peak_in_flight = entries.peak_in_flight.max(entries.in_flight.len());
                        entries.order.push(transmitted.request.clone());
                    }
                    let answering = Arc::clone(&client);
                    let answer_ledger = Arc::clone(&shared_ledger);
                    answers.push(thread::spawn(move || {
                        thread::sleep(delay);
                        lock(&answer_ledger, "responder ledger").in_flight.remove(&device);
                        answering.handle_inbound(json!({
                            "requestId": transmitted.id.get(),
                            "resultCode": 0,
                            "echo": transmitted.request,
                        }));
                    }));
                }
                for answer in answers {
                    answer.join().expect("answer thread");
                }
            })
        };
        Self {
            ledger,
            handle: Some(handle),
        }
    }

    /// Devices that had a second command transmitted while one was
    /// outstanding.
    pub fn violations(&self) -> usize {
        lock(&self.ledger, "responder ledger").violations
    }

    /// Largest number of devices with a command outstanding at once.
    pub fn peak_in_flight(&self) -> usize {
        lock(&self.ledger, "responder ledger").peak_in_flight
    }

    /// Commands in transmission order.
    pub fn order(&self) -> Vec<Value> {
        lock(&self.ledger, "responder ledger").order.clone()
    }

    /// Waits for the responder to drain after the client terminates.
    pub fn finish(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.join().expect("responder thread");
        }
    }
}
