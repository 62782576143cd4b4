//! In-process stand-in for the ZigbeeCore command listener.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde_json::{Value, json};

use crate::codec;
use crate::sync::lock;

/// How the fake answers one command.
#[derive(Debug, Clone, Copy)]
pub enum Reply {
    /// Accept, then push a response to the client after `delay`.
    Respond { delay: Duration },
    /// Accept and never respond.
    AckOnly,
    /// Refuse with a non-zero result code.
    Reject(i64),
}

type Script = dyn Fn(&Value) -> Reply + Send + Sync;

struct Shared {
    script: Box<Script>,
    requests: Mutex<Vec<Value>>,
    client: Mutex<Option<SocketAddr>>,
}

/// TCP server that reads command frames, acknowledges them, and pushes
/// responses to the client's receiver.
pub struct FakeCore {
    addr: SocketAddr,
    shared: Arc<Shared>,
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl FakeCore {
    pub fn start(script: impl Fn(&Value) -> Reply + Send + Sync + 'static) -> Self {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind fake core");
        listener
            .set_nonblocking(true)
            .expect("non-blocking fake core");
        let addr = listener.local_addr().expect("fake core address");
        let shared = Arc::new(Shared {
            script: Box::new(script),
            requests: Mutex::new(Vec::new()),
            client: Mutex::new(None),
        });
        let shutdown = Arc::new(AtomicBool::new(false));
        let handle = {
            let loop_shared = Arc::clone(&shared);
            let loop_shutdown = Arc::clone(&shutdown);
            thread::spawn(move || accept_loop(&listener, &loop_shared, &loop_shutdown))
        };
        Self {
            addr,
            shared,
            shutdown,
            handle: Some(handle),
        }
    }

    /// Fake that answers every command after `delay`.
    pub fn responding(delay: Duration) -> Self {
        Self::start(move |_| Reply::Respond { delay })
    }

    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Directs responses and events at the client's receiver.
    pub fn attach(&self, receiver: SocketAddr) {
        *lock(&self.shared.client, "fake core client") = Some(receiver);
    }

    pub fn requests(&self) -> Vec<Value> {
        lock(&self.shared.requests, "fake core requests").clone()
    }

    /// Pushes an arbitrary frame to the attached client.
    pub fn push(&self, frame: &Value) {
        let target = (*lock(&self.shared.client, "fake core client")).expect("client attached");
        push_frame(target, frame).expect("push frame");
    }
}

impl Drop for FakeCore {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.join().expect("fake core thread");
        }
    }
}

fn accept_loop(listener: &TcpListener, shared: &Arc<Shared>, shutdown: &AtomicBool) {
    while !shutdown.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, _)) => serve_command(stream, shared),
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(2));
            }
            Err(_) => return,
        }
    }
}

fn serve_command(mut stream: TcpStream, shared: &Arc<Shared>) {
    if stream.set_nonblocking(false).is_err() {
        return;
    }
    let Ok(Some(request)) = codec::read_frame::<_, Value>(&mut stream) else {
        return;
    };
    lock(&shared.requests, "fake core requests").push(request.clone());
    let reply = (shared.script)(&request);
    let result_code = match reply {
        Reply::Reject(code) => code,
        Reply::Respond { .. } | Reply::AckOnly => 0,
    };
    if codec::write_frame(&mut stream, &json!({"resultCode": result_code})).is_err() {
        return;
    }
    drop(stream);

    if let Reply::Respond { delay } = reply {
        let target = *lock(&shared.client, "fake core client");
        let Some(target) = target else {
            return;
        };
        let response = json!({
            "requestId": request["requestId"].clone(),
            "resultCode": 0,
            "echo": request,
        });
        thread::spawn(move || {
            thread::sleep(delay);
            // The client may already have terminated.
            push_frame(target, &response).unwrap_or_default();
        });
    }
}

fn push_frame(target: SocketAddr, frame: &Value) -> Result<(), codec::FrameError> {
    let mut stream = TcpStream::connect(target)?;
    codec::write_frame(&mut stream, frame)
}
