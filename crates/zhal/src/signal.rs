//! Wakeup signal between request producers and the worker thread.

use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::sync::lock;

/// Why [`WorkerSignal::wait`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Wake {
    /// Something changed that may make a device eligible.
    Work,
    /// The wait elapsed without a notification.
    Timeout,
    /// The client is shutting down.
    Shutdown,
}

#[derive(Debug, Default)]
struct SignalState {
    dirty: bool,
    shutdown: bool,
}

/// Level-triggered notification: a notify that lands while the worker is
/// busy is remembered until its next wait.
#[derive(Debug, Default)]
pub(crate) struct WorkerSignal {
    state: Mutex<SignalState>,
    condvar: Condvar,
}

impl WorkerSignal {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn notify(&self) {
        lock(&self.state, "worker signal").dirty = true;
        self.condvar.notify_one();
    }

    pub(crate) fn shutdown(&self) {
        lock(&self.state, "worker signal").shutdown = true;
        self.condvar.notify_all();
    }

    pub(crate) fn is_shutdown(&self) -> bool {
        lock(&self.state, "worker signal").shutdown
    }

    /// Blocks until notified, shut down, or `timeout` elapses.
    ///
    /// `None` waits without a deadline. Shutdown wins over pending work.
    pub(crate) fn wait(&self, timeout: Option<Duration>) -> Wake {
        let deadline = timeout.map(|span| Instant::now() + span);
        let mut state = lock(&self.state, "worker signal");
        loop {
            if state.shutdown {
                return Wake::Shutdown;
            }
            if state.dirty {
                state.dirty = false;
                return Wake::Work;
            }
            state = match deadline {
                None => self
                    .condvar
                    .wait(state)
                    .unwrap_or_else(std::sync::PoisonError::into_inner),
                Some(until) => {
                    let now = Instant::now();
                    if now >= until {
                        return Wake::Timeout;
                    }
                    self.condvar
                        .wait_timeout(state, until - now)
                        .unwrap_or_else(std::sync::PoisonError::into_inner)
                        .0
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn signal() -> Arc<WorkerSignal> {
        Arc::new(WorkerSignal::new())
    }

    #[rstest]
    fn notify_before_wait_is_not_lost(signal: Arc<WorkerSignal>) {
        signal.notify();
        assert_eq!(signal.wait(Some(Duration::from_millis(10))), Wake::Work);
        assert_eq!(signal.wait(Some(Duration::from_millis(10))), Wake::Timeout);
    }

    #[rstest]
    fn notify_wakes_a_blocked_waiter(signal: Arc<WorkerSignal>) {
        let waiter = {
            let waiting = Arc::clone(&signal);
            thread::spawn(move || waiting.wait(None))
        };
        thread::sleep(Duration::from_millis(20));
        signal.notify();

        assert_eq!(waiter.join().expect("waiter panicked"), Wake::Work);
    }

    #[rstest]
    fn shutdown_takes_precedence(signal: Arc<WorkerSignal>) {
        signal.notify();
        signal.shutdown();

        assert!(signal.is_shutdown());
        assert_eq!(signal.wait(None), Wake::Shutdown);
        assert_eq!(signal.wait(None), Wake::Shutdown);
    }
}
