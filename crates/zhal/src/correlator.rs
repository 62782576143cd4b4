//! Matches asynchronous responses with the requests awaiting them.

use serde_json::Value;
use tracing::debug;

use crate::address::RequestId;
use crate::engine::Engine;

const CORRELATOR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::correlator");

/// What became of an inbound response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Correlation {
    /// Handed to the waiting caller.
    Delivered,
    /// The request was pending but its caller had already left.
    Orphaned,
    /// No pending request carries this id.
    Stale,
}

/// Completes the request identified by `request_id` with `response`.
///
/// The worker is woken in every case: a freed device may have queued work.
pub(crate) fn correlate(engine: &Engine, request_id: RequestId, response: Value) -> Correlation {
    let correlation = match engine.pending.remove(request_id) {
        Some(item) if item.complete(Ok(response)) => Correlation::Delivered,
        Some(item) => {
            debug!(
                target: CORRELATOR_TARGET,
                request_id = %request_id,
                address = %item.address(),
                "response for abandoned request"
            );
            Correlation::Orphaned
        }
        None => {
            debug!(
                target: CORRELATOR_TARGET,
                request_id = %request_id,
                "discarding stale response"
            );
            Correlation::Stale
        }
    };
    engine.signal.notify();
    correlation
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};
    use serde_json::{Map, json};

    use super::*;
    use crate::address::DeviceAddress;
    use crate::signal::Wake;
    use crate::work_item::ItemState;

    const DEVICE: DeviceAddress = DeviceAddress::new(0x5c);

    #[fixture]
    fn engine() -> Engine {
        Engine::new(None)
    }

    #[rstest]
    fn response_completes_pending_caller(engine: Engine) {
        let (item, receiver) = engine.enqueue(DEVICE, Map::new());
        let claimed = engine.registry.harvest();
        assert!(engine.pending.park(&claimed[0]));
        let response = json!({"requestId": item.id().get(), "status": 0});

        let correlation = correlate(&engine, item.id(), response.clone());

        assert_eq!(correlation, Correlation::Delivered);
        assert_eq!(
            receiver.try_recv().expect("outcome").expect("response"),
            response
        );
        assert!(!item.queue().is_busy());
    }

    #[rstest]
    fn response_for_orphan_frees_device(engine: Engine) {
        let (item, receiver) = engine.enqueue(DEVICE, Map::new());
        let claimed = engine.registry.harvest();
        assert!(engine.pending.park(&claimed[0]));
        drop(claimed);
        item.orphan();
        drop(receiver);

        let correlation = correlate(&engine, item.id(), json!({}));

        assert_eq!(correlation, Correlation::Orphaned);
        assert_eq!(item.state(), ItemState::Orphaned);
        assert!(!item.queue().is_busy());
        drop(item);
        assert_eq!(engine.live_count(), 0);
    }

    #[rstest]
    fn unknown_id_is_stale_and_still_wakes_worker(engine: Engine) {
        let correlation = correlate(&engine, RequestId::new(404), json!({"requestId": 404}));

        assert_eq!(correlation, Correlation::Stale);
        assert_eq!(engine.signal.wait(None), Wake::Work);
    }
}
