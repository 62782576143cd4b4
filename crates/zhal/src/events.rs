//! Delivery of unsolicited ZigbeeCore events to the embedding service.

use serde_json::Value;

/// Receives every inbound frame that does not answer a request.
///
/// Called from receiver threads, possibly concurrently. Implementations
/// should return promptly; the connection that carried the event is not read
/// again until the call returns.
pub trait EventHandler: Send + Sync + 'static {
    /// Handles one event document.
    fn handle_event(&self, event: Value);
}

impl<F> EventHandler for F
where
    F: Fn(Value) + Send + Sync + 'static,
{
    fn handle_event(&self, event: Value) {
        self(event);
    }
}

/// Handler that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardEvents;

impl EventHandler for DiscardEvents {
    fn handle_event(&self, _event: Value) {}
}
