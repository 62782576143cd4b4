//! Event handler that records what it receives.

use std::sync::Mutex;

use serde_json::Value;

use crate::events::EventHandler;
use crate::sync::lock;

use super::wait_until;

#[derive(Debug, Default)]
pub struct RecordingEvents {
    events: Mutex<Vec<Value>>,
}

impl RecordingEvents {
    pub fn events(&self) -> Vec<Value> {
        lock(&self.events, "recorded events").clone()
    }

    pub fn wait_for(&self, expected: usize) -> bool {
        wait_until(|| lock(&self.events, "recorded events").len() >= expected)
    }
}

impl EventHandler for RecordingEvents {
    fn handle_event(&self, event: Value) {
        lock(&self.events, "recorded events").push(event);
    }
}
