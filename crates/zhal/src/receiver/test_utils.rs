//! Test helpers for the receiver module.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde_json::Value;

use super::InboundHandler;
use crate::sync::lock;

/// Handler that records every frame it is given.
#[derive(Debug, Default)]
pub(crate) struct RecordingHandler {
    frames: Mutex<Vec<Value>>,
}

impl RecordingHandler {
    pub(crate) fn frames(&self) -> Vec<Value> {
        lock(&self.frames, "recorded frames").clone()
    }

    /// Polls until at least `expected` frames arrived or two seconds pass.
    pub(crate) fn wait_for(&self, expected: usize) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if lock(&self.frames, "recorded frames").len() >= expected {
                return true;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        false
    }
}

impl InboundHandler for RecordingHandler {
    fn handle_frame(&self, frame: Value) {
        lock(&self.frames, "recorded frames").push(frame);
    }
}
