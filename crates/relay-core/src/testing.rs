//! Test doubles shared by the unit tests.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::connection::PeerSink;

/// Sink that records every frame it accepts.
#[derive(Default)]
pub(crate) struct RecordingSink {
    frames: Mutex<Vec<String>>,
    closed: bool,
}

impl RecordingSink {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A sink whose peer has gone away; every send fails.
    pub(crate) fn closed() -> Arc<Self> {
        Arc::new(Self {
            frames: Mutex::new(Vec::new()),
            closed: true,
        })
    }

    pub(crate) fn frames(&self) -> Vec<String> {
        self.frames.lock().clone()
    }

    pub(crate) fn frames_json(&self) -> Vec<serde_json::Value> {
        self.frames()
            .iter()
            .map(|f| serde_json::from_str(f).unwrap())
            .collect()
    }
}

impl PeerSink for RecordingSink {
    fn send(&self, frame: Arc<String>) -> bool {
        if self.closed {
            return false;
        }
        self.frames.lock().push((*frame).clone());
        true
    }
}
