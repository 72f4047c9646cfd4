use std::sync::mpsc;

use engine_logging::engine_info;
use harvester_core::ProgressEvent;

use crate::EngineEvent;

/// Fire-and-forget receiver of session progress. Events arrive in the order
/// the loop observed them; sinks must not reorder them.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

pub struct ChannelProgressSink {
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: ProgressEvent) {
        let _ = self.tx.send(EngineEvent::Progress(event));
    }
}

/// Writes progress to the log and nowhere else.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgressSink;

impl ProgressSink for LogProgressSink {
    fn emit(&self, event: ProgressEvent) {
        engine_info!("{}: {}", event.phase, event.count);
    }
}
