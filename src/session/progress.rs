use std::sync::Mutex;

use crate::model::request::ProgressSink;

/// Loading started.
pub const LOAD_STARTED: u8 = 5;
/// Recorder created.
pub const RECORDER_READY: u8 = 10;
/// Overlay video ready.
pub const VIDEO_READY: u8 = 20;
/// Background acquired or synthesized.
pub const BACKGROUND_READY: u8 = 40;
/// Playback started.
pub const PLAYBACK_STARTED: u8 = 50;
/// Artifact produced.
pub const COMPLETE: u8 = 100;

/// Forwards percent-complete values to an optional sink, never repeating or going backwards.
///
/// Safe to call from the concurrent loading stages.
pub struct ProgressReporter {
    sink: Option<ProgressSink>,
    last: Mutex<Option<u8>>,
}

impl ProgressReporter {
    /// Reporter forwarding to `sink`.
    pub fn new(sink: Option<ProgressSink>) -> Self {
        Self {
            sink,
            last: Mutex::new(None),
        }
    }

    /// Report `percent` (clamped to 100) if it exceeds everything reported so far.
    pub fn report(&self, percent: u8) {
        let percent = percent.min(COMPLETE);
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        if last.is_some_and(|l| percent <= l) {
            return;
        }
        *last = Some(percent);
        if let Some(sink) = &self.sink {
            sink(percent);
        }
    }

    /// Highest value reported so far.
    pub fn last(&self) -> Option<u8> {
        *self.last.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("sink", &self.sink.is_some())
            .field("last", &self.last())
            .finish()
    }
}
