use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use crate::foundation::core::Fps;
use crate::foundation::error::{ComposeError, ComposeResult};
use crate::media::audio::AudioRoute;
use crate::render::frame::FrameRGBA;

/// Stream parameters handed to a [`Recorder`] when capture starts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RecorderConfig {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Output frame rate.
    pub fps: Fps,
    /// Target video bitrate in bits per second.
    pub bitrate: u32,
}

/// Event emitted by a recorder while encoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecorderEvent {
    /// A chunk of encoded output.
    Data(Vec<u8>),
    /// Encoding finished; no more chunks follow.
    Stopped,
    /// Encoding failed.
    Error(String),
}

/// Concatenates [`RecorderEvent::Data`] chunks until the recorder reports it stopped.
#[derive(Debug, Default)]
pub struct ChunkAssembler {
    buf: Vec<u8>,
    chunks: usize,
}

impl ChunkAssembler {
    /// Empty assembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Block on `rx` until [`RecorderEvent::Stopped`], returning the concatenated output.
    ///
    /// A recorder error or a channel that closes before `Stopped` is an encode error.
    pub fn drain(mut self, rx: &Receiver<RecorderEvent>) -> ComposeResult<Vec<u8>> {
        loop {
            match rx.recv() {
                Ok(RecorderEvent::Data(chunk)) => {
                    self.chunks += 1;
                    self.buf.extend_from_slice(&chunk);
                }
                Ok(RecorderEvent::Stopped) => {
                    tracing::debug!(
                        chunks = self.chunks,
                        bytes = self.buf.len(),
                        "recorder stopped"
                    );
                    return Ok(self.buf);
                }
                Ok(RecorderEvent::Error(msg)) => return Err(ComposeError::encode(msg)),
                Err(_) => {
                    return Err(ComposeError::encode(
                        "recorder closed its output before signalling stop",
                    ));
                }
            }
        }
    }
}

/// Streaming capture-and-encode facility consuming composed frames in order.
///
/// Lifecycle: optional `attach_audio`, `start` once, `push_frame` zero or more times, then exactly
/// one of `stop` or `abort`.
pub trait Recorder: Send {
    /// MIME type of the produced artifact.
    fn mime_type(&self) -> &str;

    /// Mux `route` into the output. Must be called before `start`.
    fn attach_audio(&mut self, route: &AudioRoute) -> ComposeResult<()> {
        Err(ComposeError::audio_routing(format!(
            "recorder cannot mux audio from '{}'",
            route.source.display()
        )))
    }

    /// Begin a capture.
    fn start(&mut self, cfg: RecorderConfig) -> ComposeResult<()>;

    /// Encode the next frame.
    fn push_frame(&mut self, frame: &FrameRGBA) -> ComposeResult<()>;

    /// Finish encoding and return the complete artifact.
    fn stop(&mut self) -> ComposeResult<Vec<u8>>;

    /// Discard the capture and free encoder resources.
    fn abort(&mut self);
}

/// Lifecycle counters shared with an [`InMemoryRecorder`].
#[doc(hidden)]
#[derive(Clone, Debug, Default)]
pub struct RecorderProbe {
    starts: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
    aborts: Arc<AtomicUsize>,
    frames: Arc<AtomicUsize>,
    retained: Arc<Mutex<Vec<FrameRGBA>>>,
}

impl RecorderProbe {
    /// Number of `start` calls.
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    /// Number of `stop` calls.
    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    /// Number of `abort` calls.
    pub fn aborts(&self) -> usize {
        self.aborts.load(Ordering::SeqCst)
    }

    /// Frames accepted so far.
    pub fn frames(&self) -> usize {
        self.frames.load(Ordering::SeqCst)
    }

    /// Frames kept by a recorder built with [`InMemoryRecorder::retaining_frames`].
    pub fn retained_frames(&self) -> Vec<FrameRGBA> {
        self.retained
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// Recorder that "encodes" each frame as a 16-byte record (index and checksum).
///
/// Used by tests and dry runs; output size is proportional to the frame count only.
#[doc(hidden)]
#[derive(Debug)]
pub struct InMemoryRecorder {
    probe: RecorderProbe,
    retain: bool,
    accept_audio: bool,
    fail_after: Option<usize>,
    cfg: Option<RecorderConfig>,
    events: Option<(Sender<RecorderEvent>, Receiver<RecorderEvent>)>,
    index: u64,
}

/// MIME type of [`InMemoryRecorder`] output.
#[doc(hidden)]
pub const FRAME_LOG_MIME: &str = "application/x-repliq-frame-log";

impl InMemoryRecorder {
    /// Recorder that keeps no frames.
    pub fn new() -> Self {
        Self {
            probe: RecorderProbe::default(),
            retain: false,
            accept_audio: false,
            fail_after: None,
            cfg: None,
            events: None,
            index: 0,
        }
    }

    /// Keep a copy of every frame, readable through [`RecorderProbe::retained_frames`].
    pub fn retaining_frames(mut self) -> Self {
        self.retain = true;
        self
    }

    /// Accept `attach_audio` calls.
    pub fn accepting_audio(mut self) -> Self {
        self.accept_audio = true;
        self
    }

    /// Fail with an encode error once `frames` frames were accepted.
    pub fn failing_after(mut self, frames: usize) -> Self {
        self.fail_after = Some(frames);
        self
    }

    /// Counters shared with this recorder.
    pub fn probe(&self) -> RecorderProbe {
        self.probe.clone()
    }
}

impl Default for InMemoryRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl Recorder for InMemoryRecorder {
    fn mime_type(&self) -> &str {
        FRAME_LOG_MIME
    }

    fn attach_audio(&mut self, route: &AudioRoute) -> ComposeResult<()> {
        if !self.accept_audio {
            return Err(ComposeError::audio_routing(format!(
                "in-memory recorder ignores audio from '{}'",
                route.source.display()
            )));
        }
        route.check_readable()
    }

    fn start(&mut self, cfg: RecorderConfig) -> ComposeResult<()> {
        if self.cfg.is_some() {
            return Err(ComposeError::encode("recorder already started"));
        }
        self.probe.starts.fetch_add(1, Ordering::SeqCst);
        self.cfg = Some(cfg);
        self.events = Some(mpsc::channel());
        self.index = 0;
        Ok(())
    }

    fn push_frame(&mut self, frame: &FrameRGBA) -> ComposeResult<()> {
        let cfg = self
            .cfg
            .ok_or_else(|| ComposeError::encode("recorder not started"))?;
        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(ComposeError::encode(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        if self
            .fail_after
            .is_some_and(|n| self.probe.frames() >= n)
        {
            if let Some((tx, _)) = &self.events {
                let _ = tx.send(RecorderEvent::Error("injected encoder failure".to_owned()));
            }
            return Err(ComposeError::encode("injected encoder failure"));
        }
        let Some((tx, _)) = &self.events else {
            return Err(ComposeError::encode("recorder already finalized"));
        };

        let checksum = frame
            .data
            .iter()
            .fold(0xcbf2_9ce4_8422_2325u64, |h, b| {
                (h ^ u64::from(*b)).wrapping_mul(0x0100_0000_01b3)
            });
        let mut record = Vec::with_capacity(16);
        record.extend_from_slice(&self.index.to_le_bytes());
        record.extend_from_slice(&checksum.to_le_bytes());
        tx.send(RecorderEvent::Data(record))
            .map_err(|_| ComposeError::encode("recorder output closed"))?;

        self.index += 1;
        self.probe.frames.fetch_add(1, Ordering::SeqCst);
        if self.retain {
            self.probe
                .retained
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(frame.clone());
        }
        Ok(())
    }

    fn stop(&mut self) -> ComposeResult<Vec<u8>> {
        let (tx, rx) = self
            .events
            .take()
            .ok_or_else(|| ComposeError::encode("recorder not started"))?;
        self.probe.stops.fetch_add(1, Ordering::SeqCst);
        let _ = tx.send(RecorderEvent::Stopped);
        drop(tx);
        self.cfg = None;
        ChunkAssembler::new().drain(&rx)
    }

    fn abort(&mut self) {
        self.probe.aborts.fetch_add(1, Ordering::SeqCst);
        self.events = None;
        self.cfg = None;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/capture/recorder.rs"]
mod tests;
