use std::sync::Arc;
use std::sync::mpsc::{self, SyncSender};

use crate::capture::recorder::{Recorder, RecorderConfig};
use crate::foundation::core::Fps;
use crate::foundation::error::{ComposeError, ComposeResult};
use crate::media::audio::AudioRoute;
use crate::render::frame::FrameRGBA;

/// Absorbs nanosecond rounding of tick times when mapping them to frame slots.
const SLOT_EPSILON: f64 = 1e-6;

enum EncoderMsg {
    Frame(Arc<FrameRGBA>),
    Abort,
}

/// Encoded artifact and stream facts returned by [`CapturePipeline::finish`].
#[derive(Clone, Debug)]
pub struct CaptureOutput {
    /// Concatenated recorder output.
    pub data: Vec<u8>,
    /// MIME type reported by the recorder.
    pub mime_type: String,
    /// Frames handed to the recorder.
    pub frames: u64,
    /// Whether an audio track was attached.
    pub has_audio: bool,
}

/// Feeds composed frames to a [`Recorder`] running on a dedicated encoder thread.
///
/// Frames pass through a bounded channel, so a slow encoder applies backpressure to the render
/// loop. Frame pacing keeps the output length equal to the submitted timeline: when the loop
/// falls behind, the previous frame is repeated to fill the gap.
pub struct CapturePipeline {
    tx: Option<SyncSender<EncoderMsg>>,
    worker: Option<std::thread::JoinHandle<ComposeResult<Vec<u8>>>>,
    fps: Fps,
    frames_sent: u64,
    last: Option<Arc<FrameRGBA>>,
    mime_type: String,
    has_audio: bool,
}

impl CapturePipeline {
    /// Start `recorder` and its encoder thread.
    ///
    /// Audio routing failures are logged and capture continues video-only.
    pub fn start(
        mut recorder: Box<dyn Recorder>,
        cfg: RecorderConfig,
        audio: Option<&AudioRoute>,
        queue: usize,
    ) -> ComposeResult<Self> {
        let has_audio = match audio {
            Some(route) => match recorder.attach_audio(route) {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(error = %e, "continuing without overlay audio");
                    false
                }
            },
            None => false,
        };

        recorder.start(cfg)?;
        let mime_type = recorder.mime_type().to_owned();

        let (tx, rx) = mpsc::sync_channel::<EncoderMsg>(queue.max(1));
        let worker = std::thread::Builder::new()
            .name("repliq-encoder".to_owned())
            .spawn(move || -> ComposeResult<Vec<u8>> {
                while let Ok(msg) = rx.recv() {
                    match msg {
                        EncoderMsg::Frame(frame) => {
                            if let Err(e) = recorder.push_frame(&frame) {
                                recorder.abort();
                                return Err(e);
                            }
                        }
                        EncoderMsg::Abort => {
                            recorder.abort();
                            return Err(ComposeError::cancelled("capture aborted"));
                        }
                    }
                }
                recorder.stop()
            })
            .map_err(|e| ComposeError::encode(format!("failed to spawn encoder thread: {e}")))?;

        Ok(Self {
            tx: Some(tx),
            worker: Some(worker),
            fps: cfg.fps,
            frames_sent: 0,
            last: None,
            mime_type,
            has_audio,
        })
    }

    /// Frames handed to the encoder so far.
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// Submit the frame composed for `elapsed_secs` of playback.
    ///
    /// The stream is padded with the previous frame up to the slot containing `elapsed_secs`; a
    /// frame whose slot is already filled only becomes the padding source.
    pub fn submit(&mut self, frame: FrameRGBA, elapsed_secs: f64) -> ComposeResult<()> {
        let slot = (elapsed_secs.max(0.0) * self.fps.as_f64() + SLOT_EPSILON).floor() as u64;
        let target = slot + 1;
        let frame = Arc::new(frame);
        if self.frames_sent >= target {
            self.last = Some(frame);
            return Ok(());
        }
        let filler = self.last.clone().unwrap_or_else(|| Arc::clone(&frame));
        while self.frames_sent + 1 < target {
            self.send(Arc::clone(&filler))?;
        }
        self.send(Arc::clone(&frame))?;
        self.last = Some(frame);
        Ok(())
    }

    /// Pad the stream to `end_secs`, stop the recorder and wait for its complete output.
    pub fn finish(mut self, end_secs: f64) -> ComposeResult<CaptureOutput> {
        let target = self.fps.secs_to_frames_round(end_secs.max(0.0)).max(1);
        if let Some(last) = self.last.clone() {
            while self.frames_sent < target {
                self.send(Arc::clone(&last))?;
            }
        }
        drop(self.tx.take());
        let data = self.join_worker()?;
        Ok(CaptureOutput {
            data,
            mime_type: std::mem::take(&mut self.mime_type),
            frames: self.frames_sent,
            has_audio: self.has_audio,
        })
    }

    /// Discard the capture.
    pub fn abort(mut self) {
        self.abort_inner();
    }

    fn send(&mut self, frame: Arc<FrameRGBA>) -> ComposeResult<()> {
        let sent = self
            .tx
            .as_ref()
            .is_some_and(|tx| tx.send(EncoderMsg::Frame(frame)).is_ok());
        if !sent {
            // The encoder thread exited early; surface its error.
            drop(self.tx.take());
            return match self.join_worker() {
                Err(e) => Err(e),
                Ok(_) => Err(ComposeError::encode("encoder stopped accepting frames")),
            };
        }
        self.frames_sent += 1;
        Ok(())
    }

    fn join_worker(&mut self) -> ComposeResult<Vec<u8>> {
        let handle = self
            .worker
            .take()
            .ok_or_else(|| ComposeError::encode("encoder thread already joined"))?;
        handle
            .join()
            .map_err(|_| ComposeError::encode("encoder thread panicked"))?
    }

    fn abort_inner(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(EncoderMsg::Abort);
        }
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CapturePipeline {
    fn drop(&mut self) {
        self.abort_inner();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/capture/pipeline.rs"]
mod tests;
