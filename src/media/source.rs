use std::sync::Arc;
use std::time::Duration;

use crate::foundation::cancel::CancelToken;
use crate::foundation::clock::Clock;
use crate::foundation::error::{ComposeError, ComposeResult};
use crate::media::audio::AudioRoute;

/// Interval between readiness polls while loading.
pub const READY_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Stream metadata known once an overlay is ready.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayInfo {
    /// Intrinsic width in pixels.
    pub width: u32,
    /// Intrinsic height in pixels.
    pub height: u32,
    /// Playable duration; `None` when the container does not report one.
    pub duration_secs: Option<f64>,
    /// Whether the source carries an audio stream.
    pub has_audio: bool,
    /// Native frame rate, when known.
    pub fps: Option<f64>,
}

/// One decoded overlay frame.
#[derive(Clone, Debug)]
pub struct VideoFrame {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Premultiplied RGBA8, tightly packed.
    pub rgba8_premul: Arc<Vec<u8>>,
    /// Presentation time relative to playback start.
    pub pts_secs: f64,
}

/// Result of a non-blocking readiness poll.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Readiness {
    /// Metadata and first frame not available yet.
    Pending,
    /// Ready to play.
    Ready(OverlayInfo),
}

/// A playable overlay clip owned by exactly one composition.
///
/// Lifecycle: poll until ready, `play` once, sample frames with non-decreasing `t`, then `pause`
/// (only if played) and `release` exactly once.
pub trait OverlayVideo: Send {
    /// Poll readiness without blocking.
    fn poll_ready(&mut self) -> ComposeResult<Readiness>;

    /// Start playback at time 0.
    fn play(&mut self) -> ComposeResult<()>;

    /// Latest frame whose presentation time is `<= t`, or `None` before the first frame.
    fn frame_at(&mut self, t_secs: f64) -> ComposeResult<Option<VideoFrame>>;

    /// Return `true` once playback reached the natural end of the clip at `t`.
    fn has_ended(&self, t_secs: f64) -> bool;

    /// Stop playback.
    fn pause(&mut self);

    /// Drop decoders and revoke any staged temporary file.
    fn release(&mut self);

    /// Audio that can be muxed into the output, if any.
    fn audio_route(&self) -> Option<AudioRoute> {
        None
    }
}

/// Poll `video` until it is ready, `timeout` elapses on `clock`, or `cancel` fires.
pub fn await_ready(
    video: &mut dyn OverlayVideo,
    clock: &dyn Clock,
    timeout: Duration,
    cancel: &CancelToken,
) -> ComposeResult<OverlayInfo> {
    let start = clock.now();
    loop {
        cancel.check("overlay load")?;
        if let Readiness::Ready(info) = video.poll_ready()? {
            if info.width == 0 || info.height == 0 {
                return Err(ComposeError::decode(
                    "overlay video reports zero intrinsic size",
                ));
            }
            return Ok(info);
        }
        let waited = clock.now().saturating_sub(start);
        if waited >= timeout {
            return Err(ComposeError::load_timeout(format!(
                "overlay video not ready after {} ms",
                waited.as_millis()
            )));
        }
        clock.sleep(READY_POLL_INTERVAL.min(timeout - waited));
    }
}
