//! Procedural overlay clip used by tests and dry runs.
//!
//! Frames are solid colors that cycle with time, so compositions can be exercised without a
//! decoder. Lifecycle calls are counted through a shared [`OverlayProbe`].

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::foundation::error::{ComposeError, ComposeResult};
use crate::media::audio::AudioRoute;
use crate::media::source::{OverlayInfo, OverlayVideo, Readiness, VideoFrame};

const DEFAULT_FPS: f64 = 30.0;

/// Shared lifecycle counters of a [`SyntheticOverlay`].
#[doc(hidden)]
#[derive(Clone, Debug, Default)]
pub struct OverlayProbe {
    plays: Arc<AtomicUsize>,
    pauses: Arc<AtomicUsize>,
    releases: Arc<AtomicUsize>,
    frames: Arc<AtomicUsize>,
}

impl OverlayProbe {
    /// Number of `play` calls.
    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }

    /// Number of `pause` calls.
    pub fn pauses(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }

    /// Number of `release` calls.
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    /// Number of frames handed out.
    pub fn frames(&self) -> usize {
        self.frames.load(Ordering::SeqCst)
    }
}

/// In-memory [`OverlayVideo`] with configurable readiness, duration and natural end.
#[doc(hidden)]
#[derive(Debug)]
pub struct SyntheticOverlay {
    width: u32,
    height: u32,
    fps: f64,
    duration_secs: Option<f64>,
    ends_at_secs: Option<f64>,
    pending_polls: Option<u32>,
    failure: Option<String>,
    audio: Option<PathBuf>,
    probe: OverlayProbe,
    playing: bool,
    cache: Option<(u64, VideoFrame)>,
}

impl SyntheticOverlay {
    /// Clip of `width` x `height`, 2 s long, ready on the first poll.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            fps: DEFAULT_FPS,
            duration_secs: Some(2.0),
            ends_at_secs: Some(2.0),
            pending_polls: Some(0),
            failure: None,
            audio: None,
            probe: OverlayProbe::default(),
            playing: false,
            cache: None,
        }
    }

    /// Reported duration (may be `None`, NaN or zero) that is also the natural end when finite.
    pub fn with_duration(mut self, duration_secs: Option<f64>) -> Self {
        self.duration_secs = duration_secs;
        self.ends_at_secs = duration_secs.filter(|d| d.is_finite() && *d > 0.0);
        self
    }

    /// Natural end independent of the reported duration (`None` = never ends).
    pub fn ending_at(mut self, ends_at_secs: Option<f64>) -> Self {
        self.ends_at_secs = ends_at_secs;
        self
    }

    /// Report `Pending` for the first `polls` readiness polls.
    pub fn ready_after_polls(mut self, polls: u32) -> Self {
        self.pending_polls = Some(polls);
        self
    }

    /// Never become ready.
    pub fn never_ready(mut self) -> Self {
        self.pending_polls = None;
        self
    }

    /// Fail readiness with a decode error.
    pub fn failing(mut self, msg: impl Into<String>) -> Self {
        self.failure = Some(msg.into());
        self
    }

    /// Advertise an audio track read from `path`.
    pub fn with_audio(mut self, path: impl Into<PathBuf>) -> Self {
        self.audio = Some(path.into());
        self
    }

    /// Lifecycle counters shared with this clip.
    pub fn probe(&self) -> OverlayProbe {
        self.probe.clone()
    }

    fn info(&self) -> OverlayInfo {
        OverlayInfo {
            width: self.width,
            height: self.height,
            duration_secs: self.duration_secs,
            has_audio: self.audio.is_some(),
            fps: Some(self.fps),
        }
    }

    fn render(&self, index: u64) -> VideoFrame {
        // Hue steps once per frame so consecutive frames differ.
        let phase = (index % 6) as u8;
        let rgb = match phase {
            0 => [230, 80, 60],
            1 => [230, 180, 60],
            2 => [90, 200, 90],
            3 => [60, 180, 220],
            4 => [80, 90, 230],
            _ => [200, 80, 200],
        };
        let mut data = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        for _ in 0..(self.width as usize * self.height as usize) {
            data.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
        }
        VideoFrame {
            width: self.width,
            height: self.height,
            rgba8_premul: Arc::new(data),
            pts_secs: index as f64 / self.fps,
        }
    }
}

impl OverlayVideo for SyntheticOverlay {
    fn poll_ready(&mut self) -> ComposeResult<Readiness> {
        if let Some(msg) = &self.failure {
            return Err(ComposeError::decode(msg.clone()));
        }
        match &mut self.pending_polls {
            None => Ok(Readiness::Pending),
            Some(0) => Ok(Readiness::Ready(self.info())),
            Some(n) => {
                *n -= 1;
                Ok(Readiness::Pending)
            }
        }
    }

    fn play(&mut self) -> ComposeResult<()> {
        self.probe.plays.fetch_add(1, Ordering::SeqCst);
        self.playing = true;
        Ok(())
    }

    fn frame_at(&mut self, t_secs: f64) -> ComposeResult<Option<VideoFrame>> {
        if !self.playing || t_secs < 0.0 {
            return Ok(None);
        }
        let mut t = t_secs;
        if let Some(end) = self.ends_at_secs {
            t = t.min((end - 1.0 / self.fps).max(0.0));
        }
        let index = (t * self.fps + 1e-9).floor() as u64;
        if let Some((cached, frame)) = &self.cache
            && *cached == index
        {
            return Ok(Some(frame.clone()));
        }
        let frame = self.render(index);
        self.probe.frames.fetch_add(1, Ordering::SeqCst);
        self.cache = Some((index, frame.clone()));
        Ok(Some(frame))
    }

    fn has_ended(&self, t_secs: f64) -> bool {
        self.ends_at_secs.is_some_and(|end| t_secs >= end)
    }

    fn pause(&mut self) {
        self.probe.pauses.fetch_add(1, Ordering::SeqCst);
        self.playing = false;
    }

    fn release(&mut self) {
        self.probe.releases.fetch_add(1, Ordering::SeqCst);
        self.cache = None;
    }

    fn audio_route(&self) -> Option<AudioRoute> {
        self.audio.clone().map(AudioRoute::new)
    }
}
