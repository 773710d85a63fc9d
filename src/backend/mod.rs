//! Composition backends and the media they draw from.
//!
//! A [`CompositionBackend`] turns a resolved request into an encoded artifact in three steps the
//! orchestrator sequences: load media, resolve geometry once, then render and encode. Media access
//! (overlay decoding, background loading, recorders and time) goes through a [`MediaContext`], so
//! every composition owns its own decoder, recorder and clock.

use std::sync::Arc;

use crate::background::BackgroundImage;
use crate::capture::ffmpeg::FfmpegRecorder;
use crate::capture::recorder::Recorder;
use crate::config::ComposeConfig;
use crate::foundation::cancel::CancelToken;
use crate::foundation::clock::{Clock, ManualClock, SystemClock};
use crate::foundation::error::ComposeResult;
use crate::geometry::transition::OverlayTimeline;
use crate::media::source::OverlayVideo;
use crate::model::request::{BackgroundSource, OverlaySource, ResolvedRequest};
use crate::model::result::CompositionResult;
use crate::session::progress::ProgressReporter;
use crate::session::state::{CompositionState, StateMachine};

/// Canvas render loop over a [`MediaContext`].
pub mod canvas;
/// Single `ffmpeg` invocation driven by a filter graph.
pub mod ffmpeg_cli;
/// `-filter_complex` construction.
pub mod filter_graph;

pub use canvas::{CanvasBackend, LoadedMedia};
pub use ffmpeg_cli::{FfmpegCliBackend, PreparedInputs};

/// Per-composition runtime state handed to a backend.
pub struct ComposeContext<'a> {
    /// Engine configuration.
    pub config: &'a ComposeConfig,
    /// Progress forwarding.
    pub progress: ProgressReporter,
    /// Lifecycle state.
    pub states: StateMachine,
    /// Caller cancellation.
    pub cancel: CancelToken,
    /// Time source for this composition only.
    pub clock: Arc<dyn Clock>,
}

impl<'a> ComposeContext<'a> {
    /// Context in [`CompositionState::Loading`].
    pub fn new(
        config: &'a ComposeConfig,
        progress: ProgressReporter,
        cancel: CancelToken,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            progress,
            states: StateMachine::new(),
            cancel,
            clock,
        }
    }

    /// Advance the lifecycle.
    pub fn advance(&mut self, next: CompositionState) -> ComposeResult<()> {
        self.states.advance(next)
    }
}

/// One way of producing the composed video.
pub trait CompositionBackend: Send + Sync {
    /// Whatever [`CompositionBackend::load_media`] hands to the later steps.
    type Media: Send;

    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Fresh time source for one composition.
    fn clock(&self) -> Arc<dyn Clock> {
        Arc::new(SystemClock::new())
    }

    /// Load the overlay and background (state `Loading`).
    fn load_media(
        &self,
        request: &ResolvedRequest,
        cx: &ComposeContext<'_>,
    ) -> ComposeResult<Self::Media>;

    /// Resolve overlay geometry once per composition.
    fn compute_geometry(
        &self,
        media: &Self::Media,
        request: &ResolvedRequest,
        cx: &ComposeContext<'_>,
    ) -> OverlayTimeline;

    /// Play, compose and encode; drives `Playing` and `Finalizing`.
    fn render_and_encode(
        &self,
        media: Self::Media,
        timeline: &OverlayTimeline,
        request: &ResolvedRequest,
        cx: &mut ComposeContext<'_>,
    ) -> ComposeResult<CompositionResult>;
}

/// Media resources for the canvas backend.
///
/// Every method must hand out resources that belong to the calling composition alone.
pub trait MediaContext: Send + Sync {
    /// Clock pacing the render loop; a new instance per call.
    fn clock(&self) -> Arc<dyn Clock>;

    /// Clock measuring the overlay readiness timeout.
    ///
    /// Defaults to a fresh [`MediaContext::clock`].
    fn load_clock(&self) -> Arc<dyn Clock> {
        self.clock()
    }

    /// Start loading an overlay clip.
    fn open_overlay(&self, source: &OverlaySource) -> ComposeResult<Box<dyn OverlayVideo>>;

    /// Decode a caller-supplied background.
    fn load_background(&self, source: &BackgroundSource) -> ComposeResult<BackgroundImage> {
        crate::background::load_background(source)
    }

    /// Create a recorder; [`crate::ComposeError::RecorderUnavailable`] when none can be made.
    fn create_recorder(&self) -> ComposeResult<Box<dyn Recorder>>;
}

/// How [`FfmpegMediaContext`] paces the render loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Pacing {
    /// Ticks follow the wall clock.
    #[default]
    Realtime,
    /// Ticks follow a virtual clock; rendering runs as fast as decoding and encoding allow.
    Offline,
}

/// Media backed by the system `ffmpeg`/`ffprobe`.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegMediaContext {
    /// Render loop pacing.
    pub pacing: Pacing,
}

impl FfmpegMediaContext {
    /// Context with the given pacing.
    pub fn new(pacing: Pacing) -> Self {
        Self { pacing }
    }
}

impl MediaContext for FfmpegMediaContext {
    fn clock(&self) -> Arc<dyn Clock> {
        match self.pacing {
            Pacing::Realtime => Arc::new(SystemClock::new()),
            Pacing::Offline => Arc::new(ManualClock::new()),
        }
    }

    // Probing and decoding run in real time even when playback is virtual.
    fn load_clock(&self) -> Arc<dyn Clock> {
        Arc::new(SystemClock::new())
    }

    fn open_overlay(&self, source: &OverlaySource) -> ComposeResult<Box<dyn OverlayVideo>> {
        Ok(Box::new(crate::media::open_ffmpeg_overlay(source)?))
    }

    fn create_recorder(&self) -> ComposeResult<Box<dyn Recorder>> {
        Ok(Box::new(FfmpegRecorder::detect()?))
    }
}
