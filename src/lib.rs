//! RepliQ Studio composition engine.
//!
//! Composites a short "talking head" overlay clip over a scrolling website backdrop into one
//! encoded video. The overlay is placed by display mode and corner, clipped to a circle, rounded
//! rectangle or square, and outlined; the backdrop scrolls with eased progress over the clip's
//! duration.
//!
//! - Build a [`CompositionRequest`]
//! - Run it through a [`Compositor`] (or [`compose_video`] for the defaults)
//! - Receive a [`CompositionResult`] with the encoded bytes
//!
//! Two backends implement [`CompositionBackend`]: [`CanvasBackend`] renders every frame on a CPU
//! canvas and streams it into a recorder, and [`FfmpegCliBackend`] expresses the same composition
//! as one `ffmpeg` filter graph.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Easing and scroll math.
pub mod animation;
/// Composition backends and media contexts.
pub mod backend;
/// Scrolling backdrops.
pub mod background;
/// Recorders and the encoder pipeline.
pub mod capture;
mod compose;
mod config;
/// Overlay geometry.
pub mod geometry;
/// Overlay clip playback.
pub mod media;
/// Request and result types.
pub mod model;
/// Per-frame compositing.
pub mod render;
/// Per-composition runtime.
pub mod session;

pub use crate::foundation::cancel::CancelToken;
pub use crate::foundation::clock::{Clock, ManualClock, SystemClock};
pub use crate::foundation::core::{BezPath, Canvas, Fps, Point, Rect};
pub use crate::foundation::error::{ComposeError, ComposeResult, ErrorKind};

pub use crate::backend::{
    CanvasBackend, ComposeContext, CompositionBackend, FfmpegCliBackend, FfmpegMediaContext,
    MediaContext, Pacing,
};
pub use crate::background::{BackgroundImage, synthesize_background};
pub use crate::compose::{Compositor, compose_video};
pub use crate::config::ComposeConfig;
pub use crate::geometry::overlay::{OverlayBox, resolve_overlay_box};
pub use crate::geometry::transition::{GrowthTransition, OverlayTimeline};
pub use crate::model::request::{
    BackgroundSource, CompositionRequest, DisplayMode, Lead, OverlaySource, Position,
    ProgressSink, Shape,
};
pub use crate::model::result::CompositionResult;
pub use crate::render::compositor::FrameStyle;
