//! Overlay clips: the playback contract, ffmpeg-backed decoding, payload staging and audio routing.

/// Audio routing descriptors.
pub mod audio;
/// `ffprobe`/`ffmpeg` backed overlay decoding.
pub mod ffmpeg;
/// Killable helper processes.
pub(crate) mod process;
/// Overlay playback contract.
pub mod source;
pub(crate) mod staging;
/// Procedural overlay for tests and dry runs.
#[doc(hidden)]
pub mod synthetic;

pub use audio::AudioRoute;
pub use ffmpeg::{FfmpegOverlay, probe_video};
pub use source::{OverlayInfo, OverlayVideo, Readiness, VideoFrame, await_ready};
#[doc(hidden)]
pub use synthetic::{OverlayProbe, SyntheticOverlay};

use crate::foundation::error::ComposeResult;
use crate::model::request::OverlaySource;

/// Stage `source` and start loading it with `ffmpeg`.
#[tracing::instrument(level = "debug", skip(source), fields(source = %source.describe()))]
pub fn open_ffmpeg_overlay(source: &OverlaySource) -> ComposeResult<FfmpegOverlay> {
    let staged = staging::stage_overlay(source)?;
    FfmpegOverlay::open(staged)
}
