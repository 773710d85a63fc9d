use std::time::Duration;

use crate::animation::scroll::{playback_progress, playing_percent, scroll_offset};
use crate::capture::pipeline::CapturePipeline;
use crate::foundation::cancel::CancelToken;
use crate::foundation::clock::Clock;
use crate::foundation::core::Fps;
use crate::foundation::error::ComposeResult;
use crate::geometry::transition::OverlayTimeline;
use crate::media::source::OverlayVideo;
use crate::render::compositor::FrameCompositor;
use crate::session::progress::ProgressReporter;

/// Slack applied to the duration threshold so virtual-clock ticks land exactly on the end.
const END_EPSILON_SECS: f64 = 1e-6;

/// How a render loop ended.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoopOutcome {
    /// Playback time the output must cover.
    pub end_secs: f64,
    /// Frames composed.
    pub ticks: u64,
    /// `true` when the overlay reported its natural end before the duration threshold.
    pub natural_end: bool,
}

/// Fixed-cadence loop: one composed frame per tick until the duration threshold or the overlay's
/// natural end, whichever fires first.
pub struct RenderLoop<'a> {
    /// Playing overlay.
    pub video: &'a mut dyn OverlayVideo,
    /// Frame compositor.
    pub compositor: &'a mut FrameCompositor,
    /// Overlay geometry.
    pub timeline: &'a OverlayTimeline,
    /// Destination of composed frames.
    pub capture: &'a mut CapturePipeline,
    /// Time source.
    pub clock: &'a dyn Clock,
    /// Progress forwarding.
    pub progress: &'a ProgressReporter,
    /// Cancellation, checked every tick.
    pub cancel: &'a CancelToken,
    /// Tick rate.
    pub fps: Fps,
    /// Effective playable duration (already resolved against the fallback).
    pub duration_secs: f64,
    /// Canvas height in pixels.
    pub canvas_height: f64,
}

impl RenderLoop<'_> {
    /// Run until termination.
    pub fn run(self) -> ComposeResult<LoopOutcome> {
        let interval = Duration::from_secs_f64(self.fps.frame_duration_secs());
        let background_height = self.compositor.background_height();
        let start = self.clock.now();
        let mut tick: u64 = 0;
        let mut ticks: u64 = 0;
        let mut last_scroll = 0.0f64;

        loop {
            self.cancel.check("playback")?;
            let elapsed = self.clock.now().saturating_sub(start).as_secs_f64();
            let natural_end = self.video.has_ended(elapsed);
            if natural_end || elapsed + END_EPSILON_SECS >= self.duration_secs {
                let end_secs = if natural_end {
                    elapsed.min(self.duration_secs)
                } else {
                    self.duration_secs
                };
                tracing::debug!(end_secs, ticks, natural_end, "render loop finished");
                return Ok(LoopOutcome {
                    end_secs,
                    ticks,
                    natural_end,
                });
            }

            let progress = playback_progress(elapsed, self.duration_secs);
            let scroll = scroll_offset(progress, background_height, self.canvas_height)
                .max(last_scroll);
            last_scroll = scroll;

            let overlay = self.timeline.box_at(elapsed);
            let video_frame = self.video.frame_at(elapsed)?;
            let frame = self
                .compositor
                .compose(scroll, &overlay, video_frame.as_ref())?;
            self.capture.submit(frame, elapsed)?;
            self.progress.report(playing_percent(progress));
            ticks += 1;

            tick += 1;
            let now = self.clock.now().saturating_sub(start);
            let due = interval * u32::try_from(tick).unwrap_or(u32::MAX);
            if due > now {
                self.clock.sleep(due - now);
            } else {
                // Behind schedule: resume at the current slot; capture fills the gap.
                let behind = (now.as_secs_f64() / interval.as_secs_f64()).floor() as u64;
                if behind > tick {
                    tracing::trace!(skipped = behind - tick, "render loop behind schedule");
                    tick = behind;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/render_loop.rs"]
mod tests;
