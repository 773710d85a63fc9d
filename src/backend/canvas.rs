use std::sync::Arc;

use crate::animation::scroll::effective_duration;
use crate::background::BackgroundImage;
use crate::background::synth::synthesize_background;
use crate::backend::{ComposeContext, CompositionBackend, FfmpegMediaContext, MediaContext};
use crate::capture::pipeline::CapturePipeline;
use crate::capture::recorder::{Recorder, RecorderConfig};
use crate::foundation::cancel::CancelToken;
use crate::foundation::clock::Clock;
use crate::foundation::error::ComposeResult;
use crate::geometry::transition::OverlayTimeline;
use crate::media::source::{OverlayInfo, OverlayVideo, await_ready};
use crate::model::request::ResolvedRequest;
use crate::model::result::CompositionResult;
use crate::render::compositor::FrameCompositor;
use crate::session::progress::{
    BACKGROUND_READY, LOAD_STARTED, PLAYBACK_STARTED, RECORDER_READY, VIDEO_READY,
};
use crate::session::render_loop::RenderLoop;
use crate::session::state::CompositionState;

/// Owns an overlay so that pause and release each happen at most once, on every exit path.
struct VideoHandle {
    video: Box<dyn OverlayVideo>,
    played: bool,
    paused: bool,
    released: bool,
}

impl VideoHandle {
    fn new(video: Box<dyn OverlayVideo>) -> Self {
        Self {
            video,
            played: false,
            paused: false,
            released: false,
        }
    }

    fn get(&self) -> &dyn OverlayVideo {
        &*self.video
    }

    fn get_mut(&mut self) -> &mut dyn OverlayVideo {
        &mut *self.video
    }

    fn play(&mut self) -> ComposeResult<()> {
        self.video.play()?;
        self.played = true;
        Ok(())
    }

    fn pause(&mut self) {
        if self.played && !self.paused {
            self.video.pause();
            self.paused = true;
        }
    }

    fn release(&mut self) {
        self.pause();
        if !self.released {
            self.video.release();
            self.released = true;
        }
    }
}

impl Drop for VideoHandle {
    fn drop(&mut self) {
        self.release();
    }
}

/// Media loaded by [`CanvasBackend`]: a ready overlay, its metadata, the background and an
/// unstarted recorder.
pub struct LoadedMedia {
    video: VideoHandle,
    info: OverlayInfo,
    background: BackgroundImage,
    recorder: Box<dyn Recorder>,
}

impl LoadedMedia {
    /// Overlay metadata.
    pub fn info(&self) -> &OverlayInfo {
        &self.info
    }

    /// Background to scroll.
    pub fn background(&self) -> &BackgroundImage {
        &self.background
    }
}

impl std::fmt::Debug for LoadedMedia {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedMedia")
            .field("info", &self.info)
            .field("background", &(self.background.width, self.background.height))
            .field("recorder", &self.recorder.mime_type())
            .finish()
    }
}

/// Frame-by-frame compositing on a CPU canvas, captured through a streaming recorder.
#[derive(Clone, Debug, Default)]
pub struct CanvasBackend<M = FfmpegMediaContext> {
    media: M,
}

impl<M: MediaContext> CanvasBackend<M> {
    /// Backend drawing its media from `media`.
    pub fn new(media: M) -> Self {
        Self { media }
    }

    /// Media context.
    pub fn media(&self) -> &M {
        &self.media
    }

    fn load_overlay(
        &self,
        request: &ResolvedRequest,
        cx: &ComposeContext<'_>,
        clock: &dyn Clock,
        cancel: &CancelToken,
    ) -> ComposeResult<(VideoHandle, OverlayInfo)> {
        let mut video = VideoHandle::new(self.media.open_overlay(&request.overlay)?);
        let info = await_ready(video.get_mut(), clock, cx.config.load_timeout(), cancel)?;
        tracing::debug!(
            width = info.width,
            height = info.height,
            duration_secs = ?info.duration_secs,
            has_audio = info.has_audio,
            "overlay ready"
        );
        cx.progress.report(VIDEO_READY);
        Ok((video, info))
    }

    fn load_backdrop(
        &self,
        request: &ResolvedRequest,
        cx: &ComposeContext<'_>,
    ) -> ComposeResult<BackgroundImage> {
        let background = match &request.background {
            Some(source) => self.media.load_background(source)?,
            None => synthesize_background(Some(&request.website_label), cx.config.background_size),
        };
        cx.cancel.check("background load")?;
        cx.progress.report(BACKGROUND_READY);
        Ok(background)
    }
}

impl<M: MediaContext> CompositionBackend for CanvasBackend<M> {
    type Media = LoadedMedia;

    fn name(&self) -> &'static str {
        "canvas"
    }

    fn clock(&self) -> Arc<dyn Clock> {
        self.media.clock()
    }

    fn load_media(
        &self,
        request: &ResolvedRequest,
        cx: &ComposeContext<'_>,
    ) -> ComposeResult<LoadedMedia> {
        cx.progress.report(LOAD_STARTED);
        // Checked before anything plays.
        let recorder = self.media.create_recorder()?;
        cx.progress.report(RECORDER_READY);

        let load_clock = self.media.load_clock();
        // A background failure cancels the overlay wait; the parent token stays untouched.
        let overlay_cancel = cx.cancel.child();
        let (background, overlay) = rayon::join(
            || {
                let loaded = self.load_backdrop(request, cx);
                if loaded.is_err() {
                    overlay_cancel.cancel();
                }
                loaded
            },
            || self.load_overlay(request, cx, &*load_clock, &overlay_cancel),
        );
        // The background error is the cause whenever it cut the overlay load short.
        let background = background?;
        let (video, info) = overlay?;

        Ok(LoadedMedia {
            video,
            info,
            background,
            recorder,
        })
    }

    fn compute_geometry(
        &self,
        media: &LoadedMedia,
        request: &ResolvedRequest,
        cx: &ComposeContext<'_>,
    ) -> OverlayTimeline {
        OverlayTimeline::resolve(
            request.display_mode,
            request.position,
            cx.config.canvas,
            media.info.width,
            media.info.height,
            cx.config.fullscreen_transition.as_ref(),
        )
    }

    fn render_and_encode(
        &self,
        media: LoadedMedia,
        timeline: &OverlayTimeline,
        request: &ResolvedRequest,
        cx: &mut ComposeContext<'_>,
    ) -> ComposeResult<CompositionResult> {
        let LoadedMedia {
            mut video,
            info,
            background,
            recorder,
        } = media;

        let canvas = cx.config.canvas;
        let fps = cx.config.output_fps()?;
        let duration_secs = effective_duration(info.duration_secs, cx.config.fallback_duration_secs);
        if info.duration_secs != Some(duration_secs) {
            tracing::debug!(
                reported = ?info.duration_secs,
                fallback_secs = duration_secs,
                "overlay duration unknown, using fallback"
            );
        }

        let mut compositor =
            FrameCompositor::new(canvas, &background, request.shape, cx.config.style.clone())?;
        let audio = video.get().audio_route();
        let mut capture = CapturePipeline::start(
            recorder,
            RecorderConfig {
                width: canvas.width,
                height: canvas.height,
                fps,
                bitrate: cx.config.video_bitrate,
            },
            audio.as_ref(),
            cx.config.encoder_queue,
        )?;

        video.play()?;
        cx.advance(CompositionState::Playing)?;
        cx.progress.report(PLAYBACK_STARTED);

        let outcome = RenderLoop {
            video: video.get_mut(),
            compositor: &mut compositor,
            timeline,
            capture: &mut capture,
            clock: &*cx.clock,
            progress: &cx.progress,
            cancel: &cx.cancel,
            fps,
            duration_secs,
            canvas_height: f64::from(canvas.height),
        }
        .run()?;

        cx.advance(CompositionState::Finalizing)?;
        video.pause();
        let output = capture.finish(outcome.end_secs)?;
        video.release();

        tracing::debug!(
            frames = output.frames,
            bytes = output.data.len(),
            natural_end = outcome.natural_end,
            "capture finalized"
        );
        Ok(CompositionResult {
            data: output.data,
            mime_type: output.mime_type,
            duration_secs: fps.frames_to_secs(output.frames),
            width: canvas.width,
            height: canvas.height,
            frame_count: output.frames,
            has_audio: output.has_audio,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/backend/canvas.rs"]
mod tests;
