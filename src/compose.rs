use crate::backend::{CanvasBackend, ComposeContext, CompositionBackend, FfmpegMediaContext};
use crate::config::ComposeConfig;
use crate::foundation::error::ComposeResult;
use crate::model::request::{CompositionRequest, ResolvedRequest};
use crate::model::result::CompositionResult;
use crate::session::progress::{COMPLETE, ProgressReporter};
use crate::session::state::CompositionState;

/// Composition orchestrator: applies request defaults, sequences loading, geometry, playback and
/// capture on a backend, and maps failures to typed errors.
///
/// A `Compositor` holds no per-composition state, so one instance can serve concurrent calls
/// from several threads.
#[derive(Clone, Debug)]
pub struct Compositor<B = CanvasBackend> {
    backend: B,
    config: ComposeConfig,
}

impl Default for Compositor<CanvasBackend> {
    fn default() -> Self {
        Self::new(CanvasBackend::new(FfmpegMediaContext::default()))
    }
}

impl<B: CompositionBackend> Compositor<B> {
    /// Orchestrator over `backend` with the default configuration.
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, ComposeConfig::default())
    }

    /// Orchestrator over `backend` with `config`.
    pub fn with_config(backend: B, config: ComposeConfig) -> Self {
        Self { backend, config }
    }

    /// Engine configuration.
    pub fn config(&self) -> &ComposeConfig {
        &self.config
    }

    /// Backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Compose one video.
    #[tracing::instrument(level = "info", skip_all, fields(backend = self.backend.name()))]
    pub fn compose(&self, request: CompositionRequest) -> ComposeResult<CompositionResult> {
        self.config.validate()?;
        let request = request.resolve()?;
        tracing::info!(
            mode = %request.display_mode,
            position = %request.position,
            shape = %request.shape,
            label = %request.website_label,
            "composition started"
        );

        let mut cx = ComposeContext::new(
            &self.config,
            ProgressReporter::new(request.progress.clone()),
            request.cancel.clone(),
            self.backend.clock(),
        );
        match self.run(&request, &mut cx) {
            Ok(result) => {
                cx.progress.report(COMPLETE);
                tracing::info!(
                    bytes = result.data.len(),
                    frames = result.frame_count,
                    duration_secs = result.duration_secs,
                    mime = %result.mime_type,
                    has_audio = result.has_audio,
                    "composition done"
                );
                Ok(result)
            }
            Err(e) => {
                cx.states.fail(e.kind());
                tracing::warn!(error = %e, kind = ?e.kind(), "composition failed");
                Err(e)
            }
        }
    }

    fn run(
        &self,
        request: &ResolvedRequest,
        cx: &mut ComposeContext<'_>,
    ) -> ComposeResult<CompositionResult> {
        let media = self.backend.load_media(request, cx)?;
        let timeline = self.backend.compute_geometry(&media, request, cx);
        tracing::debug!(
            overlay = ?timeline.terminal(),
            animated = timeline.is_animated(),
            "overlay geometry resolved"
        );
        let result = self.backend.render_and_encode(media, &timeline, request, cx)?;
        cx.advance(CompositionState::Done)?;
        Ok(result)
    }
}

/// Compose `request` with the default canvas backend, system `ffmpeg` media and default config.
#[tracing::instrument(level = "debug", skip_all)]
pub fn compose_video(request: CompositionRequest) -> ComposeResult<CompositionResult> {
    Compositor::default().compose(request)
}
