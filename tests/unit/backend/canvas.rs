use super::*;
use std::sync::Mutex;

use crate::capture::recorder::{InMemoryRecorder, RecorderProbe};
use crate::config::ComposeConfig;
use crate::foundation::cancel::CancelToken;
use crate::foundation::clock::ManualClock;
use crate::foundation::core::Canvas;
use crate::foundation::error::{ComposeError, ErrorKind};
use crate::media::synthetic::{OverlayProbe, SyntheticOverlay};
use crate::model::request::{
    BackgroundSource, CompositionRequest, DisplayMode, OverlaySource, Position, Shape,
};
use crate::session::progress::ProgressReporter;

type OverlayFactory = Box<dyn Fn() -> SyntheticOverlay + Send + Sync>;

struct TestMedia {
    overlay: OverlayFactory,
    recorder_fails: bool,
    overlays: Mutex<Vec<OverlayProbe>>,
    recorders: Mutex<Vec<RecorderProbe>>,
}

impl TestMedia {
    fn new(overlay: impl Fn() -> SyntheticOverlay + Send + Sync + 'static) -> Self {
        Self {
            overlay: Box::new(overlay),
            recorder_fails: false,
            overlays: Mutex::new(Vec::new()),
            recorders: Mutex::new(Vec::new()),
        }
    }

    fn overlay_probe(&self) -> OverlayProbe {
        self.overlays.lock().unwrap()[0].clone()
    }

    fn recorder_probe(&self) -> RecorderProbe {
        self.recorders.lock().unwrap()[0].clone()
    }
}

impl MediaContext for TestMedia {
    fn clock(&self) -> Arc<dyn Clock> {
        Arc::new(ManualClock::new())
    }

    fn open_overlay(
        &self,
        _source: &OverlaySource,
    ) -> ComposeResult<Box<dyn OverlayVideo>> {
        let video = (self.overlay)();
        self.overlays.lock().unwrap().push(video.probe());
        Ok(Box::new(video))
    }

    fn create_recorder(&self) -> ComposeResult<Box<dyn Recorder>> {
        if self.recorder_fails {
            return Err(ComposeError::recorder_unavailable("no encoder"));
        }
        let rec = InMemoryRecorder::new();
        self.recorders.lock().unwrap().push(rec.probe());
        Ok(Box::new(rec))
    }
}

fn config() -> ComposeConfig {
    ComposeConfig {
        canvas: Canvas::new(64, 36),
        fps: 10,
        background_size: Canvas::new(64, 120),
        ..ComposeConfig::default()
    }
}

fn request() -> ResolvedRequest {
    CompositionRequest::new(OverlaySource::Path("clip.webm".into()))
        .with_label("acme.test")
        .resolve()
        .unwrap()
}

fn run(
    backend: &CanvasBackend<TestMedia>,
    cfg: &ComposeConfig,
    req: &ResolvedRequest,
) -> (ComposeResult<CompositionResult>, Vec<CompositionState>) {
    let mut cx = ComposeContext::new(
        cfg,
        ProgressReporter::new(None),
        req.cancel.clone(),
        backend.clock(),
    );
    let result = (|| {
        let media = backend.load_media(req, &cx)?;
        let timeline = backend.compute_geometry(&media, req, &cx);
        backend.render_and_encode(media, &timeline, req, &mut cx)
    })();
    (result, cx.states.history().to_vec())
}

#[test]
fn composes_for_the_clip_duration_and_releases_once() {
    let backend = CanvasBackend::new(TestMedia::new(|| {
        SyntheticOverlay::new(16, 16).with_duration(Some(2.0))
    }));
    let cfg = config();
    let (result, states) = run(&backend, &cfg, &request());
    let result = result.unwrap();

    assert_eq!(result.frame_count, 20);
    assert!((result.duration_secs - 2.0).abs() < 0.1);
    assert_eq!((result.width, result.height), (64, 36));
    assert!(!result.has_audio);
    assert_eq!(
        states,
        vec![
            CompositionState::Loading,
            CompositionState::Playing,
            CompositionState::Finalizing
        ]
    );

    let video = backend.media().overlay_probe();
    assert_eq!(video.plays(), 1);
    assert_eq!(video.pauses(), 1);
    assert_eq!(video.releases(), 1);
    let rec = backend.media().recorder_probe();
    assert_eq!(rec.starts(), 1);
    assert_eq!(rec.stops(), 1);
    assert_eq!(rec.aborts(), 0);
}

#[test]
fn never_ready_overlay_times_out_and_is_released_without_pause() {
    let backend = CanvasBackend::new(TestMedia::new(|| {
        SyntheticOverlay::new(16, 16).never_ready()
    }));
    let cfg = config();
    let (result, states) = run(&backend, &cfg, &request());
    assert_eq!(result.unwrap_err().kind(), ErrorKind::MediaLoadTimeout);
    assert_eq!(states, vec![CompositionState::Loading]);

    let video = backend.media().overlay_probe();
    assert_eq!(video.plays(), 0);
    assert_eq!(video.pauses(), 0);
    assert_eq!(video.releases(), 1);
}

#[test]
fn recorder_is_checked_before_media_loads() {
    let mut media = TestMedia::new(|| SyntheticOverlay::new(16, 16));
    media.recorder_fails = true;
    let backend = CanvasBackend::new(media);
    let cfg = config();
    let (result, _) = run(&backend, &cfg, &request());
    assert_eq!(result.unwrap_err().kind(), ErrorKind::RecorderUnavailable);
    assert!(backend.media().overlays.lock().unwrap().is_empty());
}

#[test]
fn geometry_follows_the_request() {
    let backend = CanvasBackend::new(TestMedia::new(|| SyntheticOverlay::new(100, 100)));
    let cfg = ComposeConfig {
        canvas: Canvas::new(1280, 720),
        ..config()
    };
    let req = CompositionRequest::new(OverlaySource::Path("clip.webm".into()))
        .with_display_mode(DisplayMode::SmallBubble)
        .with_position(Position::BottomRight)
        .with_shape(Shape::Circle)
        .resolve()
        .unwrap();
    let cx = ComposeContext::new(
        &cfg,
        ProgressReporter::new(None),
        CancelToken::new(),
        backend.clock(),
    );
    let media = backend.load_media(&req, &cx).unwrap();
    assert_eq!(media.background().width, 64);
    let bx = backend.compute_geometry(&media, &req, &cx).terminal();
    assert_eq!((bx.x, bx.y, bx.width, bx.height), (1110.0, 550.0, 150.0, 150.0));
}

#[test]
fn supplied_background_is_used_instead_of_synthesis() {
    let backend = CanvasBackend::new(TestMedia::new(|| SyntheticOverlay::new(16, 16)));
    let cfg = config();
    let bg = BackgroundImage {
        width: 8,
        height: 720,
        rgba8_premul: Arc::new(vec![255; 8 * 720 * 4]),
    };
    let req = CompositionRequest::new(OverlaySource::Path("clip.webm".into()))
        .with_background(BackgroundSource::Image(bg))
        .resolve()
        .unwrap();
    let cx = ComposeContext::new(
        &cfg,
        ProgressReporter::new(None),
        CancelToken::new(),
        backend.clock(),
    );
    let media = backend.load_media(&req, &cx).unwrap();
    assert_eq!((media.background().width, media.background().height), (8, 720));
}
