use super::*;
use std::sync::{Arc, Mutex};

use crate::background::BackgroundImage;
use crate::capture::recorder::{InMemoryRecorder, RecorderConfig};
use crate::foundation::clock::ManualClock;
use crate::foundation::core::Canvas;
use crate::foundation::error::ErrorKind;
use crate::geometry::overlay::OverlayBox;
use crate::media::source::OverlayVideo as _;
use crate::media::synthetic::SyntheticOverlay;
use crate::model::request::Shape;
use crate::render::compositor::FrameStyle;

const CANVAS: Canvas = Canvas::new(64, 36);

struct Harness {
    compositor: FrameCompositor,
    timeline: OverlayTimeline,
    capture: CapturePipeline,
    progress: ProgressReporter,
    seen: Arc<Mutex<Vec<u8>>>,
}

fn harness(fps: u32) -> Harness {
    let bg = BackgroundImage {
        width: 64,
        height: 100,
        rgba8_premul: Arc::new(vec![255; 64 * 100 * 4]),
    };
    let compositor = FrameCompositor::new(CANVAS, &bg, Shape::Circle, FrameStyle::default()).unwrap();
    let timeline = OverlayTimeline::fixed(OverlayBox {
        x: 40.0,
        y: 12.0,
        width: 20.0,
        height: 20.0,
    });
    let capture = CapturePipeline::start(
        Box::new(InMemoryRecorder::new()),
        RecorderConfig {
            width: CANVAS.width,
            height: CANVAS.height,
            fps: Fps::new(fps, 1).unwrap(),
            bitrate: 1_000,
        },
        None,
        4,
    )
    .unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink_seen = Arc::clone(&seen);
    let progress = ProgressReporter::new(Some(Arc::new(move |p| sink_seen.lock().unwrap().push(p))));
    Harness {
        compositor,
        timeline,
        capture,
        progress,
        seen,
    }
}

fn run(
    h: &mut Harness,
    video: &mut SyntheticOverlay,
    clock: &dyn Clock,
    cancel: &CancelToken,
    fps: u32,
    duration_secs: f64,
) -> ComposeResult<LoopOutcome> {
    video.play().unwrap();
    RenderLoop {
        video,
        compositor: &mut h.compositor,
        timeline: &h.timeline,
        capture: &mut h.capture,
        clock,
        progress: &h.progress,
        cancel,
        fps: Fps::new(fps, 1).unwrap(),
        duration_secs,
        canvas_height: f64::from(CANVAS.height),
    }
    .run()
}

#[test]
fn stops_at_duration_with_one_frame_per_tick() {
    let mut h = harness(10);
    let clock = ManualClock::new();
    let mut video = SyntheticOverlay::new(16, 16).with_duration(Some(1.0));
    let out = run(&mut h, &mut video, &clock, &CancelToken::new(), 10, 1.0).unwrap();
    assert_eq!(out.ticks, 10);
    assert!((out.end_secs - 1.0).abs() < 1e-9);
    let cap = h.capture.finish(out.end_secs).unwrap();
    assert_eq!(cap.frames, 10);

    let seen = h.seen.lock().unwrap().clone();
    assert_eq!(seen.first(), Some(&50));
    assert!(seen.windows(2).all(|w| w[0] < w[1]));
    assert!(*seen.last().unwrap() <= 95);
}

#[test]
fn natural_end_wins_over_a_longer_duration() {
    let mut h = harness(10);
    let clock = ManualClock::new();
    let mut video = SyntheticOverlay::new(16, 16)
        .with_duration(Some(1.0))
        .ending_at(Some(0.5));
    let out = run(&mut h, &mut video, &clock, &CancelToken::new(), 10, 1.0).unwrap();
    assert!(out.natural_end);
    assert!((out.end_secs - 0.5).abs() < 1e-6);
    assert_eq!(h.capture.finish(out.end_secs).unwrap().frames, 5);
}

#[test]
fn unknown_duration_runs_to_the_fallback() {
    let mut h = harness(5);
    let clock = ManualClock::new();
    let mut video = SyntheticOverlay::new(16, 16).with_duration(Some(f64::NAN));
    let duration = crate::animation::scroll::effective_duration(Some(f64::NAN), 10.0);
    let out = run(&mut h, &mut video, &clock, &CancelToken::new(), 5, duration).unwrap();
    assert!(!out.natural_end);
    assert_eq!(out.end_secs, 10.0);
    assert_eq!(out.ticks, 50);
    assert!(clock.now() >= Duration::from_secs(10));
}

#[test]
fn cancellation_stops_the_loop() {
    let mut h = harness(10);
    let clock = ManualClock::new();
    let cancel = CancelToken::new();
    cancel.cancel();
    let mut video = SyntheticOverlay::new(16, 16);
    let err = run(&mut h, &mut video, &clock, &cancel, 10, 1.0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
}

/// Clock that loses `lag` on every reading, like a loop doing slow work.
struct LaggingClock {
    now: Mutex<Duration>,
    lag: Duration,
}

impl Clock for LaggingClock {
    fn now(&self) -> Duration {
        let mut now = self.now.lock().unwrap();
        let t = *now;
        *now += self.lag;
        t
    }

    fn sleep(&self, d: Duration) {
        *self.now.lock().unwrap() += d;
    }
}

#[test]
fn slow_ticks_keep_output_duration() {
    let mut h = harness(10);
    let clock = LaggingClock {
        now: Mutex::new(Duration::ZERO),
        lag: Duration::from_millis(70),
    };
    let mut video = SyntheticOverlay::new(16, 16).with_duration(Some(2.0));
    let out = run(&mut h, &mut video, &clock, &CancelToken::new(), 10, 2.0).unwrap();
    assert!(out.ticks < 20);
    assert_eq!(h.capture.finish(out.end_secs).unwrap().frames, 20);
}
