#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use repliq::capture::{InMemoryRecorder, Recorder, RecorderProbe};
use repliq::media::{OverlayProbe, OverlayVideo, SyntheticOverlay};
use repliq::{
    Canvas, CanvasBackend, Clock, ComposeConfig, ComposeError, ComposeResult, Compositor,
    ManualClock, MediaContext, OverlaySource, SystemClock,
};

type OverlayFactory = Box<dyn Fn(&OverlaySource) -> SyntheticOverlay + Send + Sync>;
type RecorderFactory = Box<dyn Fn() -> ComposeResult<InMemoryRecorder> + Send + Sync>;

/// Synthetic overlays, in-memory recorders and a fresh virtual clock per composition.
pub struct TestMedia {
    overlay: OverlayFactory,
    recorder: RecorderFactory,
    clocks: Mutex<Vec<Arc<ManualClock>>>,
    overlays: Mutex<Vec<OverlayProbe>>,
    recorders: Mutex<Vec<RecorderProbe>>,
    real_load_clock: bool,
}

impl TestMedia {
    pub fn new(overlay: impl Fn(&OverlaySource) -> SyntheticOverlay + Send + Sync + 'static) -> Self {
        Self {
            overlay: Box::new(overlay),
            recorder: Box::new(|| Ok(InMemoryRecorder::new())),
            clocks: Mutex::new(Vec::new()),
            overlays: Mutex::new(Vec::new()),
            recorders: Mutex::new(Vec::new()),
            real_load_clock: false,
        }
    }

    /// Every composition gets the same clip.
    pub fn clip(make: impl Fn() -> SyntheticOverlay + Send + Sync + 'static) -> Self {
        Self::new(move |_| make())
    }

    pub fn with_recorder(
        mut self,
        make: impl Fn() -> ComposeResult<InMemoryRecorder> + Send + Sync + 'static,
    ) -> Self {
        self.recorder = Box::new(make);
        self
    }

    pub fn without_recorder(self) -> Self {
        self.with_recorder(|| Err(ComposeError::recorder_unavailable("no encoder available")))
    }

    /// Overlay loading waits on the wall clock instead of a virtual one.
    pub fn with_real_load_clock(mut self) -> Self {
        self.real_load_clock = true;
        self
    }

    pub fn overlay_probes(&self) -> Vec<OverlayProbe> {
        self.overlays.lock().unwrap().clone()
    }

    pub fn recorder_probes(&self) -> Vec<RecorderProbe> {
        self.recorders.lock().unwrap().clone()
    }

    pub fn clocks(&self) -> Vec<Arc<ManualClock>> {
        self.clocks.lock().unwrap().clone()
    }
}

impl MediaContext for TestMedia {
    fn clock(&self) -> Arc<dyn Clock> {
        let clock = Arc::new(ManualClock::new());
        self.clocks.lock().unwrap().push(Arc::clone(&clock));
        clock
    }

    fn load_clock(&self) -> Arc<dyn Clock> {
        if self.real_load_clock {
            return Arc::new(SystemClock::new());
        }
        self.clock()
    }

    fn open_overlay(&self, source: &OverlaySource) -> ComposeResult<Box<dyn OverlayVideo>> {
        let video = (self.overlay)(source);
        self.overlays.lock().unwrap().push(video.probe());
        Ok(Box::new(video))
    }

    fn create_recorder(&self) -> ComposeResult<Box<dyn Recorder>> {
        let rec = (self.recorder)()?;
        self.recorders.lock().unwrap().push(rec.probe());
        Ok(Box::new(rec))
    }
}

/// Small canvas so tests stay fast; everything else at defaults.
pub fn small_config() -> ComposeConfig {
    ComposeConfig {
        canvas: Canvas::new(64, 36),
        background_size: Canvas::new(64, 160),
        ..ComposeConfig::default()
    }
}

pub fn compositor(media: TestMedia) -> Compositor<CanvasBackend<TestMedia>> {
    Compositor::with_config(CanvasBackend::new(media), small_config())
}

pub fn clip_path() -> OverlaySource {
    OverlaySource::Path("talking-head.webm".into())
}
