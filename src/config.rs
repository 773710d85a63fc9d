use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;

use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{ComposeError, ComposeResult};
use crate::geometry::transition::GrowthTransition;
use crate::render::compositor::FrameStyle;

/// Engine configuration shared by every composition a [`crate::Compositor`] runs.
///
/// All fields have defaults, so a JSON file only needs to list overrides.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ComposeConfig {
    /// Output canvas (must be even for yuv420p encoding).
    pub canvas: Canvas,
    /// Render loop cadence and output frame rate.
    pub fps: u32,
    /// Target video bitrate in bits per second.
    pub video_bitrate: u32,
    /// How long the overlay may take to become ready.
    pub load_timeout_ms: u64,
    /// Duration assumed when the overlay reports none (also the hard stop).
    pub fallback_duration_secs: f64,
    /// Size of synthesized backgrounds.
    pub background_size: Canvas,
    /// Per-frame drawing style.
    pub style: FrameStyle,
    /// Optional bubble-to-full-screen growth for [`crate::DisplayMode::FullScreen`].
    pub fullscreen_transition: Option<GrowthTransition>,
    /// Bounded queue between the render loop and the encoder thread.
    pub encoder_queue: usize,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            canvas: Canvas::new(1280, 720),
            fps: 30,
            video_bitrate: 5_000_000,
            load_timeout_ms: 30_000,
            fallback_duration_secs: 10.0,
            background_size: Canvas::new(1280, 2000),
            style: FrameStyle::default(),
            fullscreen_transition: None,
            encoder_queue: 8,
        }
    }
}

impl ComposeConfig {
    /// Load a JSON config file.
    pub fn from_path(path: &Path) -> ComposeResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        Self::from_json_str(&text)
    }

    /// Parse a JSON config document.
    pub fn from_json_str(text: &str) -> ComposeResult<Self> {
        let cfg: Self = serde_json::from_str(text)
            .map_err(|e| ComposeError::validation(format!("invalid config json: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply `REPLIQ_LOAD_TIMEOUT_MS` and `REPLIQ_ENCODER_QUEUE` when set to positive integers.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(ms) = env_positive::<u64>("REPLIQ_LOAD_TIMEOUT_MS") {
            self.load_timeout_ms = ms;
        }
        if let Some(n) = env_positive::<usize>("REPLIQ_ENCODER_QUEUE") {
            self.encoder_queue = n;
        }
        self
    }

    /// Check invariants the engine relies on.
    pub fn validate(&self) -> ComposeResult<()> {
        self.canvas.validate_encodable("canvas")?;
        if self.background_size.width == 0 || self.background_size.height == 0 {
            return Err(ComposeError::validation(
                "background width/height must be non-zero",
            ));
        }
        if self.fps == 0 {
            return Err(ComposeError::validation("fps must be non-zero"));
        }
        if self.video_bitrate == 0 {
            return Err(ComposeError::validation("video bitrate must be non-zero"));
        }
        if self.load_timeout_ms == 0 {
            return Err(ComposeError::validation("load timeout must be non-zero"));
        }
        if !self.fallback_duration_secs.is_finite() || self.fallback_duration_secs <= 0.0 {
            return Err(ComposeError::validation(
                "fallback duration must be a positive number of seconds",
            ));
        }
        if self.encoder_queue == 0 {
            return Err(ComposeError::validation("encoder queue must hold at least one frame"));
        }
        if let Some(t) = &self.fullscreen_transition {
            t.validate()?;
        }
        self.style.validate()
    }

    /// Output frame rate.
    pub fn output_fps(&self) -> ComposeResult<Fps> {
        Fps::whole(self.fps)
    }

    /// Overlay readiness timeout.
    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }
}

fn env_positive<T: std::str::FromStr + PartialOrd + Default>(key: &str) -> Option<T> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .filter(|n| *n > T::default())
}
