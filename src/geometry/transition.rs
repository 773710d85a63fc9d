use crate::animation::ease::Ease;
use crate::animation::scroll::SCROLL_EASE;
use crate::foundation::core::Canvas;
use crate::foundation::error::{ComposeError, ComposeResult};
use crate::foundation::math::lerp;
use crate::geometry::overlay::{OverlayBox, resolve_overlay_box};
use crate::model::request::{DisplayMode, Position};

/// Bubble-to-full-screen growth of a [`DisplayMode::FullScreen`] overlay.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GrowthTransition {
    /// Playback time before growth starts.
    pub delay_secs: f64,
    /// Length of the growth phase.
    pub duration_secs: f64,
    /// Grow to the whole canvas instead of the resolved full-screen box.
    pub full_bleed: bool,
    /// Growth curve; the backdrop scroll curve unless configured.
    pub ease: Ease,
}

impl Default for GrowthTransition {
    fn default() -> Self {
        Self {
            delay_secs: 0.8,
            duration_secs: 0.6,
            full_bleed: false,
            ease: SCROLL_EASE,
        }
    }
}

impl GrowthTransition {
    pub(crate) fn validate(&self) -> ComposeResult<()> {
        if !self.delay_secs.is_finite() || self.delay_secs < 0.0 {
            return Err(ComposeError::validation(
                "transition delay must be a non-negative number of seconds",
            ));
        }
        if !self.duration_secs.is_finite() || self.duration_secs < 0.0 {
            return Err(ComposeError::validation(
                "transition duration must be a non-negative number of seconds",
            ));
        }
        Ok(())
    }

    /// Normalized growth progress at `elapsed_secs`.
    pub fn progress(&self, elapsed_secs: f64) -> f64 {
        let t = elapsed_secs - self.delay_secs;
        if t <= 0.0 {
            return 0.0;
        }
        if self.duration_secs <= 0.0 {
            return 1.0;
        }
        (t / self.duration_secs).min(1.0)
    }
}

/// Overlay geometry over the playback timeline, resolved once per composition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayTimeline {
    start: OverlayBox,
    terminal: OverlayBox,
    transition: Option<GrowthTransition>,
}

impl OverlayTimeline {
    /// Geometry that never changes.
    pub fn fixed(bx: OverlayBox) -> Self {
        Self {
            start: bx,
            terminal: bx,
            transition: None,
        }
    }

    /// Resolve the geometry for a composition.
    ///
    /// Only full-screen overlays with a configured transition animate: they start as a small bubble
    /// in the same corner and grow toward the terminal box.
    pub fn resolve(
        mode: DisplayMode,
        position: Position,
        canvas: Canvas,
        video_w: u32,
        video_h: u32,
        transition: Option<&GrowthTransition>,
    ) -> Self {
        let terminal = resolve_overlay_box(
            mode,
            position,
            canvas.width,
            canvas.height,
            video_w,
            video_h,
        );
        match (mode, transition) {
            (DisplayMode::FullScreen, Some(t)) => {
                let start = resolve_overlay_box(
                    DisplayMode::SmallBubble,
                    position,
                    canvas.width,
                    canvas.height,
                    video_w,
                    video_h,
                );
                let terminal = if t.full_bleed {
                    OverlayBox::canvas(canvas.width, canvas.height)
                } else {
                    terminal
                };
                Self {
                    start,
                    terminal,
                    transition: Some(*t),
                }
            }
            _ => Self::fixed(terminal),
        }
    }

    /// Box reached at the end of the timeline.
    pub fn terminal(&self) -> OverlayBox {
        self.terminal
    }

    /// Return `true` when the box changes over time.
    pub fn is_animated(&self) -> bool {
        self.transition.is_some()
    }

    /// Box to draw at `elapsed_secs`.
    pub fn box_at(&self, elapsed_secs: f64) -> OverlayBox {
        let Some(t) = self.transition else {
            return self.terminal;
        };
        let k = t.ease.apply(t.progress(elapsed_secs));
        OverlayBox {
            x: lerp(self.start.x, self.terminal.x, k),
            y: lerp(self.start.y, self.terminal.y, k),
            width: lerp(self.start.width, self.terminal.width, k),
            height: lerp(self.start.height, self.terminal.height, k),
        }
    }
}
