use crate::foundation::core::Rect;
use crate::model::request::{DisplayMode, Position};

/// Fixed gap between the overlay and the canvas edges.
pub const OVERLAY_PADDING: f64 = 20.0;

const SMALL_BUBBLE_MAX: f64 = 150.0;
const SMALL_BUBBLE_FRACTION: f64 = 0.20;
const BIG_BUBBLE_MAX: f64 = 280.0;
const BIG_BUBBLE_FRACTION: f64 = 0.35;
const FULL_SCREEN_FRACTION: f64 = 0.40;

/// Overlay destination rectangle in canvas pixels.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OverlayBox {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl OverlayBox {
    /// The whole canvas, used as the full-bleed terminal box.
    pub fn canvas(canvas_w: u32, canvas_h: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: f64::from(canvas_w),
            height: f64::from(canvas_h),
        }
    }

    /// As a `kurbo` rectangle.
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    /// Return `true` when the box lies inside a `canvas_w` x `canvas_h` canvas.
    pub fn fits_within(&self, canvas_w: u32, canvas_h: u32) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.x + self.width <= f64::from(canvas_w)
            && self.y + self.height <= f64::from(canvas_h)
    }
}

/// Compute the terminal overlay box for a composition.
///
/// Sizes: small bubble `min(150, 20% W)` square, big bubble `min(280, 35% W)` square, full screen
/// `40% W` wide with the source aspect ratio. The box is anchored to `position` with
/// [`OVERLAY_PADDING`] and shrinks as needed so it never leaves the padded canvas.
pub fn resolve_overlay_box(
    mode: DisplayMode,
    position: Position,
    canvas_w: u32,
    canvas_h: u32,
    video_w: u32,
    video_h: u32,
) -> OverlayBox {
    let cw = f64::from(canvas_w);
    let ch = f64::from(canvas_h);
    let avail_w = (cw - 2.0 * OVERLAY_PADDING).max(0.0);
    let avail_h = (ch - 2.0 * OVERLAY_PADDING).max(0.0);

    let (width, height) = match mode {
        DisplayMode::SmallBubble => {
            let side = SMALL_BUBBLE_MAX.min(SMALL_BUBBLE_FRACTION * cw);
            let side = side.min(avail_w).min(avail_h).floor();
            (side, side)
        }
        DisplayMode::BigBubble => {
            let side = BIG_BUBBLE_MAX.min(BIG_BUBBLE_FRACTION * cw);
            let side = side.min(avail_w).min(avail_h).floor();
            (side, side)
        }
        DisplayMode::FullScreen => {
            let aspect = if video_w > 0 && video_h > 0 {
                f64::from(video_h) / f64::from(video_w)
            } else {
                1.0
            };
            let mut w = FULL_SCREEN_FRACTION * cw;
            let mut h = w * aspect;
            let scale = (avail_w / w.max(f64::MIN_POSITIVE))
                .min(avail_h / h.max(f64::MIN_POSITIVE))
                .min(1.0);
            w *= scale;
            h *= scale;
            (w.floor(), h.floor())
        }
    };

    let x = if position.is_left() {
        OVERLAY_PADDING
    } else {
        cw - width - OVERLAY_PADDING
    };
    let y = if position.is_top() {
        OVERLAY_PADDING
    } else {
        ch - height - OVERLAY_PADDING
    };

    OverlayBox {
        x: x.clamp(0.0, (cw - width).max(0.0)),
        y: y.clamp(0.0, (ch - height).max(0.0)),
        width,
        height,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/geometry/overlay.rs"]
mod tests;
