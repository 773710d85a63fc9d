use kurbo::Shape as _;

use crate::foundation::core::{BezPath, Point, Rect};
use crate::geometry::overlay::OverlayBox;
use crate::model::request::Shape;

/// Corner radius of [`Shape::Rounded`] overlays.
pub const ROUNDED_CORNER_RADIUS: f64 = 16.0;

const PATH_TOLERANCE: f64 = 0.1;

/// How overlay content is scaled into its box.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FitMode {
    /// Scale to fill the box, cropping the overflow.
    Cover,
    /// Scale to fit inside the box, centered, letterboxing the rest.
    Contain,
}

impl Shape {
    /// Circles crop their content; rounded and square overlays letterbox it.
    pub fn fit_mode(self) -> FitMode {
        match self {
            Shape::Circle => FitMode::Cover,
            Shape::Rounded | Shape::Square => FitMode::Contain,
        }
    }
}

/// Clip path of `shape` inside `bx`.
///
/// Circles are centered with radius `min(w, h) / 2`; rounded corners are capped at half the
/// shorter side.
pub fn clip_path(shape: Shape, bx: &OverlayBox, corner_radius: f64) -> BezPath {
    let rect = bx.rect();
    match shape {
        Shape::Circle => {
            let r = bx.width.min(bx.height) / 2.0;
            kurbo::Circle::new(rect.center(), r).to_path(PATH_TOLERANCE)
        }
        Shape::Rounded => {
            let r = corner_radius
                .max(0.0)
                .min(bx.width / 2.0)
                .min(bx.height / 2.0);
            kurbo::RoundedRect::from_rect(rect, r).to_path(PATH_TOLERANCE)
        }
        Shape::Square => rect.to_path(PATH_TOLERANCE),
    }
}

/// Destination rectangle of a `src_w` x `src_h` source fitted into `bx`.
///
/// The result is centered on the box; with [`FitMode::Cover`] it may extend past the box and
/// relies on the clip path.
pub fn fit_rect(fit: FitMode, bx: &OverlayBox, src_w: u32, src_h: u32) -> Rect {
    let rect = bx.rect();
    if src_w == 0 || src_h == 0 {
        return rect;
    }
    let sx = bx.width / f64::from(src_w);
    let sy = bx.height / f64::from(src_h);
    let s = match fit {
        FitMode::Cover => sx.max(sy),
        FitMode::Contain => sx.min(sy),
    };
    let w = f64::from(src_w) * s;
    let h = f64::from(src_h) * s;
    let c = rect.center();
    Rect::from_origin_size(Point::new(c.x - w / 2.0, c.y - h / 2.0), (w, h))
}

#[cfg(test)]
#[path = "../../tests/unit/geometry/shape.rs"]
mod tests;
