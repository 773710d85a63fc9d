//! `-filter_complex` construction for the ffmpeg backend.
//!
//! Input `[0:v]` is the overlay clip and `[1:v]` the looped background image; the graph ends in
//! `[vout]`. Geometry and easing match the canvas backend: the background is stretched to the
//! canvas width, scrolled with an in-out quadratic crop expression, dimmed, then the fitted overlay
//! is masked to its shape and outlined.

use std::fmt::Write as _;

use crate::animation::scroll::scrollable_distance;
use crate::foundation::core::{Canvas, Fps};
use crate::geometry::overlay::OverlayBox;
use crate::geometry::shape::FitMode;
use crate::model::request::Shape;
use crate::render::compositor::FrameStyle;

/// Output label of the composed video stream.
pub const VIDEO_OUT: &str = "[vout]";

/// Everything the filter graph depends on.
#[derive(Clone, Debug)]
pub struct GraphParams<'a> {
    /// Output canvas.
    pub canvas: Canvas,
    /// Background image width and height.
    pub background: (u32, u32),
    /// Overlay destination.
    pub overlay: OverlayBox,
    /// Overlay clip shape.
    pub shape: Shape,
    /// Drawing style.
    pub style: &'a FrameStyle,
    /// Playable duration driving the scroll.
    pub duration_secs: f64,
    /// Output frame rate.
    pub fps: Fps,
}

/// Overlay box snapped to whole pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PixelBox {
    x: i64,
    y: i64,
    w: u32,
    h: u32,
}

impl PixelBox {
    fn snap(bx: &OverlayBox) -> Self {
        Self {
            x: bx.x.round() as i64,
            y: bx.y.round() as i64,
            w: (bx.width.round() as u32).max(2),
            h: (bx.height.round() as u32).max(2),
        }
    }
}

/// Build the complete filter graph.
pub fn build_filter_graph(p: &GraphParams<'_>) -> String {
    let (cw, ch) = (p.canvas.width, p.canvas.height);
    let (_, bg_h) = p.background;
    let distance = scrollable_distance(f64::from(bg_h), f64::from(ch));
    let bx = PixelBox::snap(&p.overlay);
    let mut g = String::new();

    // Background: stretch horizontally, scroll, dim.
    let _ = write!(g, "[1:v]scale={cw}:{bg_h},setsar=1,format=rgba");
    if bg_h < ch {
        let _ = write!(g, ",pad={cw}:{ch}:0:0:color={}", color(p.style.clear_rgba));
    }
    let _ = write!(
        g,
        ",crop=w={cw}:h={ch}:x=0:y='{}'",
        scroll_y_expr(distance, p.duration_secs)
    );
    if p.style.dim_alpha > 0.0 {
        let _ = write!(
            g,
            ",drawbox=x=0:y=0:w=iw:h=ih:color=black@{:.3}:t=fill",
            p.style.dim_alpha
        );
    }
    g.push_str("[bg];");

    // Overlay: fit, mask.
    let (w, h) = (bx.w, bx.h);
    match p.shape.fit_mode() {
        FitMode::Cover => {
            let _ = write!(
                g,
                "[0:v]scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h}"
            );
        }
        FitMode::Contain => {
            let _ = write!(
                g,
                "[0:v]scale={w}:{h}:force_original_aspect_ratio=decrease,\
                 pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color={}",
                color(p.style.letterbox_rgba)
            );
        }
    }
    g.push_str(",setsar=1,format=rgba");
    let mask = signed_distance_expr(
        p.shape,
        f64::from(w),
        f64::from(h),
        0.0,
        p.style.corner_radius,
    );
    if let Some(sd) = mask {
        let _ = write!(
            g,
            ",geq=r='r(X,Y)':g='g(X,Y)':b='b(X,Y)':a='if(lte({sd},0),255,0)'"
        );
    }
    g.push_str("[ov];");

    let _ = write!(g, "[bg][ov]overlay=x={}:y={}:eof_action=endall", bx.x, bx.y);

    let [r, gr, b, a] = p.style.border_rgba;
    if p.style.border_width <= 0.0 || a == 0 {
        g.push_str(VIDEO_OUT);
        return g;
    }

    // Outline: a stroke-wide ring centered on the clip edge, on a padded transparent layer.
    let half = p.style.border_width / 2.0;
    let pad = half.ceil() as u32 + 1;
    let (rw, rh) = (w + 2 * pad, h + 2 * pad);
    let sd = signed_distance_expr(
        p.shape,
        f64::from(w),
        f64::from(h),
        f64::from(pad),
        p.style.corner_radius,
    )
    .unwrap_or_else(|| rect_distance_expr(f64::from(w), f64::from(h), f64::from(pad), 0.0));
    let _ = write!(
        g,
        "[base];color=c=black:s={rw}x{rh}:r={}/{}:d={:.6},format=rgba,\
         geq=r={r}:g={gr}:b={b}:a='if(lte(abs({sd}),{half:.3}),{a},0)'[ring];\
         [base][ring]overlay=x={}:y={}:shortest=1{VIDEO_OUT}",
        p.fps.num,
        p.fps.den,
        p.duration_secs,
        bx.x - i64::from(pad),
        bx.y - i64::from(pad),
    );
    g
}

/// Crop `y` expression: `distance * ease(min(t / duration, 1))` with in-out quadratic easing.
pub fn scroll_y_expr(distance: f64, duration_secs: f64) -> String {
    if distance <= 0.0 || !duration_secs.is_finite() || duration_secs <= 0.0 {
        return "0".to_owned();
    }
    let p = format!("min(t/{duration_secs:.6},1)");
    format!("{distance:.3}*{}", ease_expr(&p))
}

/// In-out quadratic easing of the expression `p`.
pub fn ease_expr(p: &str) -> String {
    format!("if(lt({p},0.5),2*{p}*{p},1-pow(-2*{p}+2,2)/2)")
}

/// Signed distance from pixel `(X, Y)` to the shape edge (negative inside), for a `w` x `h` box
/// offset by `inset` on both axes. `None` for squares, which need no mask.
fn signed_distance_expr(
    shape: Shape,
    w: f64,
    h: f64,
    inset: f64,
    corner_radius: f64,
) -> Option<String> {
    match shape {
        Shape::Circle => {
            let (cx, cy) = (inset + w / 2.0, inset + h / 2.0);
            let r = w.min(h) / 2.0;
            Some(format!("hypot(X-{cx:.3},Y-{cy:.3})-{r:.3}"))
        }
        Shape::Rounded => {
            let r = corner_radius.max(0.0).min(w / 2.0).min(h / 2.0);
            Some(rect_distance_expr(w, h, inset, r))
        }
        Shape::Square => None,
    }
}

fn rect_distance_expr(w: f64, h: f64, inset: f64, radius: f64) -> String {
    let (cx, cy) = (inset + w / 2.0, inset + h / 2.0);
    let qx = format!("(abs(X-{cx:.3})-{:.3})", w / 2.0 - radius);
    let qy = format!("(abs(Y-{cy:.3})-{:.3})", h / 2.0 - radius);
    format!("(hypot(max({qx},0),max({qy},0))+min(max({qx},{qy}),0)-{radius:.3})")
}

/// ffmpeg color literal for straight-alpha RGBA8.
fn color([r, g, b, a]: [u8; 4]) -> String {
    format!("0x{r:02x}{g:02x}{b:02x}@{:.3}", f64::from(a) / 255.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(style: &FrameStyle, shape: Shape, bg_h: u32) -> GraphParams<'_> {
        GraphParams {
            canvas: Canvas::new(1280, 720),
            background: (1280, bg_h),
            overlay: OverlayBox {
                x: 1110.0,
                y: 550.0,
                width: 150.0,
                height: 150.0,
            },
            shape,
            style,
            duration_secs: 4.0,
            fps: Fps::new(30, 1).unwrap(),
        }
    }

    #[test]
    fn scroll_expression_is_static_without_distance() {
        assert_eq!(scroll_y_expr(0.0, 4.0), "0");
        assert_eq!(scroll_y_expr(500.0, f64::NAN), "0");
        let e = scroll_y_expr(1280.0, 4.0);
        assert!(e.starts_with("1280.000*if(lt(min(t/4.000000,1),0.5)"));
    }

    #[test]
    fn circle_graph_scrolls_masks_and_outlines() {
        let style = FrameStyle::default();
        let g = build_filter_graph(&params(&style, Shape::Circle, 2000));
        assert!(g.starts_with("[1:v]scale=1280:2000"));
        assert!(!g.contains("pad=1280:720"));
        assert!(g.contains("crop=w=1280:h=720:x=0:y='1280.000*"));
        assert!(g.contains("drawbox=x=0:y=0:w=iw:h=ih:color=black@0.150:t=fill"));
        assert!(g.contains("force_original_aspect_ratio=increase,crop=150:150"));
        assert!(g.contains("hypot(X-75.000,Y-75.000)-75.000"));
        assert!(g.contains("[bg][ov]overlay=x=1110:y=550"));
        assert!(g.contains("s=156x156"));
        assert!(g.contains("overlay=x=1107:y=547"));
        assert!(g.ends_with(VIDEO_OUT));
    }

    #[test]
    fn short_background_is_padded_and_static() {
        let style = FrameStyle::default();
        let g = build_filter_graph(&params(&style, Shape::Square, 600));
        assert!(g.contains("pad=1280:720:0:0:color=0x111111@1.000"));
        assert!(g.contains(":y='0'"));
    }

    #[test]
    fn square_letterboxes_without_mask() {
        let style = FrameStyle {
            border_width: 0.0,
            ..FrameStyle::default()
        };
        let g = build_filter_graph(&params(&style, Shape::Square, 720));
        assert!(g.contains("force_original_aspect_ratio=decrease,pad=150:150"));
        assert!(!g.contains("geq"));
        assert!(g.ends_with(&format!("eof_action=endall{VIDEO_OUT}")));
    }

    #[test]
    fn rounded_mask_caps_the_radius() {
        let style = FrameStyle {
            corner_radius: 500.0,
            ..FrameStyle::default()
        };
        let g = build_filter_graph(&params(&style, Shape::Rounded, 720));
        assert!(g.contains("-75.000)"));
        assert!(g.contains("(abs(X-75.000)-0.000)"));
    }

    #[test]
    fn colors_are_hex_with_alpha() {
        assert_eq!(color([255, 255, 255, 128]), "0xffffff@0.502");
    }
}
