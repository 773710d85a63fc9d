use std::sync::Arc;

use kurbo::Affine;

use crate::background::BackgroundImage;
use crate::foundation::core::{BezPath, Canvas, Rect};
use crate::foundation::error::{ComposeError, ComposeResult};
use crate::geometry::overlay::OverlayBox;
use crate::geometry::shape::{ROUNDED_CORNER_RADIUS, clip_path, fit_rect};
use crate::media::source::VideoFrame;
use crate::model::request::Shape;
use crate::render::frame::FrameRGBA;

/// Drawing parameters shared by every frame of a composition.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FrameStyle {
    /// Opacity of the black layer drawn over the background.
    pub dim_alpha: f64,
    /// Width of the outline stroked along the clip path.
    pub border_width: f64,
    /// Outline color, straight-alpha RGBA8.
    pub border_rgba: [u8; 4],
    /// Corner radius of [`Shape::Rounded`] overlays.
    pub corner_radius: f64,
    /// Color drawn first on every frame, straight-alpha RGBA8.
    pub clear_rgba: [u8; 4],
    /// Fill behind letterboxed overlay content, straight-alpha RGBA8.
    pub letterbox_rgba: [u8; 4],
}

impl Default for FrameStyle {
    fn default() -> Self {
        Self {
            dim_alpha: 0.15,
            border_width: 3.0,
            border_rgba: [255, 255, 255, 128],
            corner_radius: ROUNDED_CORNER_RADIUS,
            clear_rgba: [17, 17, 17, 255],
            letterbox_rgba: [17, 17, 17, 255],
        }
    }
}

impl FrameStyle {
    pub(crate) fn validate(&self) -> ComposeResult<()> {
        if !(0.0..=1.0).contains(&self.dim_alpha) {
            return Err(ComposeError::validation("dim_alpha must be within [0, 1]"));
        }
        if !self.border_width.is_finite() || self.border_width < 0.0 {
            return Err(ComposeError::validation(
                "border_width must be a non-negative number",
            ));
        }
        if !self.corner_radius.is_finite() || self.corner_radius < 0.0 {
            return Err(ComposeError::validation(
                "corner_radius must be a non-negative number",
            ));
        }
        Ok(())
    }

    fn dim_alpha_u8(&self) -> u8 {
        (self.dim_alpha * 255.0).round().clamp(0.0, 255.0) as u8
    }
}

struct CachedVideo {
    pts_secs: f64,
    source: Arc<Vec<u8>>,
    paint: vello_cpu::Image,
}

/// Per-composition CPU compositor that draws one [`FrameRGBA`] per tick.
///
/// Draw order: clear, background slice at the scroll offset, dimming layer, clipped overlay
/// (letterbox fill then fitted frame), outline.
pub struct FrameCompositor {
    canvas: Canvas,
    width_u16: u16,
    height_u16: u16,
    shape: Shape,
    style: FrameStyle,
    background: vello_cpu::Image,
    background_w: f64,
    background_h: f64,
    ctx: Option<vello_cpu::RenderContext>,
    video: Option<CachedVideo>,
}

impl FrameCompositor {
    /// Prepare a compositor for `canvas` drawing `background` and overlays clipped to `shape`.
    pub fn new(
        canvas: Canvas,
        background: &BackgroundImage,
        shape: Shape,
        style: FrameStyle,
    ) -> ComposeResult<Self> {
        let width_u16: u16 = canvas
            .width
            .try_into()
            .map_err(|_| ComposeError::validation("canvas width exceeds u16"))?;
        let height_u16: u16 = canvas
            .height
            .try_into()
            .map_err(|_| ComposeError::validation("canvas height exceeds u16"))?;
        if width_u16 == 0 || height_u16 == 0 {
            return Err(ComposeError::validation("canvas must be non-empty"));
        }
        style.validate()?;
        let paint = rgba_premul_to_image(
            &background.rgba8_premul,
            background.width,
            background.height,
        )?;

        Ok(Self {
            canvas,
            width_u16,
            height_u16,
            shape,
            style,
            background: paint,
            background_w: f64::from(background.width),
            background_h: f64::from(background.height),
            ctx: None,
            video: None,
        })
    }

    /// Background height in pixels (scroll math input).
    pub fn background_height(&self) -> f64 {
        self.background_h
    }

    /// Draw one frame.
    ///
    /// `video` is the latest overlay frame; `None` leaves the clip area filled with the letterbox
    /// color.
    pub fn compose(
        &mut self,
        scroll_y: f64,
        overlay: &OverlayBox,
        video: Option<&VideoFrame>,
    ) -> ComposeResult<FrameRGBA> {
        let video_paint = match video {
            Some(frame) => Some((self.video_paint(frame)?, frame.width, frame.height)),
            None => None,
        };

        let mut ctx = match self.ctx.take() {
            Some(ctx) if ctx.width() == self.width_u16 && ctx.height() == self.height_u16 => ctx,
            _ => vello_cpu::RenderContext::new(self.width_u16, self.height_u16),
        };
        ctx.reset();
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);

        let cw = f64::from(self.canvas.width);
        let ch = f64::from(self.canvas.height);
        let full = vello_cpu::kurbo::Rect::new(0.0, 0.0, cw, ch);

        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(color(self.style.clear_rgba));
        ctx.fill_rect(&full);

        // Background slice [0, scroll_y, bg_w, ch] stretched horizontally onto the canvas.
        let bg_tr = Affine::scale_non_uniform(cw / self.background_w.max(1.0), 1.0)
            * Affine::translate((0.0, -scroll_y.max(0.0)));
        ctx.set_transform(affine_to_cpu(bg_tr));
        ctx.set_paint(self.background.clone());
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            self.background_w,
            self.background_h,
        ));

        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
            0,
            0,
            0,
            self.style.dim_alpha_u8(),
        ));
        ctx.fill_rect(&full);

        if overlay.width > 0.0 && overlay.height > 0.0 {
            let clip = bezpath_to_cpu(&clip_path(
                self.shape,
                overlay,
                self.style.corner_radius,
            ));
            ctx.push_clip_layer(&clip);
            ctx.set_paint(color(self.style.letterbox_rgba));
            ctx.fill_rect(&rect_to_cpu(overlay.rect()));
            if let Some((paint, w, h)) = video_paint {
                let dst = fit_rect(self.shape.fit_mode(), overlay, w, h);
                let tr = Affine::translate((dst.x0, dst.y0))
                    * Affine::scale_non_uniform(
                        dst.width() / f64::from(w.max(1)),
                        dst.height() / f64::from(h.max(1)),
                    );
                ctx.set_transform(affine_to_cpu(tr));
                ctx.set_paint(paint);
                ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                    0.0,
                    0.0,
                    f64::from(w),
                    f64::from(h),
                ));
                ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
            }
            ctx.pop_layer();

            if self.style.border_width > 0.0 {
                ctx.set_stroke(vello_cpu::kurbo::Stroke::new(self.style.border_width));
                ctx.set_paint(color(self.style.border_rgba));
                ctx.stroke_path(&clip);
            }
        }

        let mut pixmap = vello_cpu::Pixmap::new(self.width_u16, self.height_u16);
        ctx.flush();
        ctx.render_to_pixmap(&mut pixmap);
        self.ctx = Some(ctx);

        Ok(FrameRGBA {
            width: self.canvas.width,
            height: self.canvas.height,
            data: pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        })
    }

    fn video_paint(&mut self, frame: &VideoFrame) -> ComposeResult<vello_cpu::Image> {
        if let Some(c) = &self.video
            && c.pts_secs == frame.pts_secs
            && Arc::ptr_eq(&c.source, &frame.rgba8_premul)
        {
            return Ok(c.paint.clone());
        }
        let paint = rgba_premul_to_image(&frame.rgba8_premul, frame.width, frame.height)?;
        self.video = Some(CachedVideo {
            pts_secs: frame.pts_secs,
            source: Arc::clone(&frame.rgba8_premul),
            paint: paint.clone(),
        });
        Ok(paint)
    }
}

fn color(rgba: [u8; 4]) -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(rgba[0], rgba[1], rgba[2], rgba[3])
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn rect_to_cpu(r: Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1)
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::LineTo(p) => out.line_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::QuadTo(p1, p2) => out.quad_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
            ),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
                vello_cpu::kurbo::Point::new(p3.x, p3.y),
            ),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> ComposeResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| ComposeError::validation("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| ComposeError::validation("image height exceeds u16"))?;
    if w == 0 || h == 0 {
        return Err(ComposeError::validation("image must be non-empty"));
    }
    if bytes.len()
        != (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4)
    {
        return Err(ComposeError::validation("image byte length mismatch"));
    }
    let pixels = bytes
        .chunks_exact(4)
        .map(|px| vello_cpu::peniko::color::PremulRgba8::from_u8_array([px[0], px[1], px[2], px[3]]))
        .collect::<Vec<_>>();
    let opaque = bytes.chunks_exact(4).all(|px| px[3] == 255);
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels, w, h, !opaque,
    ))
}

fn rgba_premul_to_image(bytes: &[u8], width: u32, height: u32) -> ComposeResult<vello_cpu::Image> {
    let pixmap = pixmap_from_premul_bytes(bytes, width, height)?;
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
