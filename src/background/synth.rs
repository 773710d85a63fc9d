use std::fmt::Write as _;
use std::sync::{Arc, OnceLock};

use crate::background::BackgroundImage;
use crate::foundation::core::{Canvas, Rect};
use crate::model::request::PLACEHOLDER_LABEL;

const REFERENCE_WIDTH: f64 = 1280.0;

const INK: &str = "#0f172a";
const INK_RGB: [u8; 3] = [15, 23, 42];
const ACCENT: &str = "#6366f1";
const ACCENT_RGB: [u8; 3] = [99, 102, 241];
const GRADIENT_TOP: [u8; 3] = [248, 250, 252];
const GRADIENT_BOTTOM: [u8; 3] = [226, 232, 240];
const SECTION_TINTS: [&str; 2] = ["#ffffff", "#eef2ff"];

/// Block layout of the synthetic page, derived from the output size only.
#[derive(Clone, Debug)]
pub(crate) struct SiteLayout {
    pub(crate) scale: f64,
    pub(crate) header: Rect,
    pub(crate) logo_center: (f64, f64),
    pub(crate) logo_radius: f64,
    pub(crate) hero: Rect,
    pub(crate) sections: Vec<Rect>,
    pub(crate) footer: Rect,
}

impl SiteLayout {
    pub(crate) fn for_size(size: Canvas) -> Self {
        let w = f64::from(size.width);
        let h = f64::from(size.height);
        let s = (w / REFERENCE_WIDTH).max(0.05);

        let header_h = (120.0 * s).min(h * 0.2);
        let footer_h = (140.0 * s).min(h * 0.2);
        let header = Rect::new(0.0, 0.0, w, header_h);
        let footer = Rect::new(0.0, h - footer_h, w, h);

        let hero_h = (460.0 * s).min((footer.y0 - header.y1).max(0.0));
        let hero = Rect::new(0.0, header.y1, w, header.y1 + hero_h);

        let section_h = 380.0 * s;
        let mut sections = Vec::new();
        let mut y = hero.y1;
        while y + section_h * 0.5 < footer.y0 {
            let y1 = (y + section_h).min(footer.y0);
            sections.push(Rect::new(0.0, y, w, y1));
            y = y1;
        }

        Self {
            scale: s,
            header,
            logo_center: (60.0 * s, header_h / 2.0),
            logo_radius: (28.0 * s).min(header_h * 0.35),
            hero,
            sections,
            footer,
        }
    }
}

/// Render a synthetic website backdrop for `label`.
///
/// Never fails: a blank label is replaced by a placeholder, and if vector rasterization is
/// unavailable a plain gradient of the same size is returned. Layout depends only on `size`, and
/// output bytes are identical for identical inputs.
#[tracing::instrument(level = "debug")]
pub fn synthesize_background(label: Option<&str>, size: Canvas) -> BackgroundImage {
    let label = label
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(PLACEHOLDER_LABEL);
    let size = Canvas::new(size.width.max(1), size.height.max(1));
    let layout = SiteLayout::for_size(size);
    let svg = site_svg(label, size, &layout);

    match rasterize(&svg, size) {
        Some(rgba8_premul) => BackgroundImage {
            width: size.width,
            height: size.height,
            rgba8_premul: Arc::new(rgba8_premul),
        },
        None => {
            tracing::warn!("background rasterization failed, using plain gradient");
            gradient_fallback(size)
        }
    }
}

fn site_svg(label: &str, size: Canvas, layout: &SiteLayout) -> String {
    let (w, h) = (f64::from(size.width), f64::from(size.height));
    let s = layout.scale;
    let label = xml_escape(label);
    let grid = 40.0 * s;

    let mut out = String::with_capacity(8 * 1024);
    let _ = write!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#
    );
    let _ = write!(
        out,
        concat!(
            r#"<defs><linearGradient id="bg" x1="0" y1="0" x2="0" y2="1">"#,
            r#"<stop offset="0" stop-color="{top}"/><stop offset="1" stop-color="{bottom}"/>"#,
            r#"</linearGradient>"#,
            r#"<pattern id="grid" width="{g}" height="{g}" patternUnits="userSpaceOnUse">"#,
            r#"<path d="M {g} 0 L 0 0 0 {g}" fill="none" stroke="{ink}" stroke-opacity="0.04" stroke-width="1"/>"#,
            r#"</pattern></defs>"#,
            r#"<rect width="{w}" height="{h}" fill="url(#bg)"/>"#,
        ),
        top = hex(GRADIENT_TOP),
        bottom = hex(GRADIENT_BOTTOM),
        g = grid,
        ink = INK,
        w = w,
        h = h,
    );

    // Header: logo mark, site name and nav pills.
    let hd = layout.header;
    let _ = write!(
        out,
        r#"<rect x="0" y="0" width="{w}" height="{hh}" fill="{INK}"/>"#,
        hh = hd.height()
    );
    let (lx, ly) = layout.logo_center;
    let _ = write!(
        out,
        r#"<circle cx="{lx}" cy="{ly}" r="{r}" fill="{ACCENT}"/>"#,
        r = layout.logo_radius
    );
    let _ = write!(
        out,
        r##"<text x="{x}" y="{y}" font-family="sans-serif" font-size="{fs}" font-weight="bold" fill="#ffffff">{label}</text>"##,
        x = lx + layout.logo_radius + 16.0 * s,
        y = ly + 10.0 * s,
        fs = 28.0 * s,
    );
    for i in 0..4 {
        let pw = 80.0 * s;
        let x = w - (i as f64 + 1.0) * (pw + 20.0 * s) - 20.0 * s;
        let _ = write!(
            out,
            r##"<rect x="{x}" y="{y}" width="{pw}" height="{ph}" rx="{rx}" fill="#334155"/>"##,
            y = ly - 8.0 * s,
            ph = 16.0 * s,
            rx = 8.0 * s,
        );
    }

    // Hero: headline bars and a call-to-action button.
    let hero = layout.hero;
    if hero.height() > 0.0 {
        let x0 = 80.0 * s;
        let mut y = hero.y0 + 90.0 * s;
        for frac in [0.55, 0.42] {
            let _ = write!(
                out,
                r##"<rect x="{x0}" y="{y}" width="{bw}" height="{bh}" rx="{rx}" fill="#1e293b"/>"##,
                bw = w * frac,
                bh = 44.0 * s,
                rx = 10.0 * s,
            );
            y += 64.0 * s;
        }
        for frac in [0.5, 0.46, 0.3] {
            let _ = write!(
                out,
                r##"<rect x="{x0}" y="{y}" width="{bw}" height="{bh}" rx="{rx}" fill="#94a3b8"/>"##,
                bw = w * frac,
                bh = 14.0 * s,
                rx = 7.0 * s,
            );
            y += 28.0 * s;
        }
        let _ = write!(
            out,
            r#"<rect x="{x0}" y="{y}" width="{bw}" height="{bh}" rx="{rx}" fill="{ACCENT}"/>"#,
            y = y + 20.0 * s,
            bw = 180.0 * s,
            bh = 52.0 * s,
            rx = 26.0 * s,
        );
    }

    // Content sections with placeholder cards.
    for (i, sec) in layout.sections.iter().enumerate() {
        let tint = SECTION_TINTS[i % SECTION_TINTS.len()];
        let _ = write!(
            out,
            r#"<rect x="0" y="{y}" width="{w}" height="{sh}" fill="{tint}"/>"#,
            y = sec.y0,
            sh = sec.height()
        );
        let _ = write!(
            out,
            r##"<rect x="{x}" y="{y}" width="{bw}" height="{bh}" rx="{rx}" fill="#1e293b"/>"##,
            x = 80.0 * s,
            y = sec.y0 + 40.0 * s,
            bw = w * 0.3,
            bh = 28.0 * s,
            rx = 8.0 * s,
        );

        let margin = 80.0 * s;
        let gap = 32.0 * s;
        let card_w = ((w - 2.0 * margin - 2.0 * gap) / 3.0).max(0.0);
        let card_y = sec.y0 + 100.0 * s;
        let card_h = (sec.y1 - card_y - 40.0 * s).max(0.0);
        if card_h <= 0.0 {
            continue;
        }
        let card_fill = if i % 2 == 0 { "#f8fafc" } else { "#ffffff" };
        for c in 0..3 {
            let cx = margin + c as f64 * (card_w + gap);
            let _ = write!(
                out,
                r##"<rect x="{cx}" y="{card_y}" width="{card_w}" height="{card_h}" rx="{rx}" fill="{card_fill}" stroke="#e2e8f0" stroke-width="{sw}"/>"##,
                rx = 14.0 * s,
                sw = 2.0 * s,
            );
            let pad = 16.0 * s;
            let img_h = card_h * 0.5;
            let _ = write!(
                out,
                r##"<rect x="{x}" y="{y}" width="{iw}" height="{img_h}" rx="{rx}" fill="#c7d2fe"/>"##,
                x = cx + pad,
                y = card_y + pad,
                iw = (card_w - 2.0 * pad).max(0.0),
                rx = 10.0 * s,
            );
            for (line, frac) in [0.8, 0.55].into_iter().enumerate() {
                let _ = write!(
                    out,
                    r##"<rect x="{x}" y="{y}" width="{lw}" height="{lh}" rx="{rx}" fill="#cbd5e1"/>"##,
                    x = cx + pad,
                    y = card_y + pad + img_h + 20.0 * s + line as f64 * 24.0 * s,
                    lw = (card_w - 2.0 * pad).max(0.0) * frac,
                    lh = 12.0 * s,
                    rx = 6.0 * s,
                );
            }
        }
    }

    // Footer with a copyright caption.
    let ft = layout.footer;
    let _ = write!(
        out,
        r#"<rect x="0" y="{y}" width="{w}" height="{fh}" fill="{INK}"/>"#,
        y = ft.y0,
        fh = ft.height()
    );
    let _ = write!(
        out,
        r##"<text x="{x}" y="{y}" font-family="sans-serif" font-size="{fs}" fill="#94a3b8">© {label}. All rights reserved.</text>"##,
        x = 80.0 * s,
        y = ft.y0 + ft.height() / 2.0 + 6.0 * s,
        fs = 18.0 * s,
    );

    out.push_str("</svg>");
    out
}

fn rasterize(svg: &str, size: Canvas) -> Option<Vec<u8>> {
    let opts = usvg::Options {
        fontdb: system_fontdb(),
        ..Default::default()
    };
    let tree = match usvg::Tree::from_str(svg, &opts) {
        Ok(tree) => tree,
        Err(e) => {
            tracing::warn!(error = %e, "synthesized background svg did not parse");
            return None;
        }
    };

    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width, size.height)?;
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::identity(),
        &mut pixmap.as_mut(),
    );
    Some(pixmap.data().to_vec())
}

/// Font database shared by every synthesized background. Read-only after first use.
fn system_fontdb() -> Arc<usvg::fontdb::Database> {
    static DB: OnceLock<Arc<usvg::fontdb::Database>> = OnceLock::new();
    DB.get_or_init(|| {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        Arc::new(db)
    })
    .clone()
}

fn gradient_fallback(size: Canvas) -> BackgroundImage {
    let mut data = Vec::with_capacity(size.rgba_len());
    let denom = f64::from(size.height.saturating_sub(1).max(1));
    for y in 0..size.height {
        let t = f64::from(y) / denom;
        let mix = |a: u8, b: u8| -> u8 {
            (f64::from(a) + (f64::from(b) - f64::from(a)) * t).round() as u8
        };
        let px = [
            mix(GRADIENT_TOP[0], GRADIENT_BOTTOM[0]),
            mix(GRADIENT_TOP[1], GRADIENT_BOTTOM[1]),
            mix(GRADIENT_TOP[2], GRADIENT_BOTTOM[2]),
            255,
        ];
        for _ in 0..size.width {
            data.extend_from_slice(&px);
        }
    }
    BackgroundImage {
        width: size.width,
        height: size.height,
        rgba8_premul: Arc::new(data),
    }
}

fn hex(rgb: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/background/synth.rs"]
mod tests;
