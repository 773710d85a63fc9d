use super::*;

fn assert_close(px: [u8; 4], rgb: [u8; 3]) {
    for (got, want) in px.iter().zip(rgb) {
        assert!(
            got.abs_diff(want) <= 1,
            "pixel {px:?} not close to {rgb:?}"
        );
    }
    assert_eq!(px[3], 255);
}

#[test]
fn default_size_has_header_logo_and_footer() {
    let size = Canvas::new(1280, 2000);
    let bg = synthesize_background(Some("acme.io"), size);
    assert_eq!((bg.width, bg.height), (1280, 2000));
    assert_eq!(bg.rgba8_premul.len(), size.rgba_len());

    let layout = SiteLayout::for_size(size);
    assert_close(bg.pixel(4, 4).unwrap(), INK_RGB);
    let (lx, ly) = layout.logo_center;
    assert_close(bg.pixel(lx as u32, ly as u32).unwrap(), ACCENT_RGB);
    assert_close(bg.pixel(4, 1995).unwrap(), INK_RGB);
}

#[test]
fn sections_alternate_tints() {
    let size = Canvas::new(1280, 2000);
    let bg = synthesize_background(None, size);
    let layout = SiteLayout::for_size(size);
    assert!(layout.sections.len() >= 2);

    let first = layout.sections[0];
    let second = layout.sections[1];
    assert_close(bg.pixel(4, first.y0 as u32 + 4).unwrap(), [255, 255, 255]);
    assert_close(bg.pixel(4, second.y0 as u32 + 4).unwrap(), [238, 242, 255]);
}

#[test]
fn output_is_deterministic() {
    let size = Canvas::new(640, 1000);
    let a = synthesize_background(Some("Örtlich & Söhne <GmbH>"), size);
    let b = synthesize_background(Some("Örtlich & Söhne <GmbH>"), size);
    assert_eq!(a, b);
}

#[test]
fn blank_label_uses_placeholder() {
    let size = Canvas::new(320, 500);
    let blank = synthesize_background(Some("   "), size);
    let none = synthesize_background(None, size);
    let placeholder = synthesize_background(Some(PLACEHOLDER_LABEL), size);
    assert_eq!(blank, none);
    assert_eq!(none, placeholder);
}

#[test]
fn layout_scales_with_width() {
    let full = SiteLayout::for_size(Canvas::new(1280, 2000));
    let half = SiteLayout::for_size(Canvas::new(640, 1000));
    assert_eq!(full.header.height(), 120.0);
    assert_eq!(half.header.height(), 60.0);
    assert_eq!(full.footer.y1, 2000.0);
    for pair in full.sections.windows(2) {
        assert_eq!(pair[0].y1, pair[1].y0);
    }
}

#[test]
fn tiny_sizes_do_not_panic() {
    let bg = synthesize_background(Some("x"), Canvas::new(1, 1));
    assert_eq!(bg.rgba8_premul.len(), 4);
    let bg = synthesize_background(Some("x"), Canvas::new(0, 0));
    assert_eq!((bg.width, bg.height), (1, 1));
}

#[test]
fn gradient_fallback_runs_top_to_bottom() {
    let bg = gradient_fallback(Canvas::new(4, 3));
    assert_eq!(bg.pixel(0, 0).unwrap()[..3], GRADIENT_TOP);
    assert_eq!(bg.pixel(3, 2).unwrap()[..3], GRADIENT_BOTTOM);
}

#[test]
fn labels_are_escaped() {
    assert_eq!(xml_escape("a<b>&\"c'"), "a&lt;b&gt;&amp;&quot;c&apos;");
    assert_eq!(xml_escape("line\nbreak"), "linebreak");
}
