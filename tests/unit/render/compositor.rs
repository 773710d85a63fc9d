use super::*;

const CANVAS: Canvas = Canvas::new(320, 180);

fn solid_background(w: u32, h: u32, rgb: [u8; 3]) -> BackgroundImage {
    let mut data = Vec::with_capacity(w as usize * h as usize * 4);
    for _ in 0..(w * h) {
        data.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
    }
    BackgroundImage {
        width: w,
        height: h,
        rgba8_premul: Arc::new(data),
    }
}

/// Top half `top`, bottom half `bottom`.
fn split_background(w: u32, h: u32, top: [u8; 3], bottom: [u8; 3]) -> BackgroundImage {
    let mut data = Vec::with_capacity(w as usize * h as usize * 4);
    for y in 0..h {
        let rgb = if y < h / 2 { top } else { bottom };
        for _ in 0..w {
            data.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
        }
    }
    BackgroundImage {
        width: w,
        height: h,
        rgba8_premul: Arc::new(data),
    }
}

fn solid_frame(w: u32, h: u32, rgb: [u8; 3]) -> VideoFrame {
    let bg = solid_background(w, h, rgb);
    VideoFrame {
        width: w,
        height: h,
        rgba8_premul: bg.rgba8_premul,
        pts_secs: 0.0,
    }
}

fn near(a: u8, b: u8, tol: u8) -> bool {
    a.abs_diff(b) <= tol
}

#[test]
fn background_is_dimmed_and_overlay_is_clipped() {
    let bg = solid_background(320, 180, [255, 255, 255]);
    let mut comp = FrameCompositor::new(CANVAS, &bg, Shape::Circle, FrameStyle::default()).unwrap();
    let bx = OverlayBox {
        x: 200.0,
        y: 60.0,
        width: 100.0,
        height: 100.0,
    };
    let video = solid_frame(64, 64, [255, 0, 0]);
    let frame = comp.compose(0.0, &bx, Some(&video)).unwrap();
    assert_eq!((frame.width, frame.height), (320, 180));
    assert!(frame.premultiplied);

    // Outside the overlay: white under a 15% black layer.
    let px = frame.pixel(10, 10).unwrap();
    assert!(near(px[0], 217, 2), "{px:?}");
    assert_eq!(px[3], 255);

    // Circle center shows the video undimmed.
    let px = frame.pixel(250, 110).unwrap();
    assert!(px[0] > 240 && px[1] < 10 && px[2] < 10, "{px:?}");

    // Box corner lies outside the circle.
    let px = frame.pixel(202, 62).unwrap();
    assert!(near(px[0], 217, 2) && near(px[1], 217, 2), "{px:?}");
}

#[test]
fn scroll_moves_the_background_slice() {
    let bg = split_background(320, 360, [255, 255, 255], [0, 0, 255]);
    let style = FrameStyle {
        dim_alpha: 0.0,
        ..FrameStyle::default()
    };
    let mut comp = FrameCompositor::new(CANVAS, &bg, Shape::Square, style).unwrap();
    let bx = OverlayBox {
        x: 0.0,
        y: 0.0,
        width: 0.0,
        height: 0.0,
    };
    let top = comp.compose(0.0, &bx, None).unwrap();
    let bottom = comp.compose(180.0, &bx, None).unwrap();
    assert_eq!(top.pixel(100, 90).unwrap(), [255, 255, 255, 255]);
    assert_eq!(bottom.pixel(100, 90).unwrap(), [0, 0, 255, 255]);
}

#[test]
fn narrow_background_is_stretched_to_canvas_width() {
    let bg = solid_background(160, 180, [0, 255, 0]);
    let style = FrameStyle {
        dim_alpha: 0.0,
        ..FrameStyle::default()
    };
    let mut comp = FrameCompositor::new(CANVAS, &bg, Shape::Circle, style).unwrap();
    let bx = OverlayBox {
        x: 0.0,
        y: 0.0,
        width: 0.0,
        height: 0.0,
    };
    let frame = comp.compose(0.0, &bx, None).unwrap();
    assert_eq!(frame.pixel(300, 90).unwrap(), [0, 255, 0, 255]);
}

#[test]
fn contain_fit_letterboxes_wide_video() {
    let bg = solid_background(320, 180, [255, 255, 255]);
    let style = FrameStyle {
        border_width: 0.0,
        ..FrameStyle::default()
    };
    let mut comp = FrameCompositor::new(CANVAS, &bg, Shape::Square, style).unwrap();
    let bx = OverlayBox {
        x: 100.0,
        y: 40.0,
        width: 100.0,
        height: 100.0,
    };
    // 2:1 video occupies rows 65..115 of the box.
    let video = solid_frame(200, 100, [255, 0, 0]);
    let frame = comp.compose(0.0, &bx, Some(&video)).unwrap();
    assert_eq!(frame.pixel(150, 45).unwrap(), [17, 17, 17, 255]);
    let px = frame.pixel(150, 90).unwrap();
    assert!(px[0] > 240 && px[1] < 10, "{px:?}");
}

#[test]
fn border_is_drawn_on_the_clip_edge() {
    let bg = solid_background(320, 180, [0, 0, 0]);
    let style = FrameStyle {
        dim_alpha: 0.0,
        ..FrameStyle::default()
    };
    let mut comp = FrameCompositor::new(CANVAS, &bg, Shape::Square, style).unwrap();
    let bx = OverlayBox {
        x: 100.0,
        y: 40.0,
        width: 100.0,
        height: 100.0,
    };
    let frame = comp.compose(0.0, &bx, None).unwrap();
    let edge = frame.pixel(150, 40).unwrap();
    assert!(edge[0] > 60, "{edge:?}");
    assert_eq!(frame.pixel(150, 10).unwrap(), [0, 0, 0, 255]);
}

#[test]
fn missing_video_frame_shows_letterbox_fill() {
    let bg = solid_background(320, 180, [255, 255, 255]);
    let mut comp =
        FrameCompositor::new(CANVAS, &bg, Shape::Circle, FrameStyle::default()).unwrap();
    let bx = OverlayBox {
        x: 200.0,
        y: 60.0,
        width: 100.0,
        height: 100.0,
    };
    let frame = comp.compose(0.0, &bx, None).unwrap();
    assert_eq!(frame.pixel(250, 110).unwrap(), [17, 17, 17, 255]);
}

#[test]
fn invalid_inputs_are_rejected() {
    let bg = solid_background(4, 4, [0, 0, 0]);
    assert!(FrameCompositor::new(Canvas::new(0, 10), &bg, Shape::Circle, FrameStyle::default()).is_err());
    assert!(
        FrameCompositor::new(Canvas::new(70_000, 10), &bg, Shape::Circle, FrameStyle::default())
            .is_err()
    );
    let style = FrameStyle {
        dim_alpha: 1.5,
        ..FrameStyle::default()
    };
    assert!(FrameCompositor::new(CANVAS, &bg, Shape::Circle, style).is_err());
}
