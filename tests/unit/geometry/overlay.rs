use super::*;

const MODES: [DisplayMode; 3] = [
    DisplayMode::SmallBubble,
    DisplayMode::BigBubble,
    DisplayMode::FullScreen,
];
const POSITIONS: [Position; 4] = [
    Position::BottomLeft,
    Position::BottomRight,
    Position::TopLeft,
    Position::TopRight,
];

#[test]
fn small_bubble_bottom_right_on_720p() {
    let b = resolve_overlay_box(
        DisplayMode::SmallBubble,
        Position::BottomRight,
        1280,
        720,
        100,
        100,
    );
    assert_eq!(
        b,
        OverlayBox {
            x: 1110.0,
            y: 550.0,
            width: 150.0,
            height: 150.0
        }
    );
}

#[test]
fn big_bubble_top_left_on_square_canvas() {
    let b = resolve_overlay_box(DisplayMode::BigBubble, Position::TopLeft, 1000, 1000, 640, 480);
    assert_eq!(b.width, 280.0);
    assert_eq!(b.height, 280.0);
    assert_eq!((b.x, b.y), (20.0, 20.0));
}

#[test]
fn small_bubble_uses_fraction_on_narrow_canvas() {
    let b = resolve_overlay_box(DisplayMode::SmallBubble, Position::TopRight, 500, 500, 1, 1);
    assert_eq!(b.width, 100.0);
    assert_eq!(b.x, 500.0 - 100.0 - 20.0);
    assert_eq!(b.y, 20.0);
}

#[test]
fn full_screen_preserves_source_aspect() {
    let b = resolve_overlay_box(
        DisplayMode::FullScreen,
        Position::BottomLeft,
        1280,
        720,
        1920,
        1080,
    );
    assert_eq!(b.width, 512.0);
    assert_eq!(b.height, 288.0);
    assert_eq!((b.x, b.y), (20.0, 720.0 - 288.0 - 20.0));
}

#[test]
fn tall_full_screen_source_shrinks_to_fit() {
    let b = resolve_overlay_box(DisplayMode::FullScreen, Position::TopLeft, 1280, 720, 720, 1280);
    assert!(b.height <= 680.0);
    assert!(b.fits_within(1280, 720));
    let aspect = b.height / b.width;
    assert!((aspect - 1280.0 / 720.0).abs() < 0.02);
}

#[test]
fn boxes_are_deterministic_and_in_bounds() {
    let canvases = [(1280, 720), (720, 1280), (64, 64), (30, 30), (10, 4), (0, 0), (1, 1000)];
    let videos = [(100, 100), (1920, 1080), (1080, 1920), (0, 0)];
    for mode in MODES {
        for pos in POSITIONS {
            for (cw, ch) in canvases {
                for (vw, vh) in videos {
                    let a = resolve_overlay_box(mode, pos, cw, ch, vw, vh);
                    let b = resolve_overlay_box(mode, pos, cw, ch, vw, vh);
                    assert_eq!(a, b);
                    assert!(a.width >= 0.0 && a.height >= 0.0);
                    assert!(
                        a.fits_within(cw, ch),
                        "{mode:?} {pos:?} {cw}x{ch} {vw}x{vh} -> {a:?}"
                    );
                }
            }
        }
    }
}

#[test]
fn padding_is_respected_on_regular_canvases() {
    for mode in MODES {
        for pos in POSITIONS {
            let b = resolve_overlay_box(mode, pos, 1280, 720, 640, 360);
            assert!(b.x >= OVERLAY_PADDING);
            assert!(b.y >= OVERLAY_PADDING);
            assert!(b.x + b.width <= 1280.0 - OVERLAY_PADDING);
            assert!(b.y + b.height <= 720.0 - OVERLAY_PADDING);
        }
    }
}
