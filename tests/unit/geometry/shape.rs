use super::*;
use kurbo::Shape as _;

fn square_box() -> OverlayBox {
    OverlayBox {
        x: 100.0,
        y: 50.0,
        width: 150.0,
        height: 150.0,
    }
}

#[test]
fn fit_mode_depends_on_shape() {
    assert_eq!(Shape::Circle.fit_mode(), FitMode::Cover);
    assert_eq!(Shape::Rounded.fit_mode(), FitMode::Contain);
    assert_eq!(Shape::Square.fit_mode(), FitMode::Contain);
}

#[test]
fn cover_fills_and_overflows_wide_source() {
    let r = fit_rect(FitMode::Cover, &square_box(), 1920, 1080);
    assert!((r.height() - 150.0).abs() < 1e-9);
    assert!(r.width() > 150.0);
    assert!((r.center().x - 175.0).abs() < 1e-9);
    assert!((r.center().y - 125.0).abs() < 1e-9);
}

#[test]
fn contain_letterboxes_wide_source() {
    let r = fit_rect(FitMode::Contain, &square_box(), 1920, 1080);
    assert!((r.width() - 150.0).abs() < 1e-9);
    assert!((r.height() - 84.375).abs() < 1e-9);
    assert!((r.y0 - (50.0 + (150.0 - 84.375) / 2.0)).abs() < 1e-9);
}

#[test]
fn zero_sized_source_maps_to_box() {
    assert_eq!(fit_rect(FitMode::Cover, &square_box(), 0, 10), square_box().rect());
}

#[test]
fn circle_path_is_inscribed() {
    let p = clip_path(Shape::Circle, &square_box(), ROUNDED_CORNER_RADIUS);
    let bb = p.bounding_box();
    assert!((bb.x0 - 100.0).abs() < 0.5);
    assert!((bb.x1 - 250.0).abs() < 0.5);
    assert!(p.contains(Point::new(175.0, 125.0)));
    assert!(!p.contains(Point::new(102.0, 52.0)));
}

#[test]
fn rounded_path_cuts_corners_but_square_does_not() {
    let rounded = clip_path(Shape::Rounded, &square_box(), ROUNDED_CORNER_RADIUS);
    let square = clip_path(Shape::Square, &square_box(), ROUNDED_CORNER_RADIUS);
    let corner = Point::new(101.0, 51.0);
    assert!(!rounded.contains(corner));
    assert!(square.contains(corner));
    assert!(rounded.contains(Point::new(175.0, 51.0)));
}
