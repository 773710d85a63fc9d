use super::*;

#[test]
fn fps_validation_rejects_zero() {
    assert!(Fps::new(0, 1).is_err());
    assert!(Fps::new(30, 0).is_err());
    assert_eq!(Fps::whole(30).unwrap(), Fps::new(30, 1).unwrap());
}

#[test]
fn fps_conversions() {
    let fps = Fps::new(30, 1).unwrap();
    assert!((fps.frame_duration_secs() - 1.0 / 30.0).abs() < 1e-12);
    assert!((fps.frames_to_secs(45) - 1.5).abs() < 1e-12);
    assert_eq!(fps.secs_to_frames_round(1.0), 30);
    assert_eq!(fps.secs_to_frames_round(0.99999), 30);
    assert_eq!(fps.secs_to_frames_round(-1.0), 0);
}

#[test]
fn canvas_rgba_len() {
    assert_eq!(Canvas::new(4, 2).rgba_len(), 32);
}

#[test]
fn odd_or_empty_canvases_are_not_encodable() {
    assert!(Canvas::new(1280, 720).validate_encodable("canvas").is_ok());
    let err = Canvas::new(1281, 720).validate_encodable("canvas").unwrap_err();
    assert!(err.to_string().contains("even"));
    assert!(Canvas::new(0, 720).validate_encodable("canvas").is_err());
    assert!(Canvas::new(70_000, 720).validate_encodable("canvas").is_err());
}
