use super::*;

const ALL: [Ease; 3] = [Ease::Linear, Ease::InOutQuad, Ease::InOutCubic];

#[test]
fn endpoints_are_stable() {
    for ease in ALL {
        assert_eq!(ease.apply(0.0), 0.0);
        assert_eq!(ease.apply(1.0), 1.0);
    }
}

#[test]
fn monotonic_over_unit_interval() {
    for ease in ALL {
        let mut prev = ease.apply(0.0);
        for i in 1..=1000 {
            let v = ease.apply(f64::from(i) / 1000.0);
            assert!(v >= prev, "{ease:?} decreased at step {i}");
            prev = v;
        }
    }
}

#[test]
fn in_out_quad_matches_closed_form() {
    assert!((Ease::InOutQuad.apply(0.25) - 0.125).abs() < 1e-12);
    assert!((Ease::InOutQuad.apply(0.5) - 0.5).abs() < 1e-12);
    assert!((Ease::InOutQuad.apply(0.75) - 0.875).abs() < 1e-12);
}

#[test]
fn out_of_range_input_is_clamped() {
    assert_eq!(Ease::InOutQuad.apply(-3.0), 0.0);
    assert_eq!(Ease::InOutQuad.apply(7.0), 1.0);
    assert_eq!(Ease::InOutQuad.apply(f64::NAN), 0.0);
}

#[test]
fn wire_names_are_kebab_case() {
    let e: Ease = serde_json::from_str("\"in-out-cubic\"").unwrap();
    assert_eq!(e, Ease::InOutCubic);
    assert_eq!(Ease::default(), Ease::InOutQuad);
}
