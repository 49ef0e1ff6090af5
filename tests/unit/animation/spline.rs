use super::*;

#[test]
fn lerp_hits_endpoints_and_midpoint() {
    assert_eq!(lerp(2.0, 6.0, 0.0), 2.0);
    assert_eq!(lerp(2.0, 6.0, 1.0), 6.0);
    assert_eq!(lerp(2.0, 6.0, 0.5), 4.0);
}

#[test]
fn hermite_interpolates_endpoints() {
    assert_eq!(hermite(1.0, 5.0, 3.0, -2.0, 0.0), 1.0);
    assert!((hermite(1.0, 5.0, 3.0, -2.0, 1.0) - 5.0).abs() < 1e-12);
}

#[test]
fn hermite_with_chord_tangents_is_linear() {
    for i in 0..=10 {
        let t = f64::from(i) / 10.0;
        let v = hermite(0.0, 10.0, 10.0, 10.0, t);
        assert!((v - 10.0 * t).abs() < 1e-9, "t={t} v={v}");
    }
}

#[test]
fn hermite_flat_tangents_ease_in_and_out() {
    let v = hermite(0.0, 1.0, 0.0, 0.0, 0.25);
    assert!(v < 0.25);
    let v = hermite(0.0, 1.0, 0.0, 0.0, 0.5);
    assert!((v - 0.5).abs() < 1e-12);
}
