//! Scalar interpolation kernels used by [`Curve`](crate::Curve).

/// Interpolate from `a` to `b` with normalized factor `t`.
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn h00(t: f64) -> f64 {
    2.0 * t.powi(3) - 3.0 * t.powi(2) + 1.0
}

fn h10(t: f64) -> f64 {
    t.powi(3) - 2.0 * t.powi(2) + t
}

fn h01(t: f64) -> f64 {
    -2.0 * t.powi(3) + 3.0 * t.powi(2)
}

fn h11(t: f64) -> f64 {
    t.powi(3) - t.powi(2)
}

/// Cubic Hermite segment between `p0` and `p1`.
///
/// `m0` and `m1` are the derivatives at the endpoints expressed per unit of `t`, i.e. already
/// scaled by the segment length.
pub fn hermite(p0: f64, p1: f64, m0: f64, m1: f64, t: f64) -> f64 {
    p0 * h00(t) + m0 * h10(t) + p1 * h01(t) + m1 * h11(t)
}

#[cfg(test)]
#[path = "../../tests/unit/animation/spline.rs"]
mod tests;
