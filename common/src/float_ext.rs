/// Tolerance comparisons for floating-point results.
pub trait FloatExt: Copy {
    /// Absolute comparison against [`crate::EPSILON`].
    fn approximately_eq(self, other: Self) -> bool;

    /// Absolute-or-relative comparison: passes when `|a - b| <= tol * max(1, |a|, |b|)`.
    fn within(self, other: Self, tol: Self) -> bool;
}

impl FloatExt for f32 {
    fn approximately_eq(self, other: Self) -> bool {
        (self - other).abs() < crate::EPSILON as f32
    }

    fn within(self, other: Self, tol: Self) -> bool {
        let scale = 1.0f32.max(self.abs()).max(other.abs());
        (self - other).abs() <= tol * scale
    }
}

impl FloatExt for f64 {
    fn approximately_eq(self, other: Self) -> bool {
        (self - other).abs() < crate::EPSILON
    }

    fn within(self, other: Self, tol: Self) -> bool {
        let scale = 1.0f64.max(self.abs()).max(other.abs());
        (self - other).abs() <= tol * scale
    }
}

/// Largest absolute element-wise difference between two equally sized slices.
///
/// Returns `f64::INFINITY` when the lengths differ or any pair involves NaN.
pub fn max_abs_diff<T: Copy + Into<f64>>(a: &[T], b: &[T]) -> f64 {
    if a.len() != b.len() {
        return f64::INFINITY;
    }
    let mut worst = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let d = (x.into() - y.into()).abs();
        if d.is_nan() {
            return f64::INFINITY;
        }
        worst = worst.max(d);
    }
    worst
}
