/// Extents at or below this are treated as zero when deriving scales.
pub(crate) const EXTENT_EPSILON: f64 = 1e-9;

/// `num / den`, or `1.0` when `den` is (numerically) zero.
///
/// A zero-extent crop maps to a zero-extent destination whatever the scale, so picking unit
/// scale keeps every transform finite.
pub(crate) fn safe_ratio(num: f64, den: f64) -> f64 {
    if den.abs() <= EXTENT_EPSILON {
        1.0
    } else {
        num / den
    }
}

/// Round-half-up to `i32` as display hardware does for frame extents.
#[expect(
    clippy::cast_possible_truncation,
    reason = "display coordinates are clamped to the i32 range"
)]
pub(crate) fn round_extent(v: f64) -> i32 {
    (v + 0.5).clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32
}

/// Truncate toward zero to `i32` (offset conversion).
#[expect(
    clippy::cast_possible_truncation,
    reason = "display coordinates are clamped to the i32 range"
)]
pub(crate) fn trunc_coord(v: f64) -> i32 {
    v.clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32
}
