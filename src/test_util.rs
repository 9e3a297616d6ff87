//! Helpers shared by the unit tests.

/// Decoded values are fixed-point hundredths, so anything closer than this is
/// the same reading.
pub(crate) const FLOAT_EPSILON: f32 = 0.001;

macro_rules! assert_float_eq {
    ($a:expr, $b:expr) => {{
        let a: f32 = $a;
        let b: f32 = $b;
        let epsilon = $crate::test_util::FLOAT_EPSILON;
        assert!((a - b).abs() < epsilon, "{a} != {b} (~{epsilon})")
    }};
}
