pub mod analysis;
pub mod bands;
pub mod bass;
pub mod decode;
pub mod features;
pub mod oscilloscope;
pub mod spectrum;
pub mod window;

/// Exponential smoothing step: `prev * factor + new * (1 - factor)`.
///
/// For `factor` in [0, 1] the result is a convex combination of `prev` and `new`.
#[inline]
pub fn smooth(prev: f32, new: f32, factor: f32) -> f32 {
    prev * factor + new * (1.0 - factor)
}

/// Replace NaN/inf with `fallback` so nothing non-finite reaches stored state.
#[inline]
pub fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoothing_is_convex() {
        let cases = [
            (0.0f32, 1.0f32),
            (1.0, 0.0),
            (0.3, 0.7),
            (-0.9, 0.4),
            (0.5, 0.5),
            (1.0, 1.0),
        ];
        for &(prev, new) in &cases {
            for &factor in &[0.01f32, 0.35, 0.5, 0.75, 0.99] {
                let s = smooth(prev, new, factor);
                let lo = prev.min(new) - 1e-6;
                let hi = prev.max(new) + 1e-6;
                assert!(s >= lo && s <= hi, "smooth({prev}, {new}, {factor}) = {s}");
            }
        }
    }

    #[test]
    fn smoothing_extremes() {
        assert_eq!(smooth(0.2, 0.8, 1.0), 0.2);
        assert_eq!(smooth(0.2, 0.8, 0.0), 0.8);
    }

    #[test]
    fn finite_or_replaces_non_finite() {
        assert_eq!(finite_or(f32::NAN, 0.0), 0.0);
        assert_eq!(finite_or(f32::INFINITY, 0.5), 0.5);
        assert_eq!(finite_or(0.25, 0.0), 0.25);
    }
}
