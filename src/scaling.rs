//! Fixed-point scaling between real factor values and the integer domain
//! `cp_sat` requires.
//!
//! `cp_sat` models boolean/integer programs with integer coefficients only,
//! unlike the original `pulp`+CBC implementation this crate replaces, which
//! worked over continuous coefficients directly. Every real-valued factor
//! setting and every `Δmax`/`Δmin` bound is multiplied by [`FixedPointScale::factor`]
//! and rounded to the nearest integer before a row is emitted; extracted
//! values are divided back down when the `Schedule` is built.

/// A fixed-point scale used to losslessly (within tolerance) represent
/// real-valued factor coordinates as `cp_sat` integer coefficients.
///
/// The default of `10^6` matches the `1e-6` rounding tolerance the
/// extractor uses (spec §4.5) for the binary assignment variables
/// themselves; factor coordinates get the same precision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedPointScale {
    factor: i64,
}

impl FixedPointScale {
    /// `factor` must be a positive power-of-ten-ish multiplier; any
    /// positive integer works, but non-power-of-ten values make scaled
    /// coefficients harder to reason about in logs.
    pub fn new(factor: i64) -> Self {
        assert!(factor > 0, "fixed-point scale factor must be positive");
        Self { factor }
    }

    pub fn factor(&self) -> i64 {
        self.factor
    }

    /// Scale a real value up to its nearest integer representation.
    pub fn scale(&self, value: f64) -> i64 {
        (value * self.factor as f64).round() as i64
    }

    /// Unscale an integer representation back to a real value.
    pub fn unscale(&self, value: i64) -> f64 {
        value as f64 / self.factor as f64
    }
}

impl Default for FixedPointScale {
    fn default() -> Self {
        Self::new(1_000_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_within_tolerance() {
        let s = FixedPointScale::default();
        let v = 0.1475;
        let scaled = s.scale(v);
        let back = s.unscale(scaled);
        assert!((back - v).abs() < 1e-6);
    }

    #[test]
    fn scales_zero_and_negative() {
        let s = FixedPointScale::default();
        assert_eq!(s.scale(0.0), 0);
        assert_eq!(s.scale(-2.0), -2_000_000);
    }
}
