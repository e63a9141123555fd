//! Sorting and quantile helpers shared by calibration and bounds.
//!
//! Quantiles use linear interpolation between order statistics
//! (Hyndman & Fan type 7, the default of most statistical packages):
//! ```text
//! h = (n - 1) * p
//! q = x[floor(h)] + (h - floor(h)) * (x[ceil(h)] - x[floor(h)])
//! ```

use crate::error::{Result, TdpError};

/// Sort in place, ascending, with a total order on floats.
pub fn sort_ascending(values: &mut [f64]) {
    values.sort_unstable_by(|a, b| a.total_cmp(b));
}

/// Sorted copy of `values`.
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    sort_ascending(&mut out);
    out
}

/// Type 7 quantile of an already sorted, non-empty slice.
///
/// `p` is clamped to `[0, 1]`.
pub fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let h = (n - 1) as f64 * p.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

/// Type 7 quantile of an unsorted sample.
pub fn quantile(values: &[f64], p: f64) -> Result<f64> {
    if values.is_empty() {
        return Err(TdpError::invalid("cannot take the quantile of an empty sample"));
    }
    if !p.is_finite() || !(0.0..=1.0).contains(&p) {
        return Err(TdpError::invalid(format!(
            "quantile level {p} must lie in [0, 1]"
        )));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(TdpError::invalid("sample contains non-finite values"));
    }
    Ok(quantile_sorted(&sorted(values), p))
}

/// Inverse of [`quantile_sorted`]: the level at which the interpolated
/// quantile function reaches `x`.
///
/// Values below the sample minimum map to 0 and values at or above the
/// maximum map to 1.
pub fn interpolated_cdf(sorted: &[f64], x: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    let n = sorted.len();
    let below_or_equal = count_at_most(sorted, x);
    if below_or_equal == 0 {
        return 0.0;
    }
    if below_or_equal == n || n == 1 {
        return 1.0;
    }
    let i = below_or_equal - 1;
    let frac = (x - sorted[i]) / (sorted[i + 1] - sorted[i]);
    (i as f64 + frac) / (n - 1) as f64
}

/// Number of entries `<= x` in a sorted slice.
pub fn count_at_most(sorted: &[f64], x: f64) -> usize {
    sorted.partition_point(|&v| v <= x)
}

/// Number of entries `> x` in a sorted slice.
pub fn count_above(sorted: &[f64], x: f64) -> usize {
    sorted.len() - count_at_most(sorted, x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type7_matches_reference_values() {
        let x = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile_sorted(&x, 0.0), 1.0);
        assert_eq!(quantile_sorted(&x, 1.0), 4.0);
        assert!((quantile_sorted(&x, 0.5) - 2.5).abs() < 1e-12);
        assert!((quantile_sorted(&x, 0.1) - 1.3).abs() < 1e-12);
    }

    #[test]
    fn quantile_validates() {
        assert!(quantile(&[], 0.5).is_err());
        assert!(quantile(&[1.0], 1.5).is_err());
        assert!(quantile(&[1.0, f64::NAN], 0.5).is_err());
        assert_eq!(quantile(&[3.0, 1.0, 2.0], 0.5).unwrap(), 2.0);
    }

    #[test]
    fn cdf_inverts_quantile() {
        let x = [0.1, 0.2, 0.4, 0.8];
        for &p in &[0.0, 0.25, 0.5, 0.9] {
            let q = quantile_sorted(&x, p);
            assert!((interpolated_cdf(&x, q) - p).abs() < 1e-12);
        }
        assert_eq!(interpolated_cdf(&x, 0.05), 0.0);
        assert_eq!(interpolated_cdf(&x, 0.9), 1.0);
    }

    #[test]
    fn counting() {
        let x = [0.1, 0.2, 0.2, 0.5];
        assert_eq!(count_at_most(&x, 0.2), 3);
        assert_eq!(count_above(&x, 0.2), 1);
        assert_eq!(count_above(&x, 0.0), 4);
    }
}
