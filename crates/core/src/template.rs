//! Rank-indexed threshold templates `t_k(lambda)`.
//!
//! A template maps a scalar `lambda` to one threshold per rank `k` in
//! `1..=m`. Calibration only needs the inverse `t_k^{-1}(p)`; the bounds
//! only need the forward map at the calibrated `lambda`.

use std::fmt;
use std::sync::Arc;

use statrs::function::beta::beta_reg;

use crate::error::{Result, TdpError};
use crate::quantile::{interpolated_cdf, quantile_sorted};

/// A family of thresholds indexed by rank, monotone in both `k` and `lambda`.
pub trait RankTemplate: Send + Sync + fmt::Debug {
    /// Threshold `t_k(lambda)` for rank `k` (1-based) out of `m`.
    fn threshold(&self, k: usize, m: usize, lambda: f64) -> f64;

    /// Inverse `t_k^{-1}(p)`: the largest `lambda` with `t_k(lambda) <= p`.
    ///
    /// `p < t_k(lambda)` must hold exactly when `lambda > t_k^{-1}(p)`, so a
    /// p-value is a discovery at rank `k` precisely when it drives the
    /// pivotal statistic below `lambda`.
    fn inverse(&self, k: usize, m: usize, p: f64) -> f64;

    /// Largest rank the template is defined for when testing `m` hypotheses.
    fn max_rank(&self, m: usize) -> usize {
        m
    }
}

/// Linear (Simes) template `t_k(lambda) = lambda * k / m`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LinearTemplate;

impl RankTemplate for LinearTemplate {
    fn threshold(&self, k: usize, m: usize, lambda: f64) -> f64 {
        lambda * k as f64 / m as f64
    }

    fn inverse(&self, k: usize, m: usize, p: f64) -> f64 {
        p * m as f64 / k as f64
    }
}

/// Beta template: `t_k(lambda)` is the `lambda`-quantile of `Beta(k, m + 1 - k)`,
/// the law of the `k`-th order statistic of `m` uniforms.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BetaTemplate;

const BETA_BISECTION_STEPS: usize = 200;

impl BetaTemplate {
    fn cdf(k: usize, m: usize, x: f64) -> f64 {
        if x <= 0.0 {
            return 0.0;
        }
        if x >= 1.0 {
            return 1.0;
        }
        beta_reg(k as f64, (m + 1 - k) as f64, x)
    }
}

impl RankTemplate for BetaTemplate {
    fn threshold(&self, k: usize, m: usize, lambda: f64) -> f64 {
        let lambda = lambda.clamp(0.0, 1.0);
        if lambda == 0.0 || lambda == 1.0 {
            return lambda;
        }
        // statrs' generic inverse_cdf stops at ~1e-5 precision, too coarse for
        // thresholds at small ranks.
        let (mut lo, mut hi) = (0.0f64, 1.0f64);
        for _ in 0..BETA_BISECTION_STEPS {
            let mid = 0.5 * (lo + hi);
            if mid <= lo || mid >= hi {
                break;
            }
            if Self::cdf(k, m, mid) >= lambda {
                hi = mid;
            } else {
                lo = mid;
            }
        }
        hi
    }

    fn inverse(&self, k: usize, m: usize, p: f64) -> f64 {
        Self::cdf(k, m, p)
    }
}

/// Template learned from null resamples (the Notip procedure).
///
/// Column `k - 1` holds the sorted values of the `k`-th smallest p-value
/// across an independent set of null resamples of `m` hypotheses;
/// `t_k(lambda)` is the `lambda`-quantile of that column. Ranks past the
/// last learned column reuse it.
#[derive(Clone, Debug, PartialEq)]
pub struct LearnedTemplate {
    columns: Vec<Vec<f64>>,
    num_hypotheses: usize,
}

impl LearnedTemplate {
    /// Build from per-rank columns, each sorted ascending and of equal length,
    /// learned on resamples of `num_hypotheses` hypotheses.
    pub fn from_sorted_columns(columns: Vec<Vec<f64>>, num_hypotheses: usize) -> Result<Self> {
        let Some(first) = columns.first() else {
            return Err(TdpError::invalid("learned template needs at least one rank"));
        };
        if columns.len() > num_hypotheses {
            return Err(TdpError::invalid(format!(
                "learned template has {} ranks but only {num_hypotheses} hypotheses",
                columns.len()
            )));
        }
        let len = first.len();
        if len == 0 {
            return Err(TdpError::invalid("learned template columns are empty"));
        }
        for (k, col) in columns.iter().enumerate() {
            if col.len() != len {
                return Err(TdpError::invalid(format!(
                    "learned template column {k} has {} entries, expected {len}",
                    col.len()
                )));
            }
            if col.iter().any(|v| !v.is_finite() || !(0.0..=1.0).contains(v)) {
                return Err(TdpError::invalid(format!(
                    "learned template column {k} contains values outside [0, 1]"
                )));
            }
            if col.windows(2).any(|w| w[1] < w[0]) {
                return Err(TdpError::invalid(format!(
                    "learned template column {k} is not sorted"
                )));
            }
        }
        Ok(Self {
            columns,
            num_hypotheses,
        })
    }

    /// Number of ranks covered.
    pub fn num_ranks(&self) -> usize {
        self.columns.len()
    }

    /// Number of hypotheses in the resamples the template was learned from.
    pub fn num_hypotheses(&self) -> usize {
        self.num_hypotheses
    }

    /// Number of null resamples the template was learned from.
    pub fn num_resamples(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    /// Sorted column for rank `k` (1-based), if it was learned.
    pub fn column(&self, k: usize) -> Option<&[f64]> {
        k.checked_sub(1)
            .and_then(|i| self.columns.get(i))
            .map(Vec::as_slice)
    }

    fn rank_column(&self, k: usize) -> &[f64] {
        let last = self.columns.len() - 1;
        &self.columns[k.saturating_sub(1).min(last)]
    }
}

impl RankTemplate for LearnedTemplate {
    fn threshold(&self, k: usize, _m: usize, lambda: f64) -> f64 {
        quantile_sorted(self.rank_column(k), lambda)
    }

    fn inverse(&self, k: usize, _m: usize, p: f64) -> f64 {
        interpolated_cdf(self.rank_column(k), p)
    }

    fn max_rank(&self, m: usize) -> usize {
        m.min(self.num_ranks())
    }
}

/// Template selection for calibration.
#[derive(Clone, Debug)]
pub enum TemplateFamily {
    /// `lambda * k / m`.
    Linear,
    /// Beta order-statistic quantiles.
    Beta,
    /// Empirical template learned from null resamples.
    Learned(Arc<LearnedTemplate>),
    /// Caller-provided template.
    Custom(Arc<dyn RankTemplate>),
}

impl Default for TemplateFamily {
    fn default() -> Self {
        Self::Linear
    }
}

impl TemplateFamily {
    fn as_template(&self) -> &dyn RankTemplate {
        match self {
            Self::Linear => &LinearTemplate,
            Self::Beta => &BetaTemplate,
            Self::Learned(t) => t.as_ref(),
            Self::Custom(t) => t.as_ref(),
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Beta => "beta",
            Self::Learned(_) => "learned",
            Self::Custom(_) => "custom",
        }
    }

    /// `t_k(lambda)`.
    pub fn threshold(&self, k: usize, m: usize, lambda: f64) -> f64 {
        self.as_template().threshold(k, m, lambda)
    }

    /// `t_k^{-1}(p)`.
    pub fn inverse(&self, k: usize, m: usize, p: f64) -> f64 {
        self.as_template().inverse(k, m, p)
    }

    /// Largest usable rank for `m` hypotheses.
    pub fn max_rank(&self, m: usize) -> usize {
        self.as_template().max_rank(m)
    }
}

impl From<LearnedTemplate> for TemplateFamily {
    fn from(t: LearnedTemplate) -> Self {
        Self::Learned(Arc::new(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_round_trips() {
        let t = TemplateFamily::Linear;
        let thr = t.threshold(3, 10, 0.2);
        assert!((thr - 0.06).abs() < 1e-15);
        assert!((t.inverse(3, 10, thr) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn beta_threshold_inverts_cdf() {
        let t = TemplateFamily::Beta;
        for &k in &[1usize, 5, 50, 100] {
            let thr = t.threshold(k, 100, 0.1);
            assert!((t.inverse(k, 100, thr) - 0.1).abs() < 1e-9);
        }
    }

    #[test]
    fn beta_is_monotone_in_rank() {
        let t = TemplateFamily::Beta;
        let curve: Vec<f64> = (1..=50).map(|k| t.threshold(k, 50, 0.05)).collect();
        assert!(curve.windows(2).all(|w| w[0] <= w[1]));
        // The first rank reduces to the Sidak threshold 1 - (1 - lambda)^(1/m).
        let sidak = 1.0 - (1.0f64 - 0.05).powf(1.0 / 50.0);
        assert!((curve[0] - sidak).abs() < 1e-9);
    }

    #[test]
    fn learned_template_validates_columns() {
        assert!(LearnedTemplate::from_sorted_columns(vec![], 5).is_err());
        assert!(LearnedTemplate::from_sorted_columns(vec![vec![0.2, 0.1]], 5).is_err());
        assert!(
            LearnedTemplate::from_sorted_columns(vec![vec![0.1], vec![0.1, 0.2]], 5).is_err()
        );
        assert!(LearnedTemplate::from_sorted_columns(vec![vec![0.1], vec![0.2]], 1).is_err());
        let t = LearnedTemplate::from_sorted_columns(vec![vec![0.01, 0.02], vec![0.1, 0.3]], 10)
            .unwrap();
        assert_eq!(t.num_ranks(), 2);
        assert_eq!(t.num_hypotheses(), 10);
        assert_eq!(t.max_rank(10), 2);
        assert!((t.threshold(2, 10, 0.5) - 0.2).abs() < 1e-12);
        assert!((t.inverse(2, 10, 0.2) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn learned_ranks_outside_the_columns_are_clamped() {
        let t = LearnedTemplate::from_sorted_columns(vec![vec![0.01, 0.02], vec![0.1, 0.3]], 10)
            .unwrap();
        assert_eq!(t.column(0), None);
        assert_eq!(t.column(3), None);
        assert_eq!(t.column(2), Some(&[0.1, 0.3][..]));

        let family = TemplateFamily::from(t);
        assert_eq!(family.threshold(0, 10, 0.5), family.threshold(1, 10, 0.5));
        assert_eq!(family.threshold(7, 10, 0.5), family.threshold(2, 10, 0.5));
        assert_eq!(family.inverse(7, 10, 0.2), family.inverse(2, 10, 0.2));
    }

    #[test]
    fn learned_inverse_takes_the_largest_level_on_ties() {
        let t = LearnedTemplate::from_sorted_columns(vec![vec![0.1, 0.2, 0.2, 0.2, 0.4]], 3)
            .unwrap();
        // Levels 0.25..=0.75 all map to 0.2.
        let level = t.inverse(1, 3, 0.2);
        assert!((level - 0.75).abs() < 1e-12);
        assert!(t.threshold(1, 3, level) <= 0.2);
        assert!(t.threshold(1, 3, level + 1e-9) > 0.2);
    }
}
