//! Calibrated threshold curves.

use crate::error::{Result, TdpError};
use crate::template::TemplateFamily;

/// Thresholds `thr[k - 1] = t_k(lambda)` for `k = 1..=K`, derived for an
/// analysis of `m` hypotheses.
///
/// A curve is immutable once built and can be shared across any number of
/// subset queries.
#[derive(Clone, Debug, PartialEq)]
pub struct ThresholdCurve {
    thresholds: Vec<f64>,
    num_hypotheses: usize,
}

impl ThresholdCurve {
    /// Wrap explicit thresholds, which must be finite and non-decreasing.
    pub fn new(thresholds: Vec<f64>, num_hypotheses: usize) -> Result<Self> {
        if num_hypotheses == 0 {
            return Err(TdpError::invalid("threshold curve needs at least one hypothesis"));
        }
        if thresholds.len() > num_hypotheses {
            return Err(TdpError::invalid(format!(
                "{} thresholds exceed the {num_hypotheses} hypotheses",
                thresholds.len()
            )));
        }
        if let Some(k) = thresholds.iter().position(|t| !t.is_finite()) {
            return Err(TdpError::invalid(format!("threshold {k} is not finite")));
        }
        if let Some(k) = thresholds.windows(2).position(|w| w[1] < w[0]) {
            return Err(TdpError::invalid(format!(
                "thresholds must be non-decreasing in rank (rank {} < rank {})",
                k + 2,
                k + 1
            )));
        }
        Ok(Self {
            thresholds,
            num_hypotheses,
        })
    }

    /// Evaluate `template` at `lambda` for ranks `1..=k_max`.
    pub fn from_template(
        template: &TemplateFamily,
        lambda: f64,
        num_hypotheses: usize,
        k_max: usize,
    ) -> Result<Self> {
        if !lambda.is_finite() || lambda < 0.0 {
            return Err(TdpError::invalid(format!(
                "lambda must be a non-negative finite number, got {lambda}"
            )));
        }
        if num_hypotheses == 0 {
            return Err(TdpError::invalid("threshold curve needs at least one hypothesis"));
        }
        let k_max = k_max.min(template.max_rank(num_hypotheses));
        let mut thresholds = Vec::with_capacity(k_max);
        let mut running = f64::NEG_INFINITY;
        for k in 1..=k_max {
            let t = template.threshold(k, num_hypotheses, lambda);
            if !t.is_finite() {
                return Err(TdpError::numerical(format!(
                    "{} template produced a non-finite threshold at rank {k}",
                    template.name()
                )));
            }
            // Numerically inverted templates can wobble by an ulp between ranks.
            running = running.max(t);
            thresholds.push(running);
        }
        Self::new(thresholds, num_hypotheses)
    }

    /// Number of ranks `K`.
    pub fn len(&self) -> usize {
        self.thresholds.len()
    }

    /// True when no rank carries a threshold.
    pub fn is_empty(&self) -> bool {
        self.thresholds.is_empty()
    }

    /// Number of hypotheses `m` the curve was derived for.
    pub fn num_hypotheses(&self) -> usize {
        self.num_hypotheses
    }

    /// Threshold for rank `k` (1-based).
    pub fn threshold(&self, k: usize) -> Option<f64> {
        k.checked_sub(1).and_then(|i| self.thresholds.get(i).copied())
    }

    /// Borrow all thresholds.
    pub fn as_slice(&self) -> &[f64] {
        &self.thresholds
    }
}

impl AsRef<[f64]> for ThresholdCurve {
    fn as_ref(&self) -> &[f64] {
        &self.thresholds
    }
}
