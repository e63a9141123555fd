//! One-sample t-tests per hypothesis.

use ndarray::{ArrayView2, Axis};
use statrs::distribution::{ContinuousCDF, StudentsT};
use tdp_core::{Result, TdpError};

/// Alternative hypothesis of the per-voxel test.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Alternative {
    /// Positive effect: `p = P(T >= t)`.
    Greater,
    /// Effect of either sign: `p = 2 P(T >= |t|)`.
    TwoSided,
}

impl Default for Alternative {
    fn default() -> Self {
        Self::Greater
    }
}

/// Per-column t statistics and p-values.
#[derive(Clone, Debug)]
pub struct TTest {
    /// t statistic per hypothesis.
    pub t_stats: Vec<f64>,
    /// p-value per hypothesis.
    pub p_values: Vec<f64>,
}

pub(crate) fn validate_design(data: ArrayView2<'_, f64>) -> Result<()> {
    let (n, m) = data.dim();
    if n < 2 {
        return Err(TdpError::invalid(format!(
            "a one-sample t-test needs at least 2 subjects, got {n}"
        )));
    }
    if m == 0 {
        return Err(TdpError::invalid("data has no hypotheses"));
    }
    if data.iter().any(|v| !v.is_finite()) {
        return Err(TdpError::invalid("data contains non-finite values"));
    }
    Ok(())
}

/// t statistic from a column sum and sum of squares.
pub(crate) fn t_from_moments(sum: f64, sum_sq: f64, n: usize) -> f64 {
    let nf = n as f64;
    let mean = sum / nf;
    let var = ((sum_sq - nf * mean * mean) / (nf - 1.0)).max(0.0);
    let se = (var / nf).sqrt();
    if se > 0.0 {
        mean / se
    } else if mean > 0.0 {
        f64::INFINITY
    } else if mean < 0.0 {
        f64::NEG_INFINITY
    } else {
        0.0
    }
}

/// Upper-tail or two-sided p-value of `t` under Student's t.
pub(crate) fn p_value(dist: &StudentsT, t: f64, alternative: Alternative) -> f64 {
    let p = match alternative {
        Alternative::Greater => tail(dist, t),
        Alternative::TwoSided => 2.0 * tail(dist, t.abs()),
    };
    p.clamp(0.0, 1.0)
}

// P(T >= t) via the lower tail at -t, which keeps precision for large t.
fn tail(dist: &StudentsT, t: f64) -> f64 {
    if t == f64::INFINITY {
        0.0
    } else if t == f64::NEG_INFINITY {
        1.0
    } else {
        dist.cdf(-t)
    }
}

pub(crate) fn students_t(n: usize) -> Result<StudentsT> {
    StudentsT::new(0.0, 1.0, (n - 1) as f64)
        .map_err(|e| TdpError::numerical(format!("student t with {} df: {e}", n - 1)))
}

/// One-sample t-test of every column of `data` (subjects x hypotheses).
pub fn one_sample_t(data: ArrayView2<'_, f64>, alternative: Alternative) -> Result<TTest> {
    validate_design(data)?;
    let n = data.nrows();
    let dist = students_t(n)?;
    let t_stats: Vec<f64> = data
        .axis_iter(Axis(1))
        .map(|col| {
            let sum: f64 = col.sum();
            let sum_sq: f64 = col.iter().map(|v| v * v).sum();
            t_from_moments(sum, sum_sq, n)
        })
        .collect();
    let p_values = t_stats
        .iter()
        .map(|&t| p_value(&dist, t, alternative))
        .collect();
    Ok(TTest { t_stats, p_values })
}
