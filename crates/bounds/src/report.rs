//! (FP, TP, FDP, TDP) summaries for selected subsets.

use tdp_core::{HypothesisSet, Result, TdpError, TemplateFamily, ThresholdCurve};

use crate::fp::{confidence_envelope, max_false_positives};

/// Simultaneous bounds for one selection.
///
/// `false_positives + true_positives == size` by construction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bound {
    /// Number of selected hypotheses.
    pub size: usize,
    /// Upper bound on false positives.
    pub false_positives: usize,
    /// Lower bound on true positives.
    pub true_positives: usize,
    /// Upper bound on the false discovery proportion.
    pub fdp: f64,
    /// Lower bound on the true discovery proportion.
    pub tdp: f64,
}

impl Bound {
    fn from_counts(size: usize, false_positives: usize) -> Self {
        let fdp = false_positives as f64 / size as f64;
        Self {
            size,
            false_positives,
            true_positives: size - false_positives,
            fdp,
            tdp: 1.0 - fdp,
        }
    }

    /// `(FP, TP, FDP, TDP)`.
    pub fn as_tuple(&self) -> (usize, usize, f64, f64) {
        (self.false_positives, self.true_positives, self.fdp, self.tdp)
    }
}

/// Bounds for a selection under any calibrated curve.
pub fn bounds_with_curve(pvalues: &[f64], curve: &ThresholdCurve) -> Result<Bound> {
    if pvalues.is_empty() {
        return Err(TdpError::invalid(
            "empty selection: FDP and TDP are undefined",
        ));
    }
    let fp = max_false_positives(pvalues, curve)?;
    let bound = Bound::from_counts(pvalues.len(), fp);
    tracing::trace!(
        size = bound.size,
        false_positives = bound.false_positives,
        tdp = bound.tdp,
        "selection bound"
    );
    Ok(bound)
}

/// Bounds for a selection using the linear template at `lambda_star`.
pub fn get_bounds(pvalues: &[f64], lambda_star: f64, m: usize) -> Result<Bound> {
    if pvalues.is_empty() {
        return Err(TdpError::invalid(
            "empty selection: FDP and TDP are undefined",
        ));
    }
    let curve = ThresholdCurve::from_template(&TemplateFamily::Linear, lambda_star, m, m)?;
    bounds_with_curve(pvalues, &curve)
}

/// Bounds for the hypotheses at `indices`, e.g. the voxels of one cluster.
pub fn subset_bounds(
    hypotheses: &HypothesisSet,
    indices: &[usize],
    curve: &ThresholdCurve,
) -> Result<Bound> {
    if hypotheses.len() != curve.num_hypotheses() {
        return Err(TdpError::invalid(format!(
            "curve was calibrated for {} hypotheses, got {}",
            curve.num_hypotheses(),
            hypotheses.len()
        )));
    }
    let selected = hypotheses.select(indices)?;
    bounds_with_curve(&selected, curve)
}

/// TDP lower bounds `1 - V_i / i` for the `i` smallest p-values.
pub fn tdp_envelope(pvalues: &[f64], curve: &ThresholdCurve) -> Result<Vec<f64>> {
    let envelope = confidence_envelope(pvalues, curve)?;
    Ok(envelope
        .iter()
        .enumerate()
        .map(|(i, &v)| 1.0 - v as f64 / (i + 1) as f64)
        .collect())
}
