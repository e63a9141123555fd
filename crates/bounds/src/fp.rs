//! Upper bounds on the number of false positives in a selection.
//!
//! For a threshold curve `thr` controlling the joint error rate, the number of
//! false positives in any subset `S` of size `s` is bounded, simultaneously
//! over all `S`, by
//! ```text
//! V(S) = min( s, min_{1 <= k <= min(K, s)} ( #{i in S : p_i >= thr[k-1]} + k - 1 ) )
//! ```
//! This is the closed-testing shortcut for k-FWER threshold families: if
//! fewer than `k` true nulls fall strictly below `thr[k-1]`, at most `k - 1`
//! of the discoveries under that threshold are false. A p-value equal to a
//! threshold is not a discovery, matching the strict inequality calibration
//! counts errors with.

use tdp_core::{sorted, validate_pvalues, Result, TdpError, ThresholdCurve};

fn validate_selection(pvalues: &[f64], curve: &ThresholdCurve) -> Result<()> {
    if pvalues.len() > curve.num_hypotheses() {
        return Err(TdpError::invalid(format!(
            "selection of {} p-values exceeds the {} hypotheses the curve was calibrated for",
            pvalues.len(),
            curve.num_hypotheses()
        )));
    }
    validate_pvalues(pvalues, "pvalues")
}

/// Bound on an ascending-sorted selection.
fn bound_sorted(sorted: &[f64], thresholds: &[f64]) -> usize {
    let s = sorted.len();
    let mut best = s;
    let mut below = 0usize;
    for (k_minus_one, &t) in thresholds.iter().take(s).enumerate() {
        while below < s && sorted[below] < t {
            below += 1;
        }
        best = best.min(s - below + k_minus_one);
    }
    best
}

/// Upper bound on the number of false positives among `pvalues`.
///
/// `pvalues` may be any selection of the analysed p-values, in any order and
/// chosen after looking at the data. An empty selection yields 0.
pub fn max_false_positives(pvalues: &[f64], curve: &ThresholdCurve) -> Result<usize> {
    if pvalues.is_empty() {
        return Ok(0);
    }
    validate_selection(pvalues, curve)?;
    Ok(bound_sorted(&sorted(pvalues), curve.as_slice()))
}

/// False-positive bounds for the `i` smallest p-values, `i = 1..=n`.
///
/// Entry `i - 1` equals [`max_false_positives`] of the `i` smallest values.
/// One sweep over ranks reuses work across prefixes: with `n_k` the number
/// of p-values strictly below `thr[k-1]`, ranks with `n_k >= i` contribute `k - 1`
/// and the others `i + (k - 1 - n_k)`, a prefix minimum.
pub fn confidence_envelope(pvalues: &[f64], curve: &ThresholdCurve) -> Result<Vec<usize>> {
    if pvalues.is_empty() {
        return Ok(Vec::new());
    }
    validate_selection(pvalues, curve)?;
    let sorted = sorted(pvalues);
    let n = sorted.len();
    let thresholds = curve.as_slice();
    let k_lim = thresholds.len().min(n);

    let mut counts = Vec::with_capacity(k_lim);
    let mut prefix_min = Vec::with_capacity(k_lim);
    let mut below = 0usize;
    let mut running = i64::MAX;
    for (j, &t) in thresholds.iter().take(k_lim).enumerate() {
        while below < n && sorted[below] < t {
            below += 1;
        }
        counts.push(below);
        running = running.min(j as i64 - below as i64);
        prefix_min.push(running);
    }

    let mut envelope = Vec::with_capacity(n);
    let mut k_star = 0usize;
    for i in 1..=n {
        while k_star < k_lim && counts[k_star] < i {
            k_star += 1;
        }
        let mut v = i as i64;
        if k_star < k_lim {
            v = v.min(k_star as i64);
        }
        if k_star > 0 {
            v = v.min(i as i64 + prefix_min[k_star - 1]);
        }
        envelope.push(v as usize);
    }
    Ok(envelope)
}
