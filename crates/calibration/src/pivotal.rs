//! Pivotal statistics of resampled p-values.

use ndarray::ArrayView1;
use rayon::prelude::*;
use tdp_core::{sort_ascending, ResampleMatrix, Result, TdpError, TemplateFamily};

/// Pivotal statistic of one resample row over ranks `1..=k_max`:
/// `min_k t_k^{-1}(p_(k:m))`.
///
/// Only the `k_max` smallest values are fully sorted.
pub fn row_pivotal_statistic(
    row: ArrayView1<'_, f64>,
    template: &TemplateFamily,
    k_max: usize,
) -> f64 {
    let m = row.len();
    let k_max = k_max.min(m);
    if k_max == 0 {
        return f64::INFINITY;
    }
    let mut values: Vec<f64> = row.to_vec();
    if k_max < m {
        values.select_nth_unstable_by(k_max - 1, |a, b| a.total_cmp(b));
        values.truncate(k_max);
    }
    sort_ascending(&mut values);

    values
        .iter()
        .enumerate()
        .map(|(i, &p)| template.inverse(i + 1, m, p))
        .fold(f64::INFINITY, f64::min)
}

pub(crate) fn resolve_k_max(
    resamples: &ResampleMatrix,
    template: &TemplateFamily,
    k_max: Option<usize>,
) -> Result<usize> {
    let m = resamples.num_hypotheses();
    let requested = k_max;
    let k_max = k_max.unwrap_or(m);
    if k_max == 0 {
        return Err(TdpError::invalid("k_max must be at least 1"));
    }
    if k_max > m {
        return Err(TdpError::invalid(format!(
            "k_max = {k_max} exceeds the {m} hypotheses"
        )));
    }
    let max_rank = template.max_rank(m);
    if requested.is_some() && k_max > max_rank {
        return Err(TdpError::invalid(format!(
            "k_max = {k_max} exceeds the {max_rank} ranks the {} template covers",
            template.name()
        )));
    }
    Ok(k_max.min(max_rank))
}

/// Pivotal statistic of every resample row, using all `m` ranks.
///
/// Rows are independent units of work and run on the rayon pool; the output
/// keeps row order.
pub fn compute_pivotal_statistics(
    resamples: &ResampleMatrix,
    template: &TemplateFamily,
) -> Result<Vec<f64>> {
    compute_pivotal_statistics_up_to(resamples, template, None)
}

/// Pivotal statistics restricted to ranks `1..=k_max` (all ranks when `None`).
pub fn compute_pivotal_statistics_up_to(
    resamples: &ResampleMatrix,
    template: &TemplateFamily,
    k_max: Option<usize>,
) -> Result<Vec<f64>> {
    let k_max = resolve_k_max(resamples, template, k_max)?;
    let stats: Vec<f64> = (0..resamples.num_resamples())
        .into_par_iter()
        .map(|b| row_pivotal_statistic(resamples.row(b), template, k_max))
        .collect();
    check_finite(&stats, template)?;
    Ok(stats)
}

pub(crate) fn check_finite(stats: &[f64], template: &TemplateFamily) -> Result<()> {
    if let Some(b) = stats.iter().position(|s| !s.is_finite()) {
        return Err(TdpError::numerical(format!(
            "{} template gave a non-finite pivotal statistic for resample {b}",
            template.name()
        )));
    }
    Ok(())
}
