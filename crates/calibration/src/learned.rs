//! Notip: templates learned from an independent set of null resamples.

use rayon::prelude::*;
use tdp_core::{sort_ascending, LearnedTemplate, ResampleMatrix, Result, TdpError};

use crate::calibrate::{Calibration, CalibrationConfig, Calibrator};

/// Learn a template from null resamples: column `k - 1` collects the `k`-th
/// smallest p-value of every row, sorted ascending.
pub fn learned_template(null_resamples: &ResampleMatrix, k_max: usize) -> Result<LearnedTemplate> {
    let m = null_resamples.num_hypotheses();
    if k_max == 0 || k_max > m {
        return Err(TdpError::invalid(format!(
            "k_max must be in 1..={m}, got {k_max}"
        )));
    }

    let heads: Vec<Vec<f64>> = (0..null_resamples.num_resamples())
        .into_par_iter()
        .map(|b| {
            let mut row = null_resamples.row(b).to_vec();
            if k_max < m {
                row.select_nth_unstable_by(k_max - 1, |a, c| a.total_cmp(c));
                row.truncate(k_max);
            }
            sort_ascending(&mut row);
            row
        })
        .collect();

    let mut columns: Vec<Vec<f64>> = (0..k_max)
        .map(|k| heads.iter().map(|row| row[k]).collect())
        .collect();
    columns.par_iter_mut().for_each(|col| sort_ascending(col));

    LearnedTemplate::from_sorted_columns(columns, m)
}

/// Learn a template on `training` and calibrate it on `calibration`.
///
/// The two resample sets must be independent for the JER guarantee to hold.
pub fn calibrate_notip(
    training: &ResampleMatrix,
    calibration: &ResampleMatrix,
    alpha: f64,
    k_max: usize,
) -> Result<Calibration> {
    if training.num_hypotheses() != calibration.num_hypotheses() {
        return Err(TdpError::invalid(format!(
            "training resamples have {} hypotheses, calibration resamples {}",
            training.num_hypotheses(),
            calibration.num_hypotheses()
        )));
    }
    let template = learned_template(training, k_max)?;
    tracing::debug!(
        k_max,
        num_training = training.num_resamples(),
        "learned template"
    );
    let calibrator = Calibrator::new(CalibrationConfig {
        template: template.into(),
        k_max: Some(k_max),
        ..CalibrationConfig::default()
    })?;
    calibrator.calibrate(calibration, alpha)
}
