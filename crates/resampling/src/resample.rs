//! Sign-flip permutation and residual bootstrap of one-sample designs.
//!
//! Both resamplers return a [`ResampleMatrix`] whose row 0 is the observed
//! p-values, so the observed configuration is always part of the resampling
//! distribution.

use ndarray::{Array2, ArrayView2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use statrs::distribution::StudentsT;
use tdp_core::{HypothesisSet, ResampleMatrix, Result, TdpError};

use crate::ttest::{
    one_sample_t, p_value, students_t, t_from_moments, validate_design, Alternative,
};

/// Parameters shared by the resamplers.
#[derive(Clone, Debug)]
pub struct ResamplingConfig {
    /// Number of rows `B`, including the observed row 0.
    pub num_resamples: usize,
    /// Seed; row `b` draws from its own stream so rows can run in any order.
    pub seed: u64,
    /// Alternative hypothesis for the per-voxel test.
    pub alternative: Alternative,
}

impl Default for ResamplingConfig {
    fn default() -> Self {
        Self {
            num_resamples: 1000,
            seed: 0,
            alternative: Alternative::Greater,
        }
    }
}

impl ResamplingConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.num_resamples == 0 {
            return Err(TdpError::config("num_resamples must be positive"));
        }
        Ok(())
    }

    fn row_rng(&self, row: usize) -> ChaCha8Rng {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        rng.set_stream(row as u64);
        rng
    }
}

/// Observed test results plus the resampled p-values.
#[derive(Clone, Debug)]
pub struct Resampled {
    /// Observed p-values.
    pub observed: HypothesisSet,
    /// Observed t statistics.
    pub t_stats: Vec<f64>,
    /// `B x m` resampled p-values, row 0 observed.
    pub resamples: ResampleMatrix,
}

fn assemble(observed: Vec<f64>, t_stats: Vec<f64>, rows: Vec<Vec<f64>>) -> Result<Resampled> {
    let m = observed.len();
    let b = rows.len() + 1;
    let mut flat = Vec::with_capacity(b * m);
    flat.extend_from_slice(&observed);
    for row in rows {
        flat.extend(row);
    }
    let matrix = Array2::from_shape_vec((b, m), flat)
        .map_err(|e| TdpError::numerical(format!("resample shape: {e}")))?;
    let observed = HypothesisSet::new(observed)?;
    let resamples = ResampleMatrix::with_observed(&observed, matrix)?;
    Ok(Resampled {
        observed,
        t_stats,
        resamples,
    })
}

fn pvalues_for_rows<F>(config: &ResamplingConfig, dist: &StudentsT, row_t: F) -> Vec<Vec<f64>>
where
    F: Fn(&mut ChaCha8Rng) -> Vec<f64> + Sync,
{
    (1..config.num_resamples)
        .into_par_iter()
        .map(|b| {
            let mut rng = config.row_rng(b);
            row_t(&mut rng)
                .into_iter()
                .map(|t| p_value(dist, t, config.alternative))
                .collect()
        })
        .collect()
}

/// Sign-flipping permutation: each resample multiplies every subject's
/// data by an independent random sign.
///
/// Valid under the null of a symmetric distribution centred at zero.
pub fn sign_flip_resamples(
    data: ArrayView2<'_, f64>,
    config: &ResamplingConfig,
) -> Result<Resampled> {
    config.validate()?;
    validate_design(data)?;
    let (n, m) = data.dim();
    let observed = one_sample_t(data, config.alternative)?;
    let dist = students_t(n)?;

    let sum_sq: Vec<f64> = data
        .axis_iter(Axis(1))
        .map(|col| col.iter().map(|v| v * v).sum())
        .collect();

    let rows = pvalues_for_rows(config, &dist, |rng| {
        let signs: Vec<f64> = (0..n)
            .map(|_| if rng.gen_bool(0.5) { 1.0 } else { -1.0 })
            .collect();
        let mut sums = vec![0.0; m];
        for (subject, &s) in data.axis_iter(Axis(0)).zip(&signs) {
            for (acc, &v) in sums.iter_mut().zip(subject.iter()) {
                *acc += s * v;
            }
        }
        sums.iter()
            .zip(&sum_sq)
            .map(|(&sum, &sq)| t_from_moments(sum, sq, n))
            .collect()
    });

    tracing::debug!(
        num_resamples = config.num_resamples,
        num_subjects = n,
        num_hypotheses = m,
        "sign-flip resampling done"
    );
    assemble(observed.p_values, observed.t_stats, rows)
}

/// Bootstrap of centred residuals: each resample draws subjects with
/// replacement (the same draw for every hypothesis, preserving spatial
/// dependence) from the data minus its column means.
pub fn bootstrap_resamples(
    data: ArrayView2<'_, f64>,
    config: &ResamplingConfig,
) -> Result<Resampled> {
    config.validate()?;
    validate_design(data)?;
    let (n, m) = data.dim();
    let observed = one_sample_t(data, config.alternative)?;
    let dist = students_t(n)?;

    let means = data
        .mean_axis(Axis(0))
        .ok_or_else(|| TdpError::invalid("data has no subjects"))?;
    let residuals = &data - &means;

    let rows = pvalues_for_rows(config, &dist, |rng| {
        let mut sums = vec![0.0; m];
        let mut sum_sq = vec![0.0; m];
        for _ in 0..n {
            let subject = residuals.row(rng.gen_range(0..n));
            for ((acc, acc_sq), &v) in sums.iter_mut().zip(sum_sq.iter_mut()).zip(subject.iter()) {
                *acc += v;
                *acc_sq += v * v;
            }
        }
        sums.iter()
            .zip(&sum_sq)
            .map(|(&sum, &sq)| t_from_moments(sum, sq, n))
            .collect()
    });

    tracing::debug!(
        num_resamples = config.num_resamples,
        num_subjects = n,
        num_hypotheses = m,
        "residual bootstrap done"
    );
    assemble(observed.p_values, observed.t_stats, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use rand_distr::{Distribution, StandardNormal};

    fn gaussian_data(n: usize, m: usize, shift: f64, seed: u64) -> Array2<f64> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        Array2::from_shape_fn((n, m), |_| {
            let z: f64 = StandardNormal.sample(&mut rng);
            z + shift
        })
    }

    #[test]
    fn row_zero_is_observed() {
        let data = gaussian_data(12, 30, 0.0, 1);
        let config = ResamplingConfig {
            num_resamples: 50,
            seed: 3,
            ..ResamplingConfig::default()
        };
        for out in [
            sign_flip_resamples(data.view(), &config).unwrap(),
            bootstrap_resamples(data.view(), &config).unwrap(),
        ] {
            assert_eq!(out.resamples.num_resamples(), 50);
            assert_eq!(out.resamples.num_hypotheses(), 30);
            let row0 = out.resamples.observed_row();
            assert!(row0.iter().zip(out.observed.as_slice()).all(|(a, b)| a == b));
        }
    }

    #[test]
    fn deterministic_for_a_seed() {
        let data = gaussian_data(10, 8, 0.2, 2);
        let config = ResamplingConfig {
            num_resamples: 20,
            seed: 99,
            ..ResamplingConfig::default()
        };
        let a = sign_flip_resamples(data.view(), &config).unwrap();
        let b = sign_flip_resamples(data.view(), &config).unwrap();
        assert_eq!(a.resamples, b.resamples);
        let c = bootstrap_resamples(data.view(), &config).unwrap();
        let d = bootstrap_resamples(data.view(), &config).unwrap();
        assert_eq!(c.resamples, d.resamples);
    }

    #[test]
    fn null_resamples_look_uniform() {
        let data = gaussian_data(20, 50, 1.5, 5);
        let config = ResamplingConfig {
            num_resamples: 200,
            seed: 7,
            ..ResamplingConfig::default()
        };
        // Sign flips and centred residuals both erase the mean shift.
        for out in [
            sign_flip_resamples(data.view(), &config).unwrap(),
            bootstrap_resamples(data.view(), &config).unwrap(),
        ] {
            let view = out.resamples.view();
            let mean: f64 = view.iter().skip(50).sum::<f64>() / (199.0 * 50.0);
            assert!((mean - 0.5).abs() < 0.05, "mean = {mean}");
            assert!(out.observed.as_slice().iter().all(|&p| p < 0.05));
        }
    }

    #[test]
    fn rejects_empty_config() {
        let data = gaussian_data(5, 3, 0.0, 1);
        let config = ResamplingConfig {
            num_resamples: 0,
            ..ResamplingConfig::default()
        };
        assert!(sign_flip_resamples(data.view(), &config).is_err());
    }
}
