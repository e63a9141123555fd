//! Calibration of the template parameter `lambda` at a target JER level.

use rayon::prelude::*;
use tdp_core::{
    quantile, sort_ascending, ResampleMatrix, Result, TdpError, TemplateFamily, ThresholdCurve,
};

use crate::pivotal::{check_finite, resolve_k_max, row_pivotal_statistic};

fn validate_alpha(alpha: f64) -> Result<()> {
    if !alpha.is_finite() || alpha <= 0.0 || alpha >= 1.0 {
        return Err(TdpError::invalid(format!("alpha must be in (0, 1), got {alpha}")));
    }
    Ok(())
}

/// `lambda*_alpha`: the `alpha`-quantile of the pivotal statistics.
///
/// Smaller `alpha` gives a smaller (weakly) `lambda`, hence lower thresholds
/// and more conservative bounds.
pub fn calibrate(pivotal_stats: &[f64], alpha: f64) -> Result<f64> {
    validate_alpha(alpha)?;
    if pivotal_stats.is_empty() {
        return Err(TdpError::invalid("no pivotal statistics to calibrate on"));
    }
    quantile(pivotal_stats, alpha)
}

/// Full threshold curve `t_k(lambda_star)` for `k = 1..=m`.
pub fn threshold_curve(
    lambda_star: f64,
    m: usize,
    template: &TemplateFamily,
) -> Result<ThresholdCurve> {
    ThresholdCurve::from_template(template, lambda_star, m, m)
}

/// Fraction of resamples in which some rank `k` falls strictly below `thr[k - 1]`.
///
/// On null resamples this estimates the joint error rate of the curve.
pub fn empirical_jer(resamples: &ResampleMatrix, curve: &ThresholdCurve) -> Result<f64> {
    if resamples.num_hypotheses() != curve.num_hypotheses() {
        return Err(TdpError::invalid(format!(
            "curve was derived for {} hypotheses, resamples have {}",
            curve.num_hypotheses(),
            resamples.num_hypotheses()
        )));
    }
    let thresholds = curve.as_slice();
    let k = thresholds.len().min(resamples.num_hypotheses());
    if k == 0 {
        return Ok(0.0);
    }
    let errors = (0..resamples.num_resamples())
        .into_par_iter()
        .filter(|&b| {
            let mut row = resamples.row(b).to_vec();
            row.select_nth_unstable_by(k - 1, |a, c| a.total_cmp(c));
            row.truncate(k);
            sort_ascending(&mut row);
            row.iter().zip(thresholds).any(|(p, t)| p < t)
        })
        .count();
    Ok(errors as f64 / resamples.num_resamples() as f64)
}

/// Options for [`Calibrator`].
#[derive(Clone, Debug)]
pub struct CalibrationConfig {
    /// Template family `t_k(lambda)`.
    pub template: TemplateFamily,
    /// Restrict calibration and thresholds to ranks `1..=k_max` (all when `None`).
    pub k_max: Option<usize>,
    /// Emit progress events while computing pivotal statistics.
    pub display_progress: bool,
    /// Keep the pivotal statistics in the returned [`Calibration`].
    pub store_resamples: bool,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            template: TemplateFamily::Linear,
            k_max: None,
            display_progress: false,
            store_resamples: false,
        }
    }
}

impl CalibrationConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<()> {
        if self.k_max == Some(0) {
            return Err(TdpError::config("k_max must be at least 1"));
        }
        Ok(())
    }
}

/// Outcome of a calibration, reusable for any number of subset queries.
#[derive(Clone, Debug)]
pub struct Calibration {
    /// JER level.
    pub alpha: f64,
    /// Calibrated template parameter `lambda*_alpha`.
    pub lambda: f64,
    /// Thresholds `t_k(lambda)` for `k = 1..=k_max`.
    pub curve: ThresholdCurve,
    /// Number of resamples `B` used.
    pub num_resamples: usize,
    /// Number of ranks used.
    pub k_max: usize,
    /// Pivotal statistics, when requested.
    pub pivotal_statistics: Option<Vec<f64>>,
}

impl Calibration {
    /// Number of hypotheses the curve applies to.
    pub fn num_hypotheses(&self) -> usize {
        self.curve.num_hypotheses()
    }
}

const PROGRESS_STEPS: usize = 10;

/// Runs the pivotal statistic → quantile → curve pipeline.
#[derive(Clone, Debug, Default)]
pub struct Calibrator {
    config: CalibrationConfig,
}

impl Calibrator {
    /// Create a calibrator from a validated configuration.
    pub fn new(config: CalibrationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Active configuration.
    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Calibrate `lambda` on `resamples` at JER level `alpha`.
    pub fn calibrate(&self, resamples: &ResampleMatrix, alpha: f64) -> Result<Calibration> {
        validate_alpha(alpha)?;
        let template = &self.config.template;
        let m = resamples.num_hypotheses();
        if let TemplateFamily::Learned(learned) = template {
            if learned.num_hypotheses() != m {
                return Err(TdpError::invalid(format!(
                    "learned template was built on {} hypotheses, resamples have {m}",
                    learned.num_hypotheses()
                )));
            }
        }
        let k_max = resolve_k_max(resamples, template, self.config.k_max)?;
        let b = resamples.num_resamples();

        let stats = self.pivotal_statistics(resamples, k_max)?;
        let lambda = calibrate(&stats, alpha)?;
        if lambda == 0.0 {
            tracing::warn!(
                alpha,
                num_resamples = b,
                "calibrated lambda is zero; bounds will be trivial"
            );
        }
        let curve = ThresholdCurve::from_template(template, lambda, m, k_max)?;
        tracing::debug!(
            template = template.name(),
            num_resamples = b,
            num_hypotheses = m,
            k_max,
            alpha,
            lambda,
            "calibrated threshold family"
        );

        Ok(Calibration {
            alpha,
            lambda,
            curve,
            num_resamples: b,
            k_max,
            pivotal_statistics: self.config.store_resamples.then_some(stats),
        })
    }

    fn pivotal_statistics(&self, resamples: &ResampleMatrix, k_max: usize) -> Result<Vec<f64>> {
        let template = &self.config.template;
        let b = resamples.num_resamples();
        if !self.config.display_progress {
            let stats: Vec<f64> = (0..b)
                .into_par_iter()
                .map(|row| row_pivotal_statistic(resamples.row(row), template, k_max))
                .collect();
            check_finite(&stats, template)?;
            return Ok(stats);
        }

        let chunk = ((b + PROGRESS_STEPS - 1) / PROGRESS_STEPS).max(1);
        let mut stats = Vec::with_capacity(b);
        for start in (0..b).step_by(chunk) {
            let end = (start + chunk).min(b);
            let part: Vec<f64> = (start..end)
                .into_par_iter()
                .map(|row| row_pivotal_statistic(resamples.row(row), template, k_max))
                .collect();
            stats.extend(part);
            tracing::info!(done = end, total = b, "pivotal statistics");
        }
        check_finite(&stats, template)?;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pivotal::compute_pivotal_statistics;
    use ndarray::array;
    use rand::{Rng, SeedableRng};
    use std::sync::Arc;
    use tdp_core::{LearnedTemplate, RankTemplate};

    /// Caller-side copy of the linear template.
    #[derive(Debug)]
    struct SimesTemplate;

    impl RankTemplate for SimesTemplate {
        fn threshold(&self, k: usize, m: usize, lambda: f64) -> f64 {
            lambda * k as f64 / m as f64
        }

        fn inverse(&self, k: usize, m: usize, p: f64) -> f64 {
            p * m as f64 / k as f64
        }
    }
    use rand_chacha::ChaCha8Rng;

    fn uniform_resamples(b: usize, m: usize, seed: u64) -> ResampleMatrix {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let rows = (0..b)
            .map(|_| (0..m).map(|_| rng.gen::<f64>()).collect())
            .collect();
        ResampleMatrix::from_rows(rows).unwrap()
    }

    #[test]
    fn calibrate_rejects_bad_alpha() {
        let stats = [0.1, 0.2, 0.3];
        assert!(calibrate(&stats, 0.0).is_err());
        assert!(calibrate(&stats, 1.0).is_err());
        assert!(calibrate(&stats, f64::NAN).is_err());
        assert!(calibrate(&[], 0.1).is_err());
    }

    #[test]
    fn calibrate_interpolates() {
        let stats = [0.4, 0.1, 0.3, 0.2, 0.5];
        // h = 4 * 0.1 = 0.4 -> 0.1 + 0.4 * 0.1
        assert!((calibrate(&stats, 0.1).unwrap() - 0.14).abs() < 1e-12);
    }

    #[test]
    fn lambda_is_monotone_in_alpha() {
        let resamples = uniform_resamples(200, 50, 3);
        let stats = compute_pivotal_statistics(&resamples, &TemplateFamily::Linear).unwrap();
        let mut prev = 0.0;
        for &alpha in &[0.01, 0.05, 0.1, 0.2, 0.5] {
            let lambda = calibrate(&stats, alpha).unwrap();
            assert!(lambda >= prev);
            prev = lambda;
        }
    }

    #[test]
    fn m100_b500_linear_scenario() {
        let resamples = uniform_resamples(500, 100, 11);
        let calibration = Calibrator::default().calibrate(&resamples, 0.1).unwrap();
        assert!(calibration.lambda > 0.0 && calibration.lambda <= 1.0);
        let curve = threshold_curve(calibration.lambda, 100, &TemplateFamily::Linear).unwrap();
        for k in 1..=100 {
            assert_eq!(curve.as_slice()[k - 1], calibration.lambda * k as f64 / 100.0);
        }
        assert_eq!(curve, calibration.curve);
    }

    #[test]
    fn calibrated_curve_controls_jer_on_its_own_resamples() {
        let resamples = uniform_resamples(400, 60, 5);
        for template in [TemplateFamily::Linear, TemplateFamily::Beta] {
            let calibrator = Calibrator::new(CalibrationConfig {
                template,
                ..CalibrationConfig::default()
            })
            .unwrap();
            let calibration = calibrator.calibrate(&resamples, 0.1).unwrap();
            let jer = empirical_jer(&resamples, &calibration.curve).unwrap();
            assert!(jer <= 0.1 + 1e-12, "jer = {jer}");
        }
    }

    #[test]
    fn store_and_progress_options() {
        let resamples = uniform_resamples(37, 20, 9);
        let quiet = Calibrator::default().calibrate(&resamples, 0.2).unwrap();
        assert!(quiet.pivotal_statistics.is_none());

        let verbose = Calibrator::new(CalibrationConfig {
            display_progress: true,
            store_resamples: true,
            ..CalibrationConfig::default()
        })
        .unwrap()
        .calibrate(&resamples, 0.2)
        .unwrap();
        let stats = verbose.pivotal_statistics.as_ref().unwrap();
        assert_eq!(stats.len(), 37);
        assert_eq!(verbose.lambda, quiet.lambda);
    }

    #[test]
    fn k_max_shortens_the_curve() {
        let resamples = uniform_resamples(100, 40, 1);
        let calibration = Calibrator::new(CalibrationConfig {
            k_max: Some(10),
            ..CalibrationConfig::default()
        })
        .unwrap()
        .calibrate(&resamples, 0.1)
        .unwrap();
        assert_eq!(calibration.curve.len(), 10);
        assert_eq!(calibration.num_hypotheses(), 40);
        assert!(Calibrator::new(CalibrationConfig {
            k_max: Some(0),
            ..CalibrationConfig::default()
        })
        .is_err());
    }

    #[test]
    fn jer_requires_matching_dimensions() {
        let resamples = uniform_resamples(10, 5, 2);
        let curve = threshold_curve(0.1, 6, &TemplateFamily::Linear).unwrap();
        assert!(empirical_jer(&resamples, &curve).is_err());
    }

    #[test]
    fn custom_template_matches_builtin_linear() {
        let resamples = uniform_resamples(250, 30, 13);
        let custom = TemplateFamily::Custom(Arc::new(SimesTemplate));
        let builtin = Calibrator::default().calibrate(&resamples, 0.1).unwrap();
        let user = Calibrator::new(CalibrationConfig {
            template: custom.clone(),
            ..CalibrationConfig::default()
        })
        .unwrap()
        .calibrate(&resamples, 0.1)
        .unwrap();
        assert_eq!(user.lambda, builtin.lambda);
        assert_eq!(user.curve, builtin.curve);
        assert_eq!(
            threshold_curve(user.lambda, 30, &custom).unwrap(),
            threshold_curve(builtin.lambda, 30, &TemplateFamily::Linear).unwrap()
        );
    }

    #[test]
    fn tied_rows_never_count_as_errors() {
        let resamples =
            ResampleMatrix::new(array![[0.02, 0.5], [0.02, 0.5], [0.02, 0.5], [0.02, 0.5]])
                .unwrap();
        let calibration = Calibrator::default().calibrate(&resamples, 0.5).unwrap();
        assert_eq!(calibration.lambda, 0.04);
        assert_eq!(calibration.curve.as_slice(), &[0.02, 0.04]);
        assert_eq!(empirical_jer(&resamples, &calibration.curve).unwrap(), 0.0);
    }

    #[test]
    fn learned_template_must_match_the_resamples() {
        let resamples = uniform_resamples(50, 8, 6);
        let learned = |m: usize| {
            let columns = vec![vec![0.01, 0.05, 0.2], vec![0.1, 0.2, 0.6]];
            TemplateFamily::from(LearnedTemplate::from_sorted_columns(columns, m).unwrap())
        };
        let calibrator = |template: TemplateFamily, k_max: Option<usize>| {
            Calibrator::new(CalibrationConfig {
                template,
                k_max,
                ..CalibrationConfig::default()
            })
            .unwrap()
        };

        let ok = calibrator(learned(8), None).calibrate(&resamples, 0.1).unwrap();
        assert_eq!(ok.k_max, 2);
        let err = calibrator(learned(9), None)
            .calibrate(&resamples, 0.1)
            .unwrap_err();
        assert!(err.is_invalid_input());
        assert!(calibrator(learned(8), Some(3))
            .calibrate(&resamples, 0.1)
            .is_err());
    }
}
