//! End-to-end post-hoc analysis of a one-sample design.
//!
//! Tests every hypothesis, resamples, calibrates once, then answers any
//! number of subset queries against the same calibration.

use ndarray::{s, ArrayView2};
use tdp_bounds::{bounds_with_curve, confidence_envelope, subset_bounds, Bound};
use tdp_calibration::{calibrate_notip, Calibration, CalibrationConfig, Calibrator};
use tdp_core::{HypothesisSet, ResampleMatrix, Result, TdpError};
use tdp_resampling::{bootstrap_resamples, sign_flip_resamples, Resampled, ResamplingConfig};

/// How resamples are generated and which template is calibrated.
#[derive(Clone, Debug)]
pub enum Method {
    /// Sign-flip permutations, template from the calibration config.
    SignFlip,
    /// Residual bootstrap, template from the calibration config.
    Bootstrap,
    /// Notip: a learned template from an independent sign-flip set,
    /// calibrated on the main sign-flip set over ranks `1..=k_max`.
    Notip {
        /// Number of ranks the template covers.
        k_max: usize,
    },
}

impl Default for Method {
    fn default() -> Self {
        Self::SignFlip
    }
}

/// Options for [`TdpAnalysis::run`].
#[derive(Clone, Debug)]
pub struct AnalysisConfig {
    /// JER level.
    pub alpha: f64,
    /// Resampling scheme.
    pub method: Method,
    /// Resampling parameters.
    pub resampling: ResamplingConfig,
    /// Calibration parameters (ignored by [`Method::Notip`] except for logging).
    pub calibration: CalibrationConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            method: Method::default(),
            resampling: ResamplingConfig::default(),
            calibration: CalibrationConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<()> {
        if !self.alpha.is_finite() || self.alpha <= 0.0 || self.alpha >= 1.0 {
            return Err(TdpError::config("alpha must be in (0, 1)"));
        }
        if let Method::Notip { k_max } = self.method {
            if k_max == 0 {
                return Err(TdpError::config("Notip k_max must be at least 1"));
            }
            if self.resampling.num_resamples < 2 {
                return Err(TdpError::config(
                    "Notip needs at least one null resample to learn from",
                ));
            }
        }
        self.resampling.validate()?;
        self.calibration.validate()
    }
}

/// Observed p-values and their calibration, ready for subset queries.
#[derive(Clone, Debug)]
pub struct TdpAnalysis {
    /// Observed p-values.
    pub observed: HypothesisSet,
    /// Observed t statistics.
    pub t_stats: Vec<f64>,
    /// Calibrated threshold family.
    pub calibration: Calibration,
}

impl TdpAnalysis {
    /// Run the test → resample → calibrate pipeline on subjects x voxels data.
    pub fn run(data: ArrayView2<'_, f64>, config: &AnalysisConfig) -> Result<Self> {
        config.validate()?;
        let (resampled, calibration) = match &config.method {
            Method::SignFlip => {
                let resampled = sign_flip_resamples(data, &config.resampling)?;
                let calibration = Calibrator::new(config.calibration.clone())?
                    .calibrate(&resampled.resamples, config.alpha)?;
                (resampled, calibration)
            }
            Method::Bootstrap => {
                let resampled = bootstrap_resamples(data, &config.resampling)?;
                let calibration = Calibrator::new(config.calibration.clone())?
                    .calibrate(&resampled.resamples, config.alpha)?;
                (resampled, calibration)
            }
            Method::Notip { k_max } => {
                let resampled = sign_flip_resamples(data, &config.resampling)?;
                let training_config = ResamplingConfig {
                    seed: config.resampling.seed.wrapping_add(1),
                    ..config.resampling.clone()
                };
                let training = sign_flip_resamples(data, &training_config)?;
                let training = without_observed_row(&training)?;
                let calibration =
                    calibrate_notip(&training, &resampled.resamples, config.alpha, *k_max)?;
                (resampled, calibration)
            }
        };
        tracing::info!(
            alpha = config.alpha,
            lambda = calibration.lambda,
            num_hypotheses = resampled.observed.len(),
            "post-hoc analysis calibrated"
        );

        Ok(Self {
            observed: resampled.observed,
            t_stats: resampled.t_stats,
            calibration,
        })
    }

    /// Bounds for the hypotheses at `indices`.
    pub fn bounds(&self, indices: &[usize]) -> Result<Bound> {
        subset_bounds(&self.observed, indices, &self.calibration.curve)
    }

    /// Bounds for every hypothesis with p-value at or below `threshold`.
    pub fn bounds_below(&self, threshold: f64) -> Result<Bound> {
        let selected: Vec<f64> = self
            .observed
            .as_slice()
            .iter()
            .copied()
            .filter(|&p| p <= threshold)
            .collect();
        bounds_with_curve(&selected, &self.calibration.curve)
    }

    /// False-positive envelope over all hypotheses ranked by p-value.
    pub fn envelope(&self) -> Result<Vec<usize>> {
        confidence_envelope(self.observed.as_slice(), &self.calibration.curve)
    }
}

fn without_observed_row(resampled: &Resampled) -> Result<ResampleMatrix> {
    let view = resampled.resamples.view();
    ResampleMatrix::new(view.slice(s![1.., ..]).to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tdp_resampling::FieldConfig;

    fn field(seed: u64) -> tdp_resampling::SyntheticField {
        FieldConfig {
            num_subjects: 25,
            num_voxels: 60,
            fwhm: 2.0,
            signal_fraction: 0.25,
            effect_size: 2.0,
            seed,
        }
        .generate()
        .unwrap()
    }

    fn config(method: Method) -> AnalysisConfig {
        AnalysisConfig {
            method,
            resampling: ResamplingConfig {
                num_resamples: 200,
                seed: 7,
                ..ResamplingConfig::default()
            },
            ..AnalysisConfig::default()
        }
    }

    #[test]
    fn every_method_produces_consistent_bounds() {
        let field = field(3);
        for method in [
            Method::SignFlip,
            Method::Bootstrap,
            Method::Notip { k_max: 10 },
        ] {
            let analysis = TdpAnalysis::run(field.data.view(), &config(method)).unwrap();
            assert_eq!(analysis.observed.len(), 60);
            assert_eq!(analysis.t_stats.len(), 60);

            let all: Vec<usize> = (0..60).collect();
            let bound = analysis.bounds(&all).unwrap();
            assert_eq!(bound.size, 60);
            assert_eq!(bound.false_positives + bound.true_positives, 60);

            let envelope = analysis.envelope().unwrap();
            assert_eq!(envelope.len(), 60);
            assert!(envelope.windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn strong_signal_is_detected() {
        let field = field(5);
        let analysis = TdpAnalysis::run(field.data.view(), &config(Method::SignFlip)).unwrap();
        let active: Vec<usize> = (0..15).collect();
        let bound = analysis.bounds(&active).unwrap();
        assert!(bound.true_positives > 0);
        assert!(bound.true_positives <= 15);
    }

    #[test]
    fn bounds_below_matches_explicit_selection() {
        let field = field(9);
        let analysis = TdpAnalysis::run(field.data.view(), &config(Method::SignFlip)).unwrap();
        let indices: Vec<usize> = analysis
            .observed
            .as_slice()
            .iter()
            .enumerate()
            .filter(|(_, &p)| p <= 0.01)
            .map(|(i, _)| i)
            .collect();
        if indices.is_empty() {
            assert!(analysis.bounds_below(0.01).is_err());
        } else {
            assert_eq!(
                analysis.bounds_below(0.01).unwrap(),
                analysis.bounds(&indices).unwrap()
            );
        }
    }

    #[test]
    fn rejects_bad_config() {
        let field = field(1);
        let bad_alpha = AnalysisConfig {
            alpha: 1.0,
            ..AnalysisConfig::default()
        };
        assert!(TdpAnalysis::run(field.data.view(), &bad_alpha).is_err());
        let bad_notip = config(Method::Notip { k_max: 0 });
        assert!(TdpAnalysis::run(field.data.view(), &bad_notip).is_err());
    }
}
