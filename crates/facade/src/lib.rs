//! Post-hoc true discovery proportion inference.
//!
//! Calibrate a threshold family controlling the joint error rate once, then
//! bound false positives in as many data-driven subsets as needed.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod analysis;

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use tdp_bounds as bounds;
pub use tdp_calibration as calibration;
pub use tdp_core as core;
pub use tdp_resampling as resampling;

pub use analysis::{AnalysisConfig, Method, TdpAnalysis};
pub use bounds::{
    bounds_with_curve, confidence_envelope, get_bounds, max_false_positives, subset_bounds,
    tdp_envelope, Bound,
};
pub use calibration::{
    calibrate, calibrate_notip, compute_pivotal_statistics, empirical_jer, learned_template,
    threshold_curve, Calibration, CalibrationCache, CalibrationConfig, Calibrator,
};
pub use core::{
    BetaTemplate, HypothesisSet, LearnedTemplate, LinearTemplate, RankTemplate, ResampleMatrix,
    Result, TdpError, TemplateFamily, ThresholdCurve,
};
pub use resampling::{
    bootstrap_resamples, null_pvalues, null_resamples, one_sample_t, sign_flip_resamples,
    Alternative, FieldConfig, ResamplingConfig, SyntheticField,
};

/// Convenience prelude covering the calibrate-then-bound workflow.
pub mod prelude {
    pub use crate::analysis::{AnalysisConfig, Method, TdpAnalysis};
    pub use tdp_bounds::prelude::*;
    pub use tdp_calibration::prelude::*;
    pub use tdp_core::prelude::*;
    pub use tdp_resampling::prelude::*;
}
