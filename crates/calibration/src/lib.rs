//! Joint-error-rate calibration of threshold templates.
//!
//! Given a `B x m` matrix of resampled p-values, the pivotal statistic of a
//! row is `min_k t_k^{-1}(p_(k:m))`. Its `alpha`-quantile `lambda*` yields a
//! threshold curve `t_k(lambda*)` whose joint error rate is at most `alpha`,
//! which in turn licenses false-positive bounds on any subset.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod calibrate;
pub mod learned;
pub mod pivotal;

pub use cache::CalibrationCache;
pub use calibrate::{
    calibrate, empirical_jer, threshold_curve, Calibration, CalibrationConfig, Calibrator,
};
pub use learned::{calibrate_notip, learned_template};
pub use pivotal::{
    compute_pivotal_statistics, compute_pivotal_statistics_up_to, row_pivotal_statistic,
};

/// Common imports for calibration.
pub mod prelude {
    pub use crate::{
        calibrate, calibrate_notip, compute_pivotal_statistics, empirical_jer, learned_template,
        threshold_curve, Calibration, CalibrationCache, CalibrationConfig, Calibrator,
    };
}
