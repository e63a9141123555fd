//! Shared building blocks for post-hoc true discovery proportion inference.
//!
//! This crate holds the validated p-value containers, the rank templates
//! `t_k(lambda)`, threshold curves, and the quantile helpers used by the
//! calibration and bound engines.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod curve;
pub mod error;
pub mod hypotheses;
pub mod quantile;
pub mod template;

pub use curve::ThresholdCurve;
pub use error::{Result, TdpError};
pub use hypotheses::{validate_pvalues, HypothesisSet, ResampleMatrix};
pub use quantile::{
    count_above, count_at_most, interpolated_cdf, quantile, quantile_sorted, sort_ascending,
    sorted,
};
pub use template::{BetaTemplate, LearnedTemplate, LinearTemplate, RankTemplate, TemplateFamily};

/// Common imports for downstream users.
pub mod prelude {
    pub use crate::{
        HypothesisSet, LearnedTemplate, LinearTemplate, RankTemplate, ResampleMatrix, Result,
        TdpError, TemplateFamily, ThresholdCurve,
    };
}
