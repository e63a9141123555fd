//! Resampling and simulation collaborators for TDP inference.
//!
//! Provides per-hypothesis one-sample t-tests, sign-flip and residual
//! bootstrap generation of resampled p-values (row 0 observed), and
//! synthetic smoothed Gaussian fields with a known signal mask.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod field;
pub mod resample;
pub mod ttest;

pub use field::{null_pvalues, null_resamples, FieldConfig, SyntheticField};
pub use resample::{bootstrap_resamples, sign_flip_resamples, Resampled, ResamplingConfig};
pub use ttest::{one_sample_t, Alternative, TTest};

/// Common imports for resampling.
pub mod prelude {
    pub use crate::{
        bootstrap_resamples, null_pvalues, null_resamples, one_sample_t, sign_flip_resamples,
        Alternative, FieldConfig, Resampled, ResamplingConfig, SyntheticField, TTest,
    };
}
