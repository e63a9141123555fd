//! Post-hoc bounds on false positives and true discovery proportion.
//!
//! A threshold curve calibrated once at level `alpha` supports unlimited
//! subset queries, including subsets chosen after seeing the data, with the
//! bounds holding jointly with probability at least `1 - alpha`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod fp;
mod report;

pub use fp::{confidence_envelope, max_false_positives};
pub use report::{bounds_with_curve, get_bounds, subset_bounds, tdp_envelope, Bound};

/// Common imports for bound queries.
pub mod prelude {
    pub use crate::{
        bounds_with_curve, confidence_envelope, get_bounds, max_false_positives, subset_bounds,
        tdp_envelope, Bound,
    };
}
