//! Validated containers for observed and resampled p-values.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use ndarray::{Array2, ArrayView1, Axis};

use crate::error::{Result, TdpError};

/// Check that every value is a finite probability in `[0, 1]`.
pub fn validate_pvalues(values: &[f64], what: &str) -> Result<()> {
    for (i, &p) in values.iter().enumerate() {
        if !p.is_finite() || !(0.0..=1.0).contains(&p) {
            return Err(TdpError::invalid(format!(
                "{what}[{i}] = {p} is not a probability in [0, 1]"
            )));
        }
    }
    Ok(())
}

/// Observed p-values, one per tested hypothesis.
#[derive(Clone, Debug, PartialEq)]
pub struct HypothesisSet {
    pvalues: Vec<f64>,
}

impl HypothesisSet {
    /// Wrap a non-empty vector of p-values.
    pub fn new(pvalues: Vec<f64>) -> Result<Self> {
        if pvalues.is_empty() {
            return Err(TdpError::invalid("hypothesis set must be non-empty"));
        }
        validate_pvalues(&pvalues, "pvalues")?;
        Ok(Self { pvalues })
    }

    /// Number of hypotheses `m`.
    pub fn len(&self) -> usize {
        self.pvalues.len()
    }

    /// Always false for a constructed set.
    pub fn is_empty(&self) -> bool {
        self.pvalues.is_empty()
    }

    /// Borrow the p-values.
    pub fn as_slice(&self) -> &[f64] {
        &self.pvalues
    }

    /// P-value of hypothesis `i`.
    pub fn get(&self, i: usize) -> Option<f64> {
        self.pvalues.get(i).copied()
    }

    /// Gather the p-values of an index subset.
    ///
    /// Indices may repeat or arrive in any order; the subset is whatever the
    /// caller selected, possibly after looking at the data.
    pub fn select(&self, indices: &[usize]) -> Result<Vec<f64>> {
        indices
            .iter()
            .map(|&i| {
                self.get(i).ok_or_else(|| {
                    TdpError::invalid(format!(
                        "index {i} out of range for {} hypotheses",
                        self.len()
                    ))
                })
            })
            .collect()
    }
}

/// `B x m` matrix of resampled p-values, one row per resample.
#[derive(Clone, Debug, PartialEq)]
pub struct ResampleMatrix {
    values: Array2<f64>,
}

impl ResampleMatrix {
    /// Validate and wrap a dense matrix.
    pub fn new(values: Array2<f64>) -> Result<Self> {
        let (b, m) = values.dim();
        if b == 0 {
            return Err(TdpError::invalid("resample matrix has no rows"));
        }
        if m == 0 {
            return Err(TdpError::invalid("resample matrix has no columns"));
        }
        for (row_idx, row) in values.axis_iter(Axis(0)).enumerate() {
            if let Some(p) = row
                .iter()
                .find(|p| !p.is_finite() || !(0.0..=1.0).contains(*p))
            {
                return Err(TdpError::invalid(format!(
                    "resample row {row_idx} contains {p}, outside [0, 1]"
                )));
            }
        }
        Ok(Self { values })
    }

    /// Build from per-resample rows, which must all have the same length.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let b = rows.len();
        let m = rows.first().map(Vec::len).unwrap_or(0);
        if let Some((idx, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != m) {
            return Err(TdpError::invalid(format!(
                "resample row {idx} has {} entries, expected {m}",
                row.len()
            )));
        }
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        let values = Array2::from_shape_vec((b, m), flat)
            .map_err(|e| TdpError::invalid(format!("resample shape: {e}")))?;
        Self::new(values)
    }

    /// Validate a matrix whose row 0 must reproduce the observed p-values.
    pub fn with_observed(observed: &HypothesisSet, values: Array2<f64>) -> Result<Self> {
        let matrix = Self::new(values)?;
        if matrix.num_hypotheses() != observed.len() {
            return Err(TdpError::invalid(format!(
                "resample matrix has {} columns but {} hypotheses were observed",
                matrix.num_hypotheses(),
                observed.len()
            )));
        }
        let row0 = matrix.observed_row();
        if row0.iter().zip(observed.as_slice()).any(|(a, b)| a != b) {
            return Err(TdpError::invalid(
                "row 0 of the resample matrix must equal the observed p-values",
            ));
        }
        Ok(matrix)
    }

    /// Number of resamples `B`.
    pub fn num_resamples(&self) -> usize {
        self.values.nrows()
    }

    /// Number of hypotheses `m`.
    pub fn num_hypotheses(&self) -> usize {
        self.values.ncols()
    }

    /// Row `b`.
    pub fn row(&self, b: usize) -> ArrayView1<'_, f64> {
        self.values.row(b)
    }

    /// Row 0, which carries the observed p-values when built by a resampler.
    pub fn observed_row(&self) -> ArrayView1<'_, f64> {
        self.values.row(0)
    }

    /// Borrow the underlying matrix.
    pub fn view(&self) -> &Array2<f64> {
        &self.values
    }

    /// Stable content hash used to key calibration caches.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.values.dim().hash(&mut hasher);
        for v in self.values.iter() {
            v.to_bits().hash(&mut hasher);
        }
        hasher.finish()
    }
}
