//! Caller-owned memo of calibrations.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tdp_core::{ResampleMatrix, Result, TemplateFamily};

use crate::calibrate::{Calibration, Calibrator};

type CacheKey = (u64, u64, &'static str, Option<usize>);

#[derive(Debug)]
struct CacheEntry {
    // Holding the template keeps a learned or custom `Arc` alive, so its
    // address cannot be reused by another template while the entry exists.
    template: TemplateFamily,
    calibration: Arc<Calibration>,
}

fn same_template(a: &TemplateFamily, b: &TemplateFamily) -> bool {
    match (a, b) {
        (TemplateFamily::Linear, TemplateFamily::Linear) => true,
        (TemplateFamily::Beta, TemplateFamily::Beta) => true,
        (TemplateFamily::Learned(x), TemplateFamily::Learned(y)) => Arc::ptr_eq(x, y),
        (TemplateFamily::Custom(x), TemplateFamily::Custom(y)) => {
            std::ptr::eq(Arc::as_ptr(x) as *const (), Arc::as_ptr(y) as *const ())
        }
        _ => false,
    }
}

/// Memoizes calibrations per `(resample matrix, alpha)` pair.
///
/// The engines stay stateless; a cache is an explicit object the caller
/// owns and shares. Entries are keyed on the matrix fingerprint, `alpha`,
/// the template and `k_max`. Learned and custom templates match only when
/// they share the same `Arc`, which the entry keeps alive.
#[derive(Debug, Default)]
pub struct CalibrationCache {
    entries: RwLock<HashMap<CacheKey, Vec<CacheEntry>>>,
}

impl CalibrationCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached calibration or compute and store it.
    pub fn get_or_calibrate(
        &self,
        calibrator: &Calibrator,
        resamples: &ResampleMatrix,
        alpha: f64,
    ) -> Result<Arc<Calibration>> {
        let config = calibrator.config();
        let key = (
            resamples.fingerprint(),
            alpha.to_bits(),
            config.template.name(),
            config.k_max,
        );
        let lookup = |entries: &HashMap<CacheKey, Vec<CacheEntry>>| {
            entries.get(&key).and_then(|bucket| {
                bucket
                    .iter()
                    .find(|e| same_template(&e.template, &config.template))
                    .map(|e| Arc::clone(&e.calibration))
            })
        };
        let hit = lookup(&*self.entries.read().unwrap_or_else(PoisonError::into_inner));
        if let Some(hit) = hit {
            tracing::debug!(alpha, "calibration cache hit");
            return Ok(hit);
        }

        let calibration = Arc::new(calibrator.calibrate(resamples, alpha)?);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(hit) = lookup(&*entries) {
            return Ok(hit);
        }
        entries.entry(key).or_default().push(CacheEntry {
            template: config.template.clone(),
            calibration: Arc::clone(&calibration),
        });
        Ok(calibration)
    }

    /// Number of cached calibrations.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(Vec::len)
            .sum()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
