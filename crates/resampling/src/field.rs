//! Synthetic smoothed noise fields with injected signal.

use std::sync::Arc;

use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};
use rayon::prelude::*;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use tdp_core::{HypothesisSet, ResampleMatrix, Result, TdpError};

/// Full width at half maximum to Gaussian standard deviation.
const FWHM_TO_SIGMA: f64 = 0.424_660_900_144_009_5;

/// Parameters of a synthetic one-sample study.
#[derive(Clone, Debug)]
pub struct FieldConfig {
    /// Number of subjects (rows).
    pub num_subjects: usize,
    /// Number of voxels (hypotheses).
    pub num_voxels: usize,
    /// Smoothing kernel FWHM in voxels; 0 disables smoothing.
    pub fwhm: f64,
    /// Fraction of voxels carrying signal, taken from the start of the field.
    pub signal_fraction: f64,
    /// Mean shift added to active voxels.
    pub effect_size: f64,
    /// RNG seed.
    pub seed: u64,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            num_subjects: 30,
            num_voxels: 100,
            fwhm: 0.0,
            signal_fraction: 0.1,
            effect_size: 1.0,
            seed: 0,
        }
    }
}

impl FieldConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<()> {
        if self.num_subjects < 2 {
            return Err(TdpError::config("num_subjects must be at least 2"));
        }
        if self.num_voxels == 0 {
            return Err(TdpError::config("num_voxels must be positive"));
        }
        if !self.fwhm.is_finite() || self.fwhm < 0.0 {
            return Err(TdpError::config("fwhm must be a non-negative number"));
        }
        if !(0.0..=1.0).contains(&self.signal_fraction) {
            return Err(TdpError::config("signal_fraction must be in [0, 1]"));
        }
        if !self.effect_size.is_finite() {
            return Err(TdpError::config("effect_size must be finite"));
        }
        Ok(())
    }

    /// Number of voxels that carry signal.
    pub fn num_active(&self) -> usize {
        (self.signal_fraction * self.num_voxels as f64).round() as usize
    }

    /// Draw a field.
    pub fn generate(&self) -> Result<SyntheticField> {
        self.validate()?;
        let m = self.num_voxels;
        let smoother = GaussianSmoother::new(self.fwhm, m);
        let num_active = self.num_active();

        let rows: Vec<Vec<f64>> = (0..self.num_subjects)
            .into_par_iter()
            .map(|subject| {
                let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
                rng.set_stream(subject as u64);
                let noise: Vec<f64> = (0..smoother.input_len())
                    .map(|_| StandardNormal.sample(&mut rng))
                    .collect();
                let mut row = smoother.smooth(&noise);
                for v in row.iter_mut().take(num_active) {
                    *v += self.effect_size;
                }
                row
            })
            .collect();

        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        let data = Array2::from_shape_vec((self.num_subjects, m), flat)
            .map_err(|e| TdpError::numerical(format!("field shape: {e}")))?;
        let active = (0..m).map(|v| v < num_active).collect();
        Ok(SyntheticField { data, active })
    }
}

/// Subjects x voxels data with the ground-truth signal mask.
#[derive(Clone, Debug)]
pub struct SyntheticField {
    /// Data, one row per subject.
    pub data: Array2<f64>,
    /// Whether each voxel carries signal.
    pub active: Vec<bool>,
}

impl SyntheticField {
    /// Number of voxels with signal.
    pub fn num_active(&self) -> usize {
        self.active.iter().filter(|&&a| a).count()
    }

    /// Number of voxels with signal among `indices`.
    pub fn count_active(&self, indices: &[usize]) -> usize {
        indices
            .iter()
            .filter(|&&i| self.active.get(i).copied().unwrap_or(false))
            .count()
    }
}

/// Unit-variance Gaussian smoothing along a line, by FFT convolution.
///
/// Input noise is padded by the kernel radius on both sides and only the
/// fully overlapped window is kept, so every output voxel has variance 1
/// for i.i.d. standard normal input.
struct GaussianSmoother {
    kernel_spectrum: Vec<Complex<f64>>,
    forward: Option<Arc<dyn Fft<f64>>>,
    inverse: Option<Arc<dyn Fft<f64>>>,
    radius: usize,
    len: usize,
}

impl GaussianSmoother {
    fn new(fwhm: f64, len: usize) -> Self {
        if fwhm <= 0.0 {
            return Self {
                kernel_spectrum: Vec::new(),
                forward: None,
                inverse: None,
                radius: 0,
                len,
            };
        }
        let sigma = fwhm * FWHM_TO_SIGMA;
        let radius = (4.0 * sigma).ceil() as usize;
        let mut kernel: Vec<f64> = (0..=2 * radius)
            .map(|i| {
                let x = i as f64 - radius as f64;
                (-0.5 * (x / sigma).powi(2)).exp()
            })
            .collect();
        let norm = kernel.iter().map(|w| w * w).sum::<f64>().sqrt();
        for w in &mut kernel {
            *w /= norm;
        }

        let full = len + 4 * radius;
        let mut size = 1usize;
        while size < full {
            size <<= 1;
        }
        let mut planner = FftPlanner::<f64>::new();
        let forward = planner.plan_fft_forward(size);
        let inverse = planner.plan_fft_inverse(size);

        let mut kernel_spectrum = vec![Complex::new(0.0, 0.0); size];
        for (slot, &w) in kernel_spectrum.iter_mut().zip(&kernel) {
            slot.re = w;
        }
        forward.process(&mut kernel_spectrum);

        Self {
            kernel_spectrum,
            forward: Some(forward),
            inverse: Some(inverse),
            radius,
            len,
        }
    }

    fn input_len(&self) -> usize {
        self.len + 2 * self.radius
    }

    fn smooth(&self, noise: &[f64]) -> Vec<f64> {
        let (Some(forward), Some(inverse)) = (&self.forward, &self.inverse) else {
            return noise.to_vec();
        };
        let size = self.kernel_spectrum.len();
        let mut buf = vec![Complex::new(0.0, 0.0); size];
        for (slot, &v) in buf.iter_mut().zip(noise) {
            slot.re = v;
        }
        forward.process(&mut buf);
        for (b, k) in buf.iter_mut().zip(&self.kernel_spectrum) {
            *b *= *k;
        }
        inverse.process(&mut buf);

        let scale = 1.0 / size as f64;
        let start = 2 * self.radius;
        buf[start..start + self.len]
            .iter()
            .map(|c| c.re * scale)
            .collect()
    }
}

/// `m` i.i.d. uniform null p-values.
pub fn null_pvalues<R: Rng>(m: usize, rng: &mut R) -> Vec<f64> {
    (0..m).map(|_| rng.gen::<f64>()).collect()
}

/// Oracle resampler for simulations: row 0 is `observed`, the other rows are
/// exact draws from the global null (i.i.d. uniform p-values).
pub fn null_resamples<R: Rng>(
    observed: &HypothesisSet,
    num_resamples: usize,
    rng: &mut R,
) -> Result<ResampleMatrix> {
    if num_resamples == 0 {
        return Err(TdpError::config("num_resamples must be positive"));
    }
    let m = observed.len();
    let mut flat = Vec::with_capacity(num_resamples * m);
    flat.extend_from_slice(observed.as_slice());
    for _ in 1..num_resamples {
        flat.extend(null_pvalues(m, rng));
    }
    let matrix = Array2::from_shape_vec((num_resamples, m), flat)
        .map_err(|e| TdpError::numerical(format!("resample shape: {e}")))?;
    ResampleMatrix::with_observed(observed, matrix)
}
