//! Normalized cross-correlation and the shape-based distance (SBD).
//!
//! For two series `a` and `b` of length `L`, the cross-correlation at shift
//! `s` in `[-(L-1), L-1]` is
//!
//! ```text
//! cc[s] = sum_i a[i] * b[i + s] / (||a|| * ||b||)
//! ```
//!
//! summed over overlapping indices (and over features for multivariate
//! series). Results are laid out so that index `0` holds shift `-(L-1)` and
//! index `2L - 2` holds shift `L - 1`. The shape-based distance is
//! `1 - max_s cc[s]`, which lies in `[0, 2]`.
//!
//! Short series are correlated directly in O(L²); above [`FFT_CROSSOVER`]
//! the correlation is computed in the frequency domain.

use std::fmt;
use std::sync::Arc;

use rustfft::{num_complex::Complex64, Fft, FftPlanner};

use crate::core::Series;
use crate::error::{ClusterError, Result};

/// Series length above which the FFT path is used.
pub const FFT_CROSSOVER: usize = 64;

/// Norms below this are treated as flat series with zero correlation.
pub const NORM_EPSILON: f64 = 1e-9;

/// Planned forward/inverse transforms for one padded size.
#[derive(Clone)]
struct FftPlan {
    size: usize,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}

/// Cross-correlation engine for series of one fixed length.
///
/// Holds the FFT plans so repeated correlations (one per series/centroid
/// pair per iteration) do not pay the planning cost again.
#[derive(Clone)]
pub struct CrossCorrelator {
    len: usize,
    plan: Option<FftPlan>,
}

impl fmt::Debug for CrossCorrelator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrossCorrelator")
            .field("len", &self.len)
            .field("fft_size", &self.plan.as_ref().map(|p| p.size))
            .finish()
    }
}

impl CrossCorrelator {
    /// Choose the naive or FFT path from the series length.
    pub fn new(len: usize) -> Self {
        if len > FFT_CROSSOVER {
            Self::fft(len)
        } else {
            Self::naive(len)
        }
    }

    /// Always correlate directly.
    pub fn naive(len: usize) -> Self {
        Self { len, plan: None }
    }

    /// Always correlate through the FFT.
    pub fn fft(len: usize) -> Self {
        let size = (2 * len.max(1) - 1).next_power_of_two();
        let mut planner = FftPlanner::new();
        let plan = FftPlan {
            size,
            forward: planner.plan_fft_forward(size),
            inverse: planner.plan_fft_inverse(size),
        };
        Self {
            len,
            plan: Some(plan),
        }
    }

    /// Series length this correlator was built for.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if built for zero-length series.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the FFT path is used.
    pub fn uses_fft(&self) -> bool {
        self.plan.is_some()
    }

    /// Normalized cross-correlation, validating shapes and computing norms.
    pub fn correlate(&self, a: &Series, b: &Series) -> Result<Vec<f64>> {
        check_pair(a, b)?;
        if a.len() != self.len {
            return Err(ClusterError::DimensionMismatch {
                expected: self.len,
                got: a.len(),
            });
        }
        Ok(self.correlate_with_norms(a, a.norm(), b, b.norm()))
    }

    /// Normalized cross-correlation with precomputed norms.
    ///
    /// Shapes must already be validated. Returns all zeros when either norm
    /// is below [`NORM_EPSILON`].
    pub fn correlate_with_norms(&self, a: &Series, norm_a: f64, b: &Series, norm_b: f64) -> Vec<f64> {
        let n_shifts = (2 * self.len).saturating_sub(1);
        if norm_a < NORM_EPSILON || norm_b < NORM_EPSILON {
            return vec![0.0; n_shifts];
        }

        let mut cc = match &self.plan {
            Some(plan) => raw_fft(plan, self.len, a, b),
            None => raw_naive(self.len, a, b),
        };
        let denom = norm_a * norm_b;
        for v in &mut cc {
            *v /= denom;
        }
        cc
    }

    /// Best shift of `b` against `a` and the correlation reached there.
    ///
    /// Ties resolve to the smallest shift. Flat inputs give `(0, 0.0)`.
    pub fn best_alignment(&self, a: &Series, norm_a: f64, b: &Series, norm_b: f64) -> (isize, f64) {
        if norm_a < NORM_EPSILON || norm_b < NORM_EPSILON {
            return (0, 0.0);
        }
        let cc = self.correlate_with_norms(a, norm_a, b, norm_b);
        let (idx, value) = argmax(&cc);
        (idx as isize - (self.len as isize - 1), value)
    }

    /// Shape-based distance with precomputed norms, in `[0, 2]`.
    pub fn distance_with_norms(&self, a: &Series, norm_a: f64, b: &Series, norm_b: f64) -> f64 {
        let (_, corr) = self.best_alignment(a, norm_a, b, norm_b);
        1.0 - corr.clamp(-1.0, 1.0)
    }
}

/// First index of the maximum value.
fn argmax(values: &[f64]) -> (usize, f64) {
    let mut best = (0, f64::NEG_INFINITY);
    for (i, &v) in values.iter().enumerate() {
        if v > best.1 {
            best = (i, v);
        }
    }
    best
}

/// Unnormalized correlation summed over features, O(L²).
fn raw_naive(len: usize, a: &Series, b: &Series) -> Vec<f64> {
    let mut out = vec![0.0; 2 * len - 1];
    for (col_a, col_b) in a.columns().iter().zip(b.columns().iter()) {
        for (idx, o) in out.iter_mut().enumerate() {
            let shift = idx as isize - (len as isize - 1);
            let (start, end) = if shift >= 0 {
                (0, len - shift as usize)
            } else {
                ((-shift) as usize, len)
            };
            *o += (start..end)
                .map(|i| col_a[i] * col_b[(i as isize + shift) as usize])
                .sum::<f64>();
        }
    }
    out
}

/// Unnormalized correlation summed over features via the FFT.
///
/// `IFFT(A * conj(B))[k] = sum_m a[m + k] * b[m]`, so shift `s` is read
/// from circular index `-s`.
fn raw_fft(plan: &FftPlan, len: usize, a: &Series, b: &Series) -> Vec<f64> {
    let size = plan.size;
    let mut spectrum = vec![Complex64::new(0.0, 0.0); size];

    for (col_a, col_b) in a.columns().iter().zip(b.columns().iter()) {
        let mut fa = padded(col_a, size);
        let mut fb = padded(col_b, size);
        plan.forward.process(&mut fa);
        plan.forward.process(&mut fb);
        for ((acc, x), y) in spectrum.iter_mut().zip(fa.iter()).zip(fb.iter()) {
            *acc += x * y.conj();
        }
    }

    // Linearity lets the per-feature spectra share one inverse transform.
    plan.inverse.process(&mut spectrum);

    // rustfft does not normalize the inverse
    let scale = 1.0 / size as f64;
    (0..2 * len - 1)
        .map(|idx| {
            let shift = idx as isize - (len as isize - 1);
            let k = (size as isize - shift).rem_euclid(size as isize) as usize;
            spectrum[k].re * scale
        })
        .collect()
}

fn padded(values: &[f64], size: usize) -> Vec<Complex64> {
    let mut buffer = vec![Complex64::new(0.0, 0.0); size];
    for (dst, &x) in buffer.iter_mut().zip(values.iter()) {
        dst.re = x;
    }
    buffer
}

fn check_pair(a: &Series, b: &Series) -> Result<()> {
    if a.is_empty() || b.is_empty() {
        return Err(ClusterError::EmptyData);
    }
    if a.len() != b.len() {
        return Err(ClusterError::DimensionMismatch {
            expected: a.len(),
            got: b.len(),
        });
    }
    if a.dimensions() != b.dimensions() {
        return Err(ClusterError::DimensionMismatch {
            expected: a.dimensions(),
            got: b.dimensions(),
        });
    }
    Ok(())
}

/// Normalized cross-correlation of `b` against `a` at every shift.
///
/// Uses the FFT above [`FFT_CROSSOVER`].
///
/// # Errors
/// [`ClusterError::DimensionMismatch`] if the series differ in shape.
pub fn cross_correlation(a: &Series, b: &Series) -> Result<Vec<f64>> {
    CrossCorrelator::new(a.len()).correlate(a, b)
}

/// Direct O(L²) normalized cross-correlation.
pub fn cross_correlation_naive(a: &Series, b: &Series) -> Result<Vec<f64>> {
    CrossCorrelator::naive(a.len()).correlate(a, b)
}

/// FFT-based normalized cross-correlation.
pub fn cross_correlation_fft(a: &Series, b: &Series) -> Result<Vec<f64>> {
    CrossCorrelator::fft(a.len()).correlate(a, b)
}

/// Shift of `b` that best matches `a`.
///
/// `b.shifted(best_shift(a, b)?)` is `b` aligned on `a`'s time axis.
pub fn best_shift(a: &Series, b: &Series) -> Result<isize> {
    check_pair(a, b)?;
    Ok(CrossCorrelator::new(a.len())
        .best_alignment(a, a.norm(), b, b.norm())
        .0)
}

/// Maximum normalized cross-correlation, clamped to `[-1, 1]`.
pub fn max_correlation(a: &Series, b: &Series) -> Result<f64> {
    check_pair(a, b)?;
    let (_, corr) = CrossCorrelator::new(a.len()).best_alignment(a, a.norm(), b, b.norm());
    Ok(corr.clamp(-1.0, 1.0))
}

/// Shape-based distance `1 - max_correlation(a, b)`, in `[0, 2]`.
pub fn sbd_distance(a: &Series, b: &Series) -> Result<f64> {
    Ok(1.0 - max_correlation(a, b)?)
}

/// One cached L2 norm per series.
///
/// Rebuilt whenever the underlying series change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormCache {
    norms: Vec<f64>,
}

impl NormCache {
    /// Compute norms for every series.
    pub fn compute(series: &[Series]) -> Self {
        Self {
            norms: series.iter().map(Series::norm).collect(),
        }
    }

    /// Norm of series `i`.
    pub fn get(&self, i: usize) -> f64 {
        self.norms[i]
    }

    /// Number of cached norms.
    pub fn len(&self) -> usize {
        self.norms.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.norms.is_empty()
    }

    /// All cached norms.
    pub fn as_slice(&self) -> &[f64] {
        &self.norms
    }
}
