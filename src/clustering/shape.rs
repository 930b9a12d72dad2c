//! Shape extraction: the k-Shape centroid update.
//!
//! Members of a cluster are first aligned on the current centroid with the
//! cross-correlation shift that best matches it. For every feature, the
//! aligned members are stacked as rows of `X` and the new shape is the
//! dominant eigenvector of
//!
//! ```text
//! M = Q^T (X^T X) Q,    Q = I - J / L
//! ```
//!
//! i.e. the centered direction that maximizes the summed squared
//! correlation with the members. The eigenvector sign is then chosen by
//! [`orient_eigenvector`]. When the eigensolver does not converge or `M` is
//! numerically zero, the coordinate-wise mean of the aligned members is used
//! instead.

use nalgebra::{DMatrix, SymmetricEigen};
use tracing::warn;

use super::sbd::{CrossCorrelator, NormCache};
use crate::core::Series;
use crate::error::{ClusterError, Result};
use crate::parallel::iter_maybe_parallel;
use crate::transform::global_normalize;
#[cfg(feature = "parallel")]
use rayon::iter::ParallelIterator;

/// Largest eigenvalues at or below this mark `M` as singular.
const EIGEN_EPSILON: f64 = 1e-10;

/// QR iteration budget per row of `M`.
const EIGEN_ITER_PER_ROW: usize = 100;

/// Outcome of extracting one cluster's shape.
#[derive(Debug, Clone)]
pub struct ShapeExtraction {
    /// New, not yet globally normalized, centroid
    pub centroid: Series,
    /// Number of features that used the mean fallback
    pub fallback_features: usize,
}

impl ShapeExtraction {
    /// Whether any feature fell back to the mean.
    pub fn used_fallback(&self) -> bool {
        self.fallback_features > 0
    }
}

/// Shift every member onto the reference's time axis.
///
/// Positions shifted in from outside the member are zero.
pub fn align_members(
    reference: &Series,
    members: &[&Series],
    member_norms: &[f64],
    correlator: &CrossCorrelator,
) -> Vec<Series> {
    let ref_norm = reference.norm();
    members
        .iter()
        .zip(member_norms.iter())
        .map(|(member, &norm)| {
            let (shift, _) = correlator.best_alignment(reference, ref_norm, member, norm);
            member.shifted(shift)
        })
        .collect()
}

/// Pick the sign of `v` closest to the aligned members.
///
/// Compares the summed Euclidean distances from every member to `+v` and to
/// `-v`; `v` is negated only if `-v` is strictly closer.
pub fn orient_eigenvector(v: Vec<f64>, members: &[&[f64]]) -> Vec<f64> {
    let mut plus = 0.0;
    let mut minus = 0.0;
    for member in members {
        let (mut dp, mut dm) = (0.0, 0.0);
        for (&x, &vi) in member.iter().zip(v.iter()) {
            dp += (x - vi).powi(2);
            dm += (x + vi).powi(2);
        }
        plus += dp.sqrt();
        minus += dm.sqrt();
    }
    if minus < plus {
        v.into_iter().map(|x| -x).collect()
    } else {
        v
    }
}

/// Dominant eigenvector of `Q^T X^T X Q`, or `None` if it cannot be trusted.
fn dominant_shape(rows: &[&[f64]], len: usize) -> Option<Vec<f64>> {
    let x = DMatrix::from_fn(rows.len(), len, |i, t| rows[i][t]);
    let s = x.transpose() * &x;
    let inv_len = 1.0 / len as f64;
    let q = DMatrix::from_fn(len, len, |i, j| {
        let identity = if i == j { 1.0 } else { 0.0 };
        identity - inv_len
    });
    let m = q.transpose() * s * &q;

    let eigen = SymmetricEigen::try_new(m, f64::EPSILON, EIGEN_ITER_PER_ROW * len)?;

    let mut best = 0;
    for (i, &lambda) in eigen.eigenvalues.iter().enumerate() {
        if lambda > eigen.eigenvalues[best] {
            best = i;
        }
    }
    let lambda = eigen.eigenvalues[best];
    if lambda.is_nan() || lambda <= EIGEN_EPSILON {
        return None;
    }

    let v: Vec<f64> = eigen.eigenvectors.column(best).iter().copied().collect();
    if v.iter().all(|x| x.is_finite()) {
        Some(v)
    } else {
        None
    }
}

fn mean_column(rows: &[&[f64]], len: usize) -> Vec<f64> {
    let n = rows.len() as f64;
    (0..len)
        .map(|t| rows.iter().map(|r| r[t]).sum::<f64>() / n)
        .collect()
}

/// Extract a new shape for one cluster.
///
/// # Arguments
/// * `cluster` - Cluster index, reported in errors
/// * `current` - Current centroid the members are aligned on
/// * `members` - Member series
/// * `member_norms` - Norms of the member series
/// * `correlator` - Correlator for the series length
///
/// # Errors
/// [`ClusterError::EmptyCluster`] if `members` is empty.
pub fn extract_shape(
    cluster: usize,
    current: &Series,
    members: &[&Series],
    member_norms: &[f64],
    correlator: &CrossCorrelator,
) -> Result<ShapeExtraction> {
    if members.is_empty() {
        return Err(ClusterError::EmptyCluster { cluster });
    }

    let len = current.len();
    let aligned = align_members(current, members, member_norms, correlator);

    let mut fallback_features = 0;
    let columns = (0..current.dimensions())
        .map(|d| {
            let rows: Vec<&[f64]> = aligned.iter().map(|s| s.columns()[d].as_slice()).collect();
            match dominant_shape(&rows, len) {
                Some(v) => orient_eigenvector(v, &rows),
                None => {
                    warn!(
                        cluster,
                        feature = d,
                        members = rows.len(),
                        "eigendecomposition unusable, falling back to mean shape"
                    );
                    fallback_features += 1;
                    mean_column(&rows, len)
                }
            }
        })
        .collect();

    Ok(ShapeExtraction {
        centroid: Series::from_columns(columns),
        fallback_features,
    })
}

/// Recompute every centroid and normalize the set globally.
///
/// Returns the new centroids and the total number of mean fallbacks.
///
/// # Errors
/// [`ClusterError::EmptyCluster`] if any cluster has no members.
pub fn update_centroids(
    series: &[Series],
    norms: &NormCache,
    labels: &[usize],
    centroids: &[Series],
    correlator: &CrossCorrelator,
) -> Result<(Vec<Series>, usize)> {
    let extractions: Vec<ShapeExtraction> = iter_maybe_parallel!(0..centroids.len())
        .map(|k| {
            let (members, member_norms): (Vec<&Series>, Vec<f64>) = labels
                .iter()
                .enumerate()
                .filter(|(_, &l)| l == k)
                .map(|(i, _)| (&series[i], norms.get(i)))
                .unzip();
            extract_shape(k, &centroids[k], &members, &member_norms, correlator)
        })
        .collect::<Result<Vec<_>>>()?;

    let fallbacks = extractions.iter().map(|e| e.fallback_features).sum();
    let updated = extractions.into_iter().map(|e| e.centroid).collect();
    Ok((global_normalize(updated), fallbacks))
}
