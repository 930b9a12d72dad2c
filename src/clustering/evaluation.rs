//! Cluster quality measures.

use super::metric::Metric;
use crate::core::Series;
use crate::error::{ClusterError, Result};
use crate::parallel::iter_maybe_parallel;
#[cfg(feature = "parallel")]
use rayon::iter::ParallelIterator;

/// Symmetric matrix of metric distances between all series.
pub fn pairwise_distances(series: &[Series], metric: &dyn Metric) -> Vec<Vec<f64>> {
    let n = series.len();
    let upper: Vec<Vec<f64>> = iter_maybe_parallel!(0..n)
        .map(|i| {
            ((i + 1)..n)
                .map(|j| metric.distance(&series[i], &series[j]))
                .collect::<Vec<f64>>()
        })
        .collect();

    let mut dist = vec![vec![0.0; n]; n];
    for (i, row) in upper.iter().enumerate() {
        for (offset, &d) in row.iter().enumerate() {
            let j = i + 1 + offset;
            dist[i][j] = d;
            dist[j][i] = d;
        }
    }
    dist
}

/// Silhouette coefficient of every series.
///
/// `s(i) = (b - a) / max(a, b)` where `a` is the mean distance to the other
/// members of its own cluster and `b` the smallest mean distance to another
/// cluster. Members of singleton clusters score 0.
///
/// # Errors
/// * [`ClusterError::EmptyData`] for an empty dataset
/// * [`ClusterError::DimensionMismatch`] if `labels` and `series` differ in length
/// * [`ClusterError::InvalidParameter`] unless `2 <= clusters <= n - 1`
pub fn silhouette_samples(series: &[Series], labels: &[usize], metric: &dyn Metric) -> Result<Vec<f64>> {
    let n = series.len();
    if n == 0 {
        return Err(ClusterError::EmptyData);
    }
    if labels.len() != n {
        return Err(ClusterError::DimensionMismatch {
            expected: n,
            got: labels.len(),
        });
    }

    let n_labels = labels.iter().max().map_or(0, |&m| m + 1);
    let mut sizes = vec![0usize; n_labels];
    for &l in labels {
        sizes[l] += 1;
    }
    let n_clusters = sizes.iter().filter(|&&s| s > 0).count();
    if n_clusters < 2 || n_clusters > n - 1 {
        return Err(ClusterError::InvalidParameter(format!(
            "silhouette needs between 2 and {} clusters, got {}",
            n - 1,
            n_clusters
        )));
    }

    let dist = pairwise_distances(series, metric);

    let scores = (0..n)
        .map(|i| {
            let own = labels[i];
            if sizes[own] <= 1 {
                return 0.0;
            }

            let mut sums = vec![0.0; n_labels];
            for (j, &l) in labels.iter().enumerate() {
                if j != i {
                    sums[l] += dist[i][j];
                }
            }

            let a = sums[own] / (sizes[own] - 1) as f64;
            let b = (0..n_labels)
                .filter(|&c| c != own && sizes[c] > 0)
                .map(|c| sums[c] / sizes[c] as f64)
                .fold(f64::INFINITY, f64::min);

            let denom = a.max(b);
            if denom > 0.0 {
                (b - a) / denom
            } else {
                0.0
            }
        })
        .collect();

    Ok(scores)
}

/// Mean silhouette coefficient over all series, in `[-1, 1]`.
///
/// Higher values mean tighter, better separated clusters.
///
/// # Errors
/// See [`silhouette_samples`].
pub fn silhouette_score(series: &[Series], labels: &[usize], metric: &dyn Metric) -> Result<f64> {
    let scores = silhouette_samples(series, labels, metric)?;
    Ok(scores.iter().sum::<f64>() / scores.len() as f64)
}
