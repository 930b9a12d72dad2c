//! Assignment of series to their nearest centroid.

use super::sbd::{CrossCorrelator, NormCache};
use crate::core::Series;
use crate::error::{ClusterError, Result};
use crate::parallel::slice_maybe_parallel;
#[cfg(feature = "parallel")]
use rayon::iter::{IndexedParallelIterator, ParallelIterator};

/// Labels and objective value of one assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Cluster index for each series
    pub labels: Vec<usize>,
    /// Sum over series of the distance to the assigned centroid
    pub inertia: f64,
}

impl Assignment {
    /// Number of members in each of `k` clusters.
    pub fn cluster_sizes(&self, k: usize) -> Vec<usize> {
        cluster_sizes(&self.labels, k)
    }
}

pub(crate) fn cluster_sizes(labels: &[usize], k: usize) -> Vec<usize> {
    let mut sizes = vec![0; k];
    for &label in labels {
        if label < k {
            sizes[label] += 1;
        }
    }
    sizes
}

/// Shape-based distance from every series to every centroid.
///
/// Row `i` holds the `k` distances of series `i`.
pub fn distance_matrix(
    series: &[Series],
    norms: &NormCache,
    centroids: &[Series],
    centroid_norms: &NormCache,
    correlator: &CrossCorrelator,
) -> Vec<Vec<f64>> {
    slice_maybe_parallel!(series)
        .enumerate()
        .map(|(i, s)| {
            centroids
                .iter()
                .enumerate()
                .map(|(k, c)| {
                    correlator.distance_with_norms(s, norms.get(i), c, centroid_norms.get(k))
                })
                .collect::<Vec<f64>>()
        })
        .collect()
}

/// Index and value of the nearest centroid for every row.
///
/// Ties go to the lowest cluster index.
pub fn nearest_centroids(distances: &[Vec<f64>]) -> Vec<(usize, f64)> {
    distances
        .iter()
        .map(|row| {
            let mut nearest = 0;
            let mut min_dist = f64::INFINITY;
            for (c, &d) in row.iter().enumerate() {
                if d < min_dist {
                    min_dist = d;
                    nearest = c;
                }
            }
            (nearest, min_dist)
        })
        .collect()
}

/// Turn a distance matrix into labels and inertia.
///
/// # Errors
/// [`ClusterError::EmptyCluster`] for the lowest-indexed cluster left
/// without members.
pub fn assign_from_distances(distances: &[Vec<f64>], k: usize) -> Result<Assignment> {
    let (labels, chosen): (Vec<usize>, Vec<f64>) = nearest_centroids(distances).into_iter().unzip();

    if let Some(cluster) = cluster_sizes(&labels, k).iter().position(|&n| n == 0) {
        return Err(ClusterError::EmptyCluster { cluster });
    }

    Ok(Assignment {
        labels,
        inertia: chosen.iter().sum(),
    })
}

/// Assign every series to its nearest centroid.
///
/// # Errors
/// [`ClusterError::EmptyCluster`] if some centroid attracts no series.
pub fn assign(
    series: &[Series],
    norms: &NormCache,
    centroids: &[Series],
    centroid_norms: &NormCache,
    correlator: &CrossCorrelator,
) -> Result<Assignment> {
    let distances = distance_matrix(series, norms, centroids, centroid_norms, correlator);
    assign_from_distances(&distances, centroids.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn uni(values: &[f64]) -> Series {
        Series::univariate(values.to_vec()).unwrap()
    }

    #[test]
    fn assigns_to_nearest_shape() {
        let series = vec![
            uni(&[0.0, 1.0, 2.0, 1.0, 0.0]),
            uni(&[2.0, 1.0, 0.0, 1.0, 2.0]),
            uni(&[0.0, 1.0, 2.0, 1.0, 0.0]),
        ];
        let centroids = vec![series[1].clone(), series[0].clone()];
        let result = assign(
            &series,
            &NormCache::compute(&series),
            &centroids,
            &NormCache::compute(&centroids),
            &CrossCorrelator::new(5),
        )
        .unwrap();

        assert_eq!(result.labels, vec![1, 0, 1]);
        assert_relative_eq!(result.inertia, 0.0, epsilon = 1e-12);
        assert_eq!(result.cluster_sizes(2), vec![1, 2]);
    }

    #[test]
    fn distance_matrix_shape() {
        let series = vec![uni(&[1.0, 2.0, 3.0]); 4];
        let centroids = vec![uni(&[3.0, 2.0, 1.0]), uni(&[1.0, 2.0, 3.0])];
        let d = distance_matrix(
            &series,
            &NormCache::compute(&series),
            &centroids,
            &NormCache::compute(&centroids),
            &CrossCorrelator::new(3),
        );
        assert_eq!(d.len(), 4);
        assert!(d.iter().all(|row| row.len() == 2));
        assert!(d.iter().flatten().all(|&x| (0.0..=2.0).contains(&x)));
    }

    #[test]
    fn ties_go_to_lowest_index() {
        let distances = vec![vec![0.5, 0.5], vec![0.7, 0.1]];
        let result = assign_from_distances(&distances, 2).unwrap();
        assert_eq!(result.labels, vec![0, 1]);
        assert_relative_eq!(result.inertia, 0.6);
    }

    #[test]
    fn empty_cluster_is_an_error() {
        let distances = vec![vec![0.1, 0.5, 0.9], vec![0.2, 0.1, 0.9]];
        assert_eq!(
            assign_from_distances(&distances, 3),
            Err(ClusterError::EmptyCluster { cluster: 2 })
        );
    }
}
