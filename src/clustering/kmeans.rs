//! K-means clustering for time series.
//!
//! Lloyd iterations under a configurable [`DistanceMetric`]. Barycenters are
//! the coordinate-wise mean for Euclidean distance and the medoid (the member
//! with the smallest total distance to the others) for every other metric.
//! Restarts, seeding, empty-cluster handling and the stop-and-rollback rule
//! are the same as for [`KShape`](super::KShape). Series are clustered in
//! their original units.

use tracing::{debug, instrument};

use super::assign::{assign_from_distances, cluster_sizes, nearest_centroids, Assignment};
use super::metric::{DistanceMetric, Metric};
use super::restart::{attempt_seed, run_restarts, sample_initial, RestartPlan};
use super::traits::Clusterer;
use crate::core::{dataset_shape, Series};
use crate::error::{ClusterError, Result};
use crate::parallel::{iter_maybe_parallel, slice_maybe_parallel};
#[cfg(feature = "parallel")]
use rayon::iter::ParallelIterator;

/// K-means configuration.
#[derive(Debug, Clone)]
pub struct KMeansConfig {
    /// Number of clusters
    pub n_clusters: usize,
    /// Maximum iterations
    pub max_iter: usize,
    /// Convergence tolerance
    pub tol: f64,
    /// Number of successful attempts to keep the best of
    pub n_init: usize,
    /// Distance metric
    pub metric: DistanceMetric,
    /// Random seed for initialization
    pub seed: Option<u64>,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            n_clusters: 3,
            max_iter: 100,
            tol: 1e-4,
            n_init: 1,
            metric: DistanceMetric::Euclidean,
            seed: None,
        }
    }
}

impl KMeansConfig {
    /// Set number of clusters.
    pub fn n_clusters(mut self, n_clusters: usize) -> Self {
        self.n_clusters = n_clusters;
        self
    }

    /// Set maximum iterations.
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set convergence tolerance.
    pub fn tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set number of successful restarts.
    pub fn n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    /// Set distance metric.
    pub fn metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Set random seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn validate(&self, n_series: usize) -> Result<()> {
        if self.n_clusters == 0 {
            return Err(ClusterError::InvalidParameter(
                "n_clusters must be positive".to_string(),
            ));
        }
        if self.n_clusters > n_series {
            return Err(ClusterError::InvalidParameter(format!(
                "n_clusters ({}) exceeds number of series ({})",
                self.n_clusters, n_series
            )));
        }
        if self.n_init == 0 {
            return Err(ClusterError::InvalidParameter(
                "n_init must be positive".to_string(),
            ));
        }
        if self.tol.is_nan() || self.tol < 0.0 {
            return Err(ClusterError::InvalidParameter(
                "tol must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Metric distance from every series to every centroid.
fn metric_distances(series: &[Series], centroids: &[Series], metric: &dyn Metric) -> Vec<Vec<f64>> {
    slice_maybe_parallel!(series)
        .map(|s| {
            centroids
                .iter()
                .map(|c| metric.distance(s, c))
                .collect::<Vec<f64>>()
        })
        .collect()
}

/// Compute element-wise mean of multiple series.
fn mean_series(members: &[&Series]) -> Series {
    let (len, dims) = members[0].shape();
    let n = members.len() as f64;
    let columns = (0..dims)
        .map(|d| {
            (0..len)
                .map(|t| members.iter().map(|m| m.columns()[d][t]).sum::<f64>() / n)
                .collect()
        })
        .collect();
    Series::from_columns(columns)
}

/// Compute medoid (series minimizing total distance to others).
///
/// Ties go to the earliest member.
fn medoid(members: &[&Series], metric: &dyn Metric) -> Series {
    let mut min_total_dist = f64::INFINITY;
    let mut medoid_idx = 0;

    for (i, s1) in members.iter().enumerate() {
        let total_dist: f64 = members
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, s2)| metric.distance(s1, s2))
            .sum();

        if total_dist < min_total_dist {
            min_total_dist = total_dist;
            medoid_idx = i;
        }
    }

    members[medoid_idx].clone()
}

/// Recompute the barycenter of every cluster.
fn update_barycenters(
    series: &[Series],
    labels: &[usize],
    k: usize,
    kind: DistanceMetric,
    metric: &dyn Metric,
) -> Result<Vec<Series>> {
    iter_maybe_parallel!(0..k)
        .map(|cluster| {
            let members: Vec<&Series> = series
                .iter()
                .zip(labels.iter())
                .filter(|(_, &l)| l == cluster)
                .map(|(s, _)| s)
                .collect();

            if members.is_empty() {
                return Err(ClusterError::EmptyCluster { cluster });
            }
            Ok(match kind {
                DistanceMetric::Euclidean => mean_series(&members),
                _ => medoid(&members, metric),
            })
        })
        .collect()
}

/// Centroids together with the assignment they produce.
#[derive(Debug, Clone)]
struct Snapshot {
    centroids: Vec<Series>,
    assignment: Assignment,
}

impl Snapshot {
    fn new(series: &[Series], centroids: Vec<Series>, metric: &dyn Metric) -> Result<Self> {
        let distances = metric_distances(series, &centroids, metric);
        let assignment = assign_from_distances(&distances, centroids.len())?;
        Ok(Self {
            centroids,
            assignment,
        })
    }
}

/// A fitted k-means model.
#[derive(Debug, Clone)]
pub struct FittedKMeans {
    centroids: Vec<Series>,
    labels: Vec<usize>,
    inertia: f64,
    n_iter: usize,
    base_seed: u64,
    best_attempt: usize,
    n_attempts: usize,
    n_successful: usize,
}

impl FittedKMeans {
    /// Cluster centroids.
    pub fn centroids(&self) -> &[Series] {
        &self.centroids
    }

    /// Training labels.
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Inertia (sum of distances to nearest centroid).
    pub fn inertia(&self) -> f64 {
        self.inertia
    }

    /// Number of iterations performed by the winning attempt.
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    /// Base seed the attempt seeds were derived from.
    pub fn base_seed(&self) -> u64 {
        self.base_seed
    }

    /// Index of the winning attempt.
    pub fn best_attempt(&self) -> usize {
        self.best_attempt
    }

    /// Attempts made, including discarded ones.
    pub fn n_attempts(&self) -> usize {
        self.n_attempts
    }

    /// Attempts that finished without an empty cluster.
    pub fn n_successful(&self) -> usize {
        self.n_successful
    }

    /// Get indices of series in a specific cluster.
    pub fn cluster_members(&self, cluster: usize) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, &l)| l == cluster)
            .map(|(i, _)| i)
            .collect()
    }

    /// Get the size of each cluster.
    pub fn cluster_sizes(&self) -> Vec<usize> {
        cluster_sizes(&self.labels, self.centroids.len())
    }
}

/// K-means clustering model for time series.
#[derive(Debug, Clone)]
pub struct TimeSeriesKMeans {
    config: KMeansConfig,
    fitted: Option<FittedKMeans>,
}

impl TimeSeriesKMeans {
    /// Create an unfitted model.
    pub fn new(config: KMeansConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }

    /// Model configuration.
    pub fn config(&self) -> &KMeansConfig {
        &self.config
    }

    /// Fitted state, if any.
    pub fn fitted(&self) -> Option<&FittedKMeans> {
        self.fitted.as_ref()
    }

    fn run_attempt(
        &self,
        series: &[Series],
        metric: &dyn Metric,
        seed: u64,
        attempt: usize,
    ) -> Result<(Snapshot, usize)> {
        let k = self.config.n_clusters;
        let initial = sample_initial(series, k, seed);
        let mut current = Snapshot::new(series, initial, metric)?;
        let mut n_iter = 0;

        for _ in 0..self.config.max_iter {
            n_iter += 1;
            let updated = update_barycenters(
                series,
                &current.assignment.labels,
                k,
                self.config.metric,
                metric,
            )?;
            let candidate = match Snapshot::new(series, updated, metric) {
                Ok(candidate) => candidate,
                Err(err) if err.is_recoverable() => break,
                Err(err) => return Err(err),
            };

            let prev = current.assignment.inertia;
            let next = candidate.assignment.inertia;
            debug!(attempt, iteration = n_iter, inertia = next, "k-means iteration");

            if (prev - next).abs() < self.config.tol || next > prev {
                break;
            }
            current = candidate;
        }

        Ok((current, n_iter))
    }
}

impl Clusterer for TimeSeriesKMeans {
    #[instrument(skip_all, fields(n_series = series.len(), k = self.config.n_clusters))]
    fn fit(&mut self, series: &[Series]) -> Result<()> {
        self.fitted = None;

        dataset_shape(series)?;
        self.config.validate(series.len())?;

        let metric = self.config.metric.strategy();
        let base_seed = self.config.seed.unwrap_or_else(rand::random);
        let plan = RestartPlan::random(self.config.n_init);
        debug!(base_seed, metric = metric.name(), "starting k-means fit");

        let outcome = run_restarts(
            plan,
            |attempt| {
                self.run_attempt(
                    series,
                    metric.as_ref(),
                    attempt_seed(base_seed, attempt),
                    attempt,
                )
            },
            |(snapshot, _): &(Snapshot, usize)| snapshot.assignment.inertia,
        )?;

        let (snapshot, n_iter) = outcome.best;
        self.fitted = Some(FittedKMeans {
            centroids: snapshot.centroids,
            labels: snapshot.assignment.labels,
            inertia: snapshot.assignment.inertia,
            n_iter,
            base_seed,
            best_attempt: outcome.best_attempt,
            n_attempts: outcome.n_attempts,
            n_successful: outcome.n_successful,
        });
        Ok(())
    }

    fn predict(&self, series: &[Series]) -> Result<Vec<usize>> {
        let distances = self.transform(series)?;
        Ok(nearest_centroids(&distances)
            .into_iter()
            .map(|(label, _)| label)
            .collect())
    }

    fn transform(&self, series: &[Series]) -> Result<Vec<Vec<f64>>> {
        let fitted = self.fitted.as_ref().ok_or(ClusterError::FitRequired)?;
        let (len, dims) = dataset_shape(series)?;
        let (expected_len, expected_dims) = fitted.centroids[0].shape();
        if dims != expected_dims {
            return Err(ClusterError::DimensionMismatch {
                expected: expected_dims,
                got: dims,
            });
        }
        if len != expected_len {
            return Err(ClusterError::DimensionMismatch {
                expected: expected_len,
                got: len,
            });
        }
        let metric = self.config.metric.strategy();
        Ok(metric_distances(series, &fitted.centroids, metric.as_ref()))
    }

    fn labels(&self) -> Option<&[usize]> {
        self.fitted.as_ref().map(|f| f.labels.as_slice())
    }

    fn name(&self) -> &str {
        "TimeSeriesKMeans"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn uni(values: &[f64]) -> Series {
        Series::univariate(values.to_vec()).unwrap()
    }

    fn generate_cluster_data() -> Vec<Series> {
        vec![
            // Cluster 1: low values
            uni(&[1.0, 2.0, 1.0, 2.0, 1.0]),
            uni(&[1.5, 2.5, 1.5, 2.5, 1.5]),
            uni(&[1.2, 2.2, 1.2, 2.2, 1.2]),
            // Cluster 2: high values
            uni(&[10.0, 11.0, 10.0, 11.0, 10.0]),
            uni(&[10.5, 11.5, 10.5, 11.5, 10.5]),
            uni(&[10.2, 11.2, 10.2, 11.2, 10.2]),
        ]
    }

    fn assert_split(labels: &[usize]) {
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[1], labels[2]);
        assert_eq!(labels[3], labels[4]);
        assert_eq!(labels[4], labels[5]);
        assert_ne!(labels[0], labels[3]);
    }

    // ==================== fit ====================

    #[test]
    fn kmeans_finds_clusters() {
        let data = generate_cluster_data();
        let mut model = TimeSeriesKMeans::new(KMeansConfig::default().n_clusters(2).n_init(3).seed(42));
        let labels = model.fit_predict(&data).unwrap();

        assert_eq!(labels.len(), 6);
        assert_split(&labels);
        assert_eq!(model.fitted().unwrap().centroids().len(), 2);
    }

    #[test]
    fn kmeans_single_cluster() {
        let data = vec![uni(&[1.0, 2.0, 3.0]), uni(&[1.1, 2.1, 3.1]), uni(&[0.9, 1.9, 2.9])];
        let mut model = TimeSeriesKMeans::new(KMeansConfig::default().n_clusters(1).seed(0));
        model.fit(&data).unwrap();

        let fitted = model.fitted().unwrap();
        assert!(fitted.labels().iter().all(|&l| l == 0));
        // The mean of the three series is the middle one
        assert_relative_eq!(fitted.centroids()[0].primary_values()[1], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn kmeans_k_equals_n() {
        let data = vec![uni(&[1.0, 2.0]), uni(&[3.0, 4.0]), uni(&[5.0, 6.0])];
        let mut model = TimeSeriesKMeans::new(KMeansConfig::default().n_clusters(3).seed(1));
        model.fit(&data).unwrap();

        // Each point is at its own centroid
        let fitted = model.fitted().unwrap();
        assert_eq!(fitted.cluster_sizes(), vec![1, 1, 1]);
        assert_relative_eq!(fitted.inertia(), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn kmeans_with_dtw_uses_medoids() {
        let data = generate_cluster_data();
        let config = KMeansConfig::default()
            .n_clusters(2)
            .n_init(3)
            .metric(DistanceMetric::dtw())
            .seed(42);
        let mut model = TimeSeriesKMeans::new(config);
        let labels = model.fit_predict(&data).unwrap();

        assert_split(&labels);
        let fitted = model.fitted().unwrap();
        for centroid in fitted.centroids() {
            assert!(data.contains(centroid));
        }
    }

    #[test]
    fn duplicate_series_exhaust_attempts() {
        let data = vec![uni(&[1.0, 2.0, 3.0]); 3];
        let mut model = TimeSeriesKMeans::new(KMeansConfig::default().n_clusters(2).seed(0));
        assert_eq!(
            model.fit(&data),
            Err(ClusterError::NoSuccessfulInit { attempts: 10 })
        );
        assert!(!model.is_fitted());
    }

    #[test]
    fn kmeans_empty() {
        let mut model = TimeSeriesKMeans::new(KMeansConfig::default());
        assert_eq!(model.fit(&[]), Err(ClusterError::EmptyData));
    }

    #[test]
    fn kmeans_rejects_bad_parameters() {
        let data = generate_cluster_data();
        for config in [
            KMeansConfig::default().n_clusters(0),
            KMeansConfig::default().n_clusters(7),
            KMeansConfig::default().n_init(0),
            KMeansConfig::default().tol(-1.0),
        ] {
            assert!(matches!(
                TimeSeriesKMeans::new(config).fit(&data),
                Err(ClusterError::InvalidParameter(_))
            ));
        }
    }

    // ==================== predict / transform ====================

    #[test]
    fn predict_matches_training_labels() {
        let data = generate_cluster_data();
        let mut model = TimeSeriesKMeans::new(KMeansConfig::default().n_clusters(2).n_init(3).seed(7));
        let labels = model.fit_predict(&data).unwrap();
        assert_eq!(model.predict(&data).unwrap(), labels);

        let distances = model.transform(&data[..2]).unwrap();
        assert_eq!(distances.len(), 2);
        assert!(distances.iter().all(|row| row.len() == 2));
    }

    #[test]
    fn predict_requires_fit_and_matching_shape() {
        let data = generate_cluster_data();
        let mut model = TimeSeriesKMeans::new(KMeansConfig::default().n_clusters(2).seed(7));
        assert_eq!(model.predict(&data), Err(ClusterError::FitRequired));

        model.fit(&data).unwrap();
        assert_eq!(
            model.predict(&[uni(&[1.0, 2.0])]),
            Err(ClusterError::DimensionMismatch {
                expected: 5,
                got: 2
            })
        );
    }

    // ==================== cluster_members ====================

    #[test]
    fn cluster_members_basic() {
        let data = generate_cluster_data();
        let mut model = TimeSeriesKMeans::new(KMeansConfig::default().n_clusters(2).n_init(3).seed(42));
        model.fit(&data).unwrap();
        let fitted = model.fitted().unwrap();

        let c0_members = fitted.cluster_members(0);
        let c1_members = fitted.cluster_members(1);
        assert_eq!(c0_members.len() + c1_members.len(), 6);
        assert_eq!(fitted.cluster_sizes(), vec![3, 3]);
    }

    // ==================== config builder ====================

    #[test]
    fn config_builder() {
        let config = KMeansConfig::default()
            .n_clusters(5)
            .max_iter(50)
            .metric(DistanceMetric::dtw())
            .seed(123);

        assert_eq!(config.n_clusters, 5);
        assert_eq!(config.max_iter, 50);
        assert_eq!(config.metric, DistanceMetric::Dtw { window: None });
        assert_eq!(config.seed, Some(123));
    }

    #[test]
    fn name_and_boxing() {
        let model: crate::clustering::BoxedClusterer =
            Box::new(TimeSeriesKMeans::new(KMeansConfig::default()));
        assert_eq!(model.name(), "TimeSeriesKMeans");
        assert!(!model.is_fitted());
    }
}
