//! k-Shape clustering.
//!
//! Groups time series by shift-invariant shape similarity. Each restart
//! attempt alternates between assigning series to the centroid with the
//! smallest shape-based distance and re-extracting every centroid as the
//! dominant shape of its aligned members. An attempt stops when the inertia
//! stalls or rises; on stopping, the last update is rolled back so the
//! returned centroids and labels always belong together.
//!
//! # Example
//!
//! ```
//! use kshape_ts::clustering::{Clusterer, KShape, KShapeConfig};
//! use kshape_ts::core::Series;
//!
//! let series = vec![
//!     Series::univariate(vec![0.0, 1.0, 2.0, 1.0, 0.0]).unwrap(),
//!     Series::univariate(vec![0.0, 1.0, 2.0, 1.0, 0.0]).unwrap(),
//!     Series::univariate(vec![5.0, 4.0, 3.0, 4.0, 5.0]).unwrap(),
//! ];
//!
//! let mut model = KShape::new(KShapeConfig::default().n_clusters(2).seed(0));
//! let labels = model.fit_predict(&series).unwrap();
//! assert_eq!(labels[0], labels[1]);
//! assert_ne!(labels[0], labels[2]);
//! ```

use tracing::{debug, instrument};

use super::assign::{assign, distance_matrix, nearest_centroids, Assignment};
use super::restart::{attempt_seed, run_restarts, sample_initial, RestartPlan};
use super::sbd::{CrossCorrelator, NormCache};
use super::shape::update_centroids;
use super::traits::Clusterer;
use crate::core::{dataset_shape, Series};
use crate::error::{ClusterError, Result};
use crate::transform::{z_normalize, ScaleResult};

/// How initial centroids are chosen.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum KShapeInit {
    /// `k` distinct training series picked at random per attempt
    #[default]
    Random,
    /// Caller-supplied centroids, in the same units as the training data.
    /// Only one attempt is made.
    Centroids(Vec<Series>),
}

/// k-Shape configuration.
#[derive(Debug, Clone)]
pub struct KShapeConfig {
    /// Number of clusters
    pub n_clusters: usize,
    /// Maximum update iterations per attempt
    pub max_iter: usize,
    /// Inertia change below which an attempt has converged
    pub tol: f64,
    /// Number of successful attempts to keep the best of
    pub n_init: usize,
    /// Initialization strategy
    pub init: KShapeInit,
    /// Base random seed (drawn from entropy when `None`)
    pub seed: Option<u64>,
}

impl Default for KShapeConfig {
    fn default() -> Self {
        Self {
            n_clusters: 3,
            max_iter: 100,
            tol: 1e-6,
            n_init: 1,
            init: KShapeInit::Random,
            seed: None,
        }
    }
}

impl KShapeConfig {
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

    /// Set number of restarts.
    pub fn n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    /// Set initialization strategy.
    pub fn init(mut self, init: KShapeInit) -> Self {
        self.init = init;
        self
    }

    /// Start from explicit centroids.
    pub fn centroids(self, centroids: Vec<Series>) -> Self {
        self.init(KShapeInit::Centroids(centroids))
    }

    /// Set random seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn validate(&self, n_series: usize, len: usize, dims: usize) -> Result<()> {
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
        if let KShapeInit::Centroids(centroids) = &self.init {
            if centroids.len() != self.n_clusters {
                return Err(ClusterError::DimensionMismatch {
                    expected: self.n_clusters,
                    got: centroids.len(),
                });
            }
            for c in centroids {
                if c.len() != len {
                    return Err(ClusterError::DimensionMismatch {
                        expected: len,
                        got: c.len(),
                    });
                }
                if c.dimensions() != dims {
                    return Err(ClusterError::DimensionMismatch {
                        expected: dims,
                        got: c.dimensions(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Centroids with their norms and the assignment they produce.
#[derive(Debug, Clone)]
struct Snapshot {
    centroids: Vec<Series>,
    norms: NormCache,
    assignment: Assignment,
}

/// Result of one restart attempt.
#[derive(Debug, Clone)]
struct AttemptResult {
    snapshot: Snapshot,
    n_iter: usize,
    fallbacks: usize,
}

/// Normalized training data shared read-only by all attempts.
struct FitData {
    series: Vec<Series>,
    norms: NormCache,
    correlator: CrossCorrelator,
}

impl FitData {
    fn snapshot(&self, centroids: Vec<Series>) -> Result<Snapshot> {
        let norms = NormCache::compute(&centroids);
        let assignment = assign(&self.series, &self.norms, &centroids, &norms, &self.correlator)?;
        Ok(Snapshot {
            centroids,
            norms,
            assignment,
        })
    }
}

/// A fitted k-Shape model.
#[derive(Debug, Clone)]
pub struct FittedKShape {
    centroids: Vec<Series>,
    centroid_norms: NormCache,
    labels: Vec<usize>,
    inertia: f64,
    n_iter: usize,
    base_seed: u64,
    best_attempt: usize,
    n_attempts: usize,
    n_successful: usize,
    fallbacks: usize,
    correlator: CrossCorrelator,
}

impl FittedKShape {
    /// Cluster centroids, in the normalized units of the training batch.
    ///
    /// Extracted centroids are globally z-normalized as a set. When the
    /// first update of the winning attempt was rolled back, these are the
    /// initial centroids instead: training series (or the supplied
    /// centroids) scaled with the batch statistics, which need not have
    /// zero mean and unit variance as a set.
    pub fn centroids(&self) -> &[Series] {
        &self.centroids
    }

    /// Training labels.
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Sum of shape-based distances of training series to their centroid.
    pub fn inertia(&self) -> f64 {
        self.inertia
    }

    /// Update iterations run by the winning attempt.
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

    /// Mean-shape fallbacks taken by the winning attempt.
    pub fn fallbacks(&self) -> usize {
        self.fallbacks
    }

    /// Number of clusters.
    pub fn n_clusters(&self) -> usize {
        self.centroids.len()
    }

    /// Length of the series the model was fitted on.
    pub fn series_len(&self) -> usize {
        self.centroids[0].len()
    }

    /// Features per time step of the series the model was fitted on.
    pub fn n_features(&self) -> usize {
        self.centroids[0].dimensions()
    }

    /// Get indices of training series in a specific cluster.
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
        super::assign::cluster_sizes(&self.labels, self.n_clusters())
    }
}

/// k-Shape clustering model.
#[derive(Debug, Clone)]
pub struct KShape {
    config: KShapeConfig,
    fitted: Option<FittedKShape>,
}

impl KShape {
    /// Create an unfitted model.
    pub fn new(config: KShapeConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }

    /// Model configuration.
    pub fn config(&self) -> &KShapeConfig {
        &self.config
    }

    /// Fitted state, if any.
    pub fn fitted(&self) -> Option<&FittedKShape> {
        self.fitted.as_ref()
    }

    fn fitted_or_err(&self) -> Result<&FittedKShape> {
        self.fitted.as_ref().ok_or(ClusterError::FitRequired)
    }

    /// One restart attempt: INIT, ASSIGN, then UPDATE/CHECK until stable.
    fn run_attempt(
        &self,
        data: &FitData,
        initial: Vec<Series>,
        attempt: usize,
    ) -> Result<AttemptResult> {
        let mut current = data.snapshot(initial)?;
        let mut n_iter = 0;
        let mut fallbacks = 0;

        for _ in 0..self.config.max_iter {
            n_iter += 1;
            let (updated, fb) = update_centroids(
                &data.series,
                &data.norms,
                &current.assignment.labels,
                &current.centroids,
                &data.correlator,
            )?;
            // An update that empties a cluster ends the attempt like a rise in
            // inertia. Only the initial assignment may discard the attempt.
            let candidate = match data.snapshot(updated) {
                Ok(candidate) => candidate,
                Err(err) if err.is_recoverable() => {
                    debug!(attempt, iteration = n_iter, %err, "update emptied a cluster, rolling back");
                    break;
                }
                Err(err) => return Err(err),
            };

            let prev = current.assignment.inertia;
            let next = candidate.assignment.inertia;
            debug!(attempt, iteration = n_iter, inertia = next, "k-shape iteration");

            // Keep the pre-update snapshot when the objective stalls or worsens.
            if (prev - next).abs() < self.config.tol || next > prev {
                break;
            }
            fallbacks += fb;
            current = candidate;
        }

        Ok(AttemptResult {
            snapshot: current,
            n_iter,
            fallbacks,
        })
    }

    /// Normalize a prediction batch and check it against the fitted shape.
    fn prepare(&self, series: &[Series]) -> Result<(&FittedKShape, Vec<Series>, NormCache)> {
        let fitted = self.fitted_or_err()?;
        let (len, dims) = dataset_shape(series)?;
        if len != fitted.series_len() {
            return Err(ClusterError::DimensionMismatch {
                expected: fitted.series_len(),
                got: len,
            });
        }
        if dims != fitted.n_features() {
            return Err(ClusterError::DimensionMismatch {
                expected: fitted.n_features(),
                got: dims,
            });
        }
        let scaled = z_normalize(series).data;
        let norms = NormCache::compute(&scaled);
        Ok((fitted, scaled, norms))
    }
}

impl Clusterer for KShape {
    #[instrument(skip_all, fields(n_series = series.len(), k = self.config.n_clusters))]
    fn fit(&mut self, series: &[Series]) -> Result<()> {
        self.fitted = None;

        let (len, dims) = dataset_shape(series)?;
        self.config.validate(series.len(), len, dims)?;

        let scaled: ScaleResult = z_normalize(series);
        let explicit = match &self.config.init {
            KShapeInit::Centroids(centroids) => Some(scaled.transform(centroids)),
            KShapeInit::Random => None,
        };
        let data = FitData {
            norms: NormCache::compute(&scaled.data),
            series: scaled.data,
            correlator: CrossCorrelator::new(len),
        };

        let base_seed = self.config.seed.unwrap_or_else(rand::random);
        let plan = match explicit {
            Some(_) => RestartPlan::single(),
            None => RestartPlan::random(self.config.n_init),
        };
        debug!(base_seed, max_attempts = plan.max_attempts, "starting k-shape fit");

        let k = self.config.n_clusters;
        let outcome = run_restarts(
            plan,
            |attempt| {
                let initial = match &explicit {
                    Some(centroids) => centroids.clone(),
                    None => sample_initial(&data.series, k, attempt_seed(base_seed, attempt)),
                };
                self.run_attempt(&data, initial, attempt)
            },
            |result: &AttemptResult| result.snapshot.assignment.inertia,
        )?;

        let best = outcome.best;
        debug!(
            best_attempt = outcome.best_attempt,
            inertia = best.snapshot.assignment.inertia,
            n_iter = best.n_iter,
            "k-shape fit finished"
        );

        self.fitted = Some(FittedKShape {
            centroids: best.snapshot.centroids,
            centroid_norms: best.snapshot.norms,
            labels: best.snapshot.assignment.labels,
            inertia: best.snapshot.assignment.inertia,
            n_iter: best.n_iter,
            base_seed,
            best_attempt: outcome.best_attempt,
            n_attempts: outcome.n_attempts,
            n_successful: outcome.n_successful,
            fallbacks: best.fallbacks,
            correlator: data.correlator,
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
        let (fitted, scaled, norms) = self.prepare(series)?;
        Ok(distance_matrix(
            &scaled,
            &norms,
            &fitted.centroids,
            &fitted.centroid_norms,
            &fitted.correlator,
        ))
    }

    fn labels(&self) -> Option<&[usize]> {
        self.fitted.as_ref().map(|f| f.labels.as_slice())
    }

    fn name(&self) -> &str {
        "KShape"
    }
}
