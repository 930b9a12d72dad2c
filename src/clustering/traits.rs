//! Clusterer trait defining the common interface for clustering models.

use crate::core::Series;
use crate::error::{ClusterError, Result};

/// Common interface for time series clustering models.
///
/// This trait is object-safe and can be used with `Box<dyn Clusterer>`.
pub trait Clusterer {
    /// Fit the model to a dataset.
    fn fit(&mut self, series: &[Series]) -> Result<()>;

    /// Assign new series to the fitted clusters.
    fn predict(&self, series: &[Series]) -> Result<Vec<usize>>;

    /// Distance from every series to every fitted centroid (`n × k`).
    fn transform(&self, series: &[Series]) -> Result<Vec<Vec<f64>>>;

    /// Labels of the training data.
    fn labels(&self) -> Option<&[usize]>;

    /// Get the model name.
    fn name(&self) -> &str;

    /// Fit, then return the training labels.
    fn fit_predict(&mut self, series: &[Series]) -> Result<Vec<usize>> {
        self.fit(series)?;
        self.labels()
            .map(<[usize]>::to_vec)
            .ok_or(ClusterError::FitRequired)
    }

    /// Check if the model has been fitted.
    fn is_fitted(&self) -> bool {
        self.labels().is_some()
    }
}

/// Type alias for boxed clusterer trait objects.
pub type BoxedClusterer = Box<dyn Clusterer>;
