//! Z-score normalization over a batch of series.
//!
//! Statistics are pooled: one mean and one standard deviation are computed
//! over every value of every series (all features flattened together), and
//! every series is rescaled with them.

use crate::core::Series;

/// Result of a batch scaling transform, containing parameters for inverse transform.
#[derive(Debug, Clone)]
pub struct ScaleResult {
    /// Transformed series
    pub data: Vec<Series>,
    /// Pooled mean
    pub center: f64,
    /// Pooled population standard deviation (1.0 for constant input)
    pub scale: f64,
}

impl ScaleResult {
    /// Inverse transform to recover the original scale.
    pub fn inverse(&self) -> Vec<Series> {
        self.data
            .iter()
            .map(|s| s.map(|x| x * self.scale + self.center))
            .collect()
    }

    /// Transform new series using the same parameters.
    pub fn transform(&self, series: &[Series]) -> Vec<Series> {
        series
            .iter()
            .map(|s| s.map(|x| (x - self.center) / self.scale))
            .collect()
    }
}

/// Pooled mean and population standard deviation.
fn pooled_stats(series: &[Series]) -> (f64, f64) {
    let count: usize = series.iter().map(|s| s.len() * s.dimensions()).sum();
    if count == 0 {
        return (0.0, 0.0);
    }
    let n = count as f64;
    let mean = series.iter().flat_map(Series::iter_flat).sum::<f64>() / n;
    let variance = series
        .iter()
        .flat_map(Series::iter_flat)
        .map(|x| (x - mean).powi(2))
        .sum::<f64>()
        / n;
    (mean, variance.sqrt())
}

/// Standardize a batch to zero mean and unit variance over its pooled values.
///
/// x_scaled = (x - mean) / std
///
/// A constant batch is only centered.
pub fn z_normalize(series: &[Series]) -> ScaleResult {
    let (mean, std) = pooled_stats(series);
    let scale = if std < 1e-10 { 1.0 } else { std };
    let data = series
        .iter()
        .map(|s| s.map(|x| (x - mean) / scale))
        .collect();

    ScaleResult {
        data,
        center: mean,
        scale,
    }
}

/// Normalize a centroid set in place of the previous one.
///
/// Same pooled statistics as [`z_normalize`]; parameters are discarded.
pub fn global_normalize(centroids: Vec<Series>) -> Vec<Series> {
    if centroids.is_empty() {
        return centroids;
    }
    z_normalize(&centroids).data
}
