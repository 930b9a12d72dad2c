//! Distance strategies shared by the clusterers and the evaluation helpers.
//!
//! A [`DistanceMetric`] is plain configuration; [`DistanceMetric::strategy`]
//! resolves it once into a [`Metric`] object that the hot loops call.

use std::fmt;

use super::dtw::{dtw_distance, dtw_distance_windowed, euclidean_distance};
use super::sbd::sbd_distance;
use crate::core::Series;

/// A dissimilarity between two series.
///
/// Incomparable inputs (different feature counts, or different lengths for
/// lock-step metrics) are infinitely far apart.
pub trait Metric: Send + Sync + fmt::Debug {
    /// Distance between `a` and `b`; `0.0` for identical inputs.
    fn distance(&self, a: &Series, b: &Series) -> f64;

    /// Short metric name.
    fn name(&self) -> &'static str;
}

/// Lock-step Euclidean distance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Euclidean;

impl Metric for Euclidean {
    fn distance(&self, a: &Series, b: &Series) -> f64 {
        euclidean_distance(a, b)
    }

    fn name(&self) -> &'static str {
        "euclidean"
    }
}

/// Dynamic Time Warping, optionally inside a Sakoe-Chiba band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dtw {
    pub window: Option<usize>,
}

impl Metric for Dtw {
    fn distance(&self, a: &Series, b: &Series) -> f64 {
        match self.window {
            Some(window) => dtw_distance_windowed(a, b, window),
            None => dtw_distance(a, b),
        }
    }

    fn name(&self) -> &'static str {
        "dtw"
    }
}

/// Shape-based distance, `1 - max NCC`, in `[0, 2]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShapeBased;

impl Metric for ShapeBased {
    fn distance(&self, a: &Series, b: &Series) -> f64 {
        sbd_distance(a, b).unwrap_or(f64::INFINITY)
    }

    fn name(&self) -> &'static str {
        "sbd"
    }
}

/// Distance metric for clustering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceMetric {
    /// Euclidean distance (requires same-length series)
    #[default]
    Euclidean,
    /// Dynamic Time Warping distance
    Dtw { window: Option<usize> },
    /// Shape-based distance
    ShapeBased,
}

impl DistanceMetric {
    /// Unconstrained DTW.
    pub fn dtw() -> Self {
        DistanceMetric::Dtw { window: None }
    }

    /// Resolve the configured metric into its strategy object.
    pub fn strategy(&self) -> Box<dyn Metric> {
        match *self {
            DistanceMetric::Euclidean => Box::new(Euclidean),
            DistanceMetric::Dtw { window } => Box::new(Dtw { window }),
            DistanceMetric::ShapeBased => Box::new(ShapeBased),
        }
    }
}
