//! # kshape-ts
//!
//! Shape-based time series clustering.
//!
//! Implements k-Shape: series are compared with the shape-based distance
//! (one minus the maximum normalized cross-correlation over all shifts) and
//! each cluster is summarized by the dominant shape of its aligned members.
//! A k-means baseline with Euclidean or DTW distance, silhouette scoring and
//! z-normalization helpers are included.

// Allow some clippy warnings for cleaner code in specific cases
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]
#![allow(clippy::needless_range_loop)]

pub mod clustering;
pub mod core;
pub mod error;
mod parallel;
pub mod transform;

pub use error::{ClusterError, Result};

pub mod prelude {
    pub use crate::clustering::{
        sbd_distance, Clusterer, DistanceMetric, KMeansConfig, KShape, KShapeConfig, KShapeInit,
        TimeSeriesKMeans,
    };
    pub use crate::core::{Series, ValueLayout};
    pub use crate::error::{ClusterError, Result};
    pub use crate::transform::z_normalize;
}
