//! Time series clustering algorithms.
//!
//! Provides shape-based distance (SBD) and k-Shape clustering, plus Dynamic
//! Time Warping (DTW) distance measures and a k-means baseline.
//!
//! # Example
//!
//! ```
//! use kshape_ts::clustering::{sbd_distance, Clusterer, KShape, KShapeConfig};
//! use kshape_ts::core::Series;
//!
//! // Shape-based distance ignores amplitude and shift
//! let a = Series::univariate(vec![0.0, 1.0, 2.0, 1.0, 0.0]).unwrap();
//! let b = Series::univariate(vec![0.0, 0.0, 2.0, 4.0, 2.0]).unwrap();
//! assert!(sbd_distance(&a, &b).unwrap() < 1e-9);
//!
//! // Cluster time series
//! let series = vec![
//!     a.clone(),
//!     b.clone(),
//!     a.map(|x| -x),
//!     b.map(|x| -x),
//! ];
//! let mut model = KShape::new(KShapeConfig::default().n_clusters(2).n_init(5).seed(42));
//! let labels = model.fit_predict(&series).unwrap();
//! assert_eq!(labels[0], labels[1]);
//! assert_eq!(labels[2], labels[3]);
//! assert_ne!(labels[0], labels[2]);
//! ```

pub mod assign;
pub mod dtw;
pub mod evaluation;
pub mod kmeans;
pub mod kshape;
pub mod metric;
pub mod restart;
pub mod sbd;
pub mod shape;
pub mod traits;

// Re-export from sbd
pub use sbd::{
    best_shift, cross_correlation, cross_correlation_fft, cross_correlation_naive,
    max_correlation, sbd_distance, CrossCorrelator, NormCache, FFT_CROSSOVER,
};

// Re-export from dtw
pub use dtw::{dtw_distance, dtw_distance_windowed, dtw_pairwise, dtw_path, euclidean_distance};

pub use assign::Assignment;
pub use evaluation::{pairwise_distances, silhouette_samples, silhouette_score};
pub use kmeans::{FittedKMeans, KMeansConfig, TimeSeriesKMeans};
pub use kshape::{FittedKShape, KShape, KShapeConfig, KShapeInit};
pub use metric::{DistanceMetric, Dtw, Euclidean, Metric, ShapeBased};
pub use shape::{extract_shape, ShapeExtraction};
pub use traits::{BoxedClusterer, Clusterer};
