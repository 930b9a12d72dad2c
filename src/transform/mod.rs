//! Data transformations for time series batches.
//!
//! # Example
//!
//! ```
//! use kshape_ts::core::Series;
//! use kshape_ts::transform::z_normalize;
//!
//! let batch = vec![
//!     Series::univariate(vec![1.0, 2.0, 3.0]).unwrap(),
//!     Series::univariate(vec![4.0, 5.0, 6.0]).unwrap(),
//! ];
//!
//! // Zero mean, unit variance over all pooled values
//! let scaled = z_normalize(&batch);
//! assert!((scaled.center - 3.5).abs() < 1e-12);
//! ```

pub mod scale;

pub use scale::{global_normalize, z_normalize, ScaleResult};
