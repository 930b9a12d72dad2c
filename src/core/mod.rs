//! Core data structures for time series clustering.

mod series;

pub use series::{dataset_shape, Series, ValueLayout};
