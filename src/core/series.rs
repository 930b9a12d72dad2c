//! Fixed-length multivariate series used as clustering input.

use crate::error::{ClusterError, Result};

/// Layout of multivariate data passed to [`Series::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueLayout {
    /// Each inner vector is a feature (column-major).
    #[default]
    Column,
    /// Each inner vector is one time step across features (row-major).
    Row,
}

/// A series of `len` time steps by `dimensions` features.
///
/// Values are stored column-major: one vector per feature. A `Series` is
/// never empty and never contains NaN or infinite values.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    values: Vec<Vec<f64>>,
}

impl Series {
    /// Create a series from nested vectors in the given layout.
    ///
    /// # Errors
    /// * [`ClusterError::EmptyData`] if there are no time steps or no features
    /// * [`ClusterError::DimensionMismatch`] if rows/columns are ragged
    /// * [`ClusterError::MissingValues`] if any value is NaN or infinite
    pub fn new(values: Vec<Vec<f64>>, layout: ValueLayout) -> Result<Self> {
        let columns = match layout {
            ValueLayout::Column => values,
            ValueLayout::Row => {
                let dims = values.first().map(Vec::len).unwrap_or(0);
                for row in &values {
                    if row.len() != dims {
                        return Err(ClusterError::DimensionMismatch {
                            expected: dims,
                            got: row.len(),
                        });
                    }
                }
                (0..dims)
                    .map(|d| values.iter().map(|row| row[d]).collect())
                    .collect()
            }
        };

        let len = columns.first().map(Vec::len).unwrap_or(0);
        if columns.is_empty() || len == 0 {
            return Err(ClusterError::EmptyData);
        }
        for column in &columns {
            if column.len() != len {
                return Err(ClusterError::DimensionMismatch {
                    expected: len,
                    got: column.len(),
                });
            }
            if column.iter().any(|x| !x.is_finite()) {
                return Err(ClusterError::MissingValues);
            }
        }

        Ok(Self { values: columns })
    }

    /// Create a single-feature series.
    pub fn univariate(values: Vec<f64>) -> Result<Self> {
        Self::new(vec![values], ValueLayout::Column)
    }

    /// All-zero series with the given shape.
    ///
    /// # Errors
    /// [`ClusterError::EmptyData`] if `len` or `dimensions` is zero.
    pub fn zeros(len: usize, dimensions: usize) -> Result<Self> {
        if len == 0 || dimensions == 0 {
            return Err(ClusterError::EmptyData);
        }
        Ok(Self {
            values: vec![vec![0.0; len]; dimensions],
        })
    }

    /// Wrap already-validated columns.
    pub(crate) fn from_columns(values: Vec<Vec<f64>>) -> Self {
        debug_assert!(!values.is_empty());
        debug_assert!(values.iter().all(|c| c.len() == values[0].len()));
        Self { values }
    }

    /// Number of time steps.
    pub fn len(&self) -> usize {
        self.values.first().map(Vec::len).unwrap_or(0)
    }

    /// Check if the series has no time steps.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of features per time step.
    pub fn dimensions(&self) -> usize {
        self.values.len()
    }

    /// `(len, dimensions)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.len(), self.dimensions())
    }

    /// Values of one feature.
    pub fn values(&self, dimension: usize) -> Result<&[f64]> {
        self.values
            .get(dimension)
            .map(Vec::as_slice)
            .ok_or(ClusterError::DimensionMismatch {
                expected: self.dimensions(),
                got: dimension + 1,
            })
    }

    /// Values of the first feature.
    pub fn primary_values(&self) -> &[f64] {
        &self.values[0]
    }

    /// All features, column-major.
    pub fn columns(&self) -> &[Vec<f64>] {
        &self.values
    }

    /// Values of all features at time step `index`.
    pub fn row(&self, index: usize) -> Result<Vec<f64>> {
        if index >= self.len() {
            return Err(ClusterError::DimensionMismatch {
                expected: self.len(),
                got: index + 1,
            });
        }
        Ok(self.values.iter().map(|c| c[index]).collect())
    }

    /// Iterate over every value, feature by feature.
    pub fn iter_flat(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().flat_map(|c| c.iter().copied())
    }

    /// L2 norm over all flattened values.
    pub fn norm(&self) -> f64 {
        self.iter_flat().map(|x| x * x).sum::<f64>().sqrt()
    }

    /// Squared Euclidean distance over all features.
    pub fn squared_distance(&self, other: &Series) -> f64 {
        self.values
            .iter()
            .zip(other.values.iter())
            .flat_map(|(a, b)| a.iter().zip(b.iter()))
            .map(|(x, y)| (x - y).powi(2))
            .sum()
    }

    /// Apply `f` to every value.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Series {
        Series {
            values: self
                .values
                .iter()
                .map(|c| c.iter().map(|&x| f(x)).collect())
                .collect(),
        }
    }

    /// Move the series along the time axis.
    ///
    /// Position `i` of the result holds `self[i + shift]`; positions that
    /// fall outside the original series are zero-filled.
    pub fn shifted(&self, shift: isize) -> Series {
        let len = self.len() as isize;
        let values = self
            .values
            .iter()
            .map(|column| {
                (0..len)
                    .map(|i| {
                        let j = i + shift;
                        if (0..len).contains(&j) {
                            column[j as usize]
                        } else {
                            0.0
                        }
                    })
                    .collect()
            })
            .collect();
        Series { values }
    }
}

/// Validate a dataset and return its common `(len, dimensions)`.
///
/// # Errors
/// * [`ClusterError::EmptyData`] if there are no series
/// * [`ClusterError::DimensionMismatch`] if series differ in length or features
pub fn dataset_shape(series: &[Series]) -> Result<(usize, usize)> {
    let first = series.first().ok_or(ClusterError::EmptyData)?;
    let (len, dims) = first.shape();
    if len == 0 || dims == 0 {
        return Err(ClusterError::EmptyData);
    }
    for s in series.iter().skip(1) {
        if s.len() != len {
            return Err(ClusterError::DimensionMismatch {
                expected: len,
                got: s.len(),
            });
        }
        if s.dimensions() != dims {
            return Err(ClusterError::DimensionMismatch {
                expected: dims,
                got: s.dimensions(),
            });
        }
    }
    Ok((len, dims))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn univariate_shape() {
        let s = Series::univariate(vec![1.0, 2.0, 3.0]).unwrap();
        assert_eq!(s.shape(), (3, 1));
        assert_eq!(s.primary_values(), &[1.0, 2.0, 3.0]);
        assert!(!s.is_empty());
    }

    #[test]
    fn row_layout_is_transposed() {
        let s = Series::new(
            vec![vec![1.0, 10.0], vec![2.0, 20.0], vec![3.0, 30.0]],
            ValueLayout::Row,
        )
        .unwrap();
        assert_eq!(s.shape(), (3, 2));
        assert_eq!(s.values(1).unwrap(), &[10.0, 20.0, 30.0]);
        assert_eq!(s.row(2).unwrap(), vec![3.0, 30.0]);
    }

    #[test]
    fn rejects_empty_and_ragged() {
        assert_eq!(Series::univariate(vec![]), Err(ClusterError::EmptyData));
        assert_eq!(
            Series::new(vec![], ValueLayout::Column),
            Err(ClusterError::EmptyData)
        );
        assert_eq!(
            Series::new(vec![vec![1.0, 2.0], vec![1.0]], ValueLayout::Column),
            Err(ClusterError::DimensionMismatch {
                expected: 2,
                got: 1
            })
        );
        assert!(Series::new(vec![vec![1.0, 2.0], vec![1.0]], ValueLayout::Row).is_err());
    }

    #[test]
    fn rejects_non_finite() {
        assert_eq!(
            Series::univariate(vec![1.0, f64::NAN]),
            Err(ClusterError::MissingValues)
        );
        assert_eq!(
            Series::univariate(vec![f64::INFINITY]),
            Err(ClusterError::MissingValues)
        );
    }

    #[test]
    fn out_of_range_accessors_fail() {
        let s = Series::univariate(vec![1.0, 2.0]).unwrap();
        assert!(s.values(1).is_err());
        assert!(s.row(2).is_err());
    }

    #[test]
    fn norm_and_distance() {
        let a = Series::univariate(vec![3.0, 4.0]).unwrap();
        let b = Series::univariate(vec![0.0, 0.0]).unwrap();
        assert_relative_eq!(a.norm(), 5.0);
        assert_relative_eq!(a.squared_distance(&b), 25.0);
    }

    #[test]
    fn shifted_zero_fills() {
        let s = Series::univariate(vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(s.shifted(0), s);
        assert_eq!(s.shifted(1).primary_values(), &[2.0, 3.0, 4.0, 0.0]);
        assert_eq!(s.shifted(-2).primary_values(), &[0.0, 0.0, 1.0, 2.0]);
        assert_eq!(s.shifted(10).primary_values(), &[0.0; 4]);
    }

    #[test]
    fn zeros_requires_a_non_empty_shape() {
        let z = Series::zeros(4, 2).unwrap();
        assert_eq!(z.shape(), (4, 2));
        assert_relative_eq!(z.norm(), 0.0);

        assert_eq!(Series::zeros(0, 1), Err(ClusterError::EmptyData));
        assert_eq!(Series::zeros(3, 0), Err(ClusterError::EmptyData));
    }

    #[test]
    fn dataset_shape_checks_consistency() {
        let a = Series::univariate(vec![1.0, 2.0, 3.0]).unwrap();
        let b = Series::univariate(vec![1.0, 2.0]).unwrap();
        let c = Series::new(vec![vec![1.0; 3], vec![2.0; 3]], ValueLayout::Column).unwrap();

        assert_eq!(dataset_shape(&[a.clone(), a.clone()]), Ok((3, 1)));
        assert_eq!(dataset_shape(&[]), Err(ClusterError::EmptyData));
        assert!(matches!(
            dataset_shape(&[a.clone(), b]),
            Err(ClusterError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            dataset_shape(&[a, c]),
            Err(ClusterError::DimensionMismatch { .. })
        ));
    }
}
