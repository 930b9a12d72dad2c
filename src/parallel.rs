//! Conditional parallel iteration.
//!
//! With the `parallel` feature, these macros expand to rayon parallel
//! iterators; without it they fall back to sequential iteration. Both
//! variants preserve input order when collecting, so results do not depend
//! on the feature.
//!
//! ```ignore
//! use crate::parallel::iter_maybe_parallel;
//!
//! let results: Vec<_> = iter_maybe_parallel!(0..n)
//!     .map(|i| expensive_computation(i))
//!     .collect();
//! ```

/// Conditionally parallel iteration over anything `IntoIterator`.
macro_rules! iter_maybe_parallel {
    ($expr:expr) => {{
        #[cfg(feature = "parallel")]
        {
            use rayon::iter::IntoParallelIterator;

            IntoParallelIterator::into_par_iter($expr)
        }
        #[cfg(not(feature = "parallel"))]
        {
            IntoIterator::into_iter($expr)
        }
    }};
}

/// Conditionally parallel reference iteration over slices.
macro_rules! slice_maybe_parallel {
    ($expr:expr) => {{
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            $expr.par_iter()
        }
        #[cfg(not(feature = "parallel"))]
        {
            $expr.iter()
        }
    }};
}

pub(crate) use iter_maybe_parallel;
pub(crate) use slice_maybe_parallel;

#[cfg(test)]
mod tests {
    use super::{iter_maybe_parallel, slice_maybe_parallel};
    #[cfg(feature = "parallel")]
    use rayon::iter::ParallelIterator;

    #[test]
    fn range_iteration_preserves_order() {
        let doubled: Vec<usize> = iter_maybe_parallel!(0..100usize).map(|i| i * 2).collect();
        assert_eq!(doubled.len(), 100);
        assert!(doubled.iter().enumerate().all(|(i, &x)| x == i * 2));
    }

    #[test]
    fn slice_iteration_preserves_order() {
        let data = vec![1.0, 2.0, 3.0];
        let squared: Vec<f64> = slice_maybe_parallel!(data).map(|x| x * x).collect();
        assert_eq!(squared, vec![1.0, 4.0, 9.0]);
    }
}
