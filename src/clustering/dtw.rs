//! Dynamic Time Warping (DTW) and Euclidean distances between series.
//!
//! The local cost between two time steps is the Euclidean distance between
//! their feature vectors, so univariate DTW accumulates `|a[i] - b[j]|`.

use crate::core::Series;
use crate::parallel::iter_maybe_parallel;
#[cfg(feature = "parallel")]
use rayon::iter::ParallelIterator;

/// Euclidean distance between the feature vectors at `a[i]` and `b[j]`.
fn local_cost(a: &Series, i: usize, b: &Series, j: usize) -> f64 {
    a.columns()
        .iter()
        .zip(b.columns().iter())
        .map(|(ca, cb)| (ca[i] - cb[j]).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Accumulated cost matrix of size `(n + 1) × (m + 1)`.
///
/// Cells outside the Sakoe-Chiba band stay infinite.
fn accumulated_cost(a: &Series, b: &Series, window: Option<usize>) -> Vec<Vec<f64>> {
    let n = a.len();
    let m = b.len();
    // Ensure window is at least |n - m| so the end cell stays reachable
    let window = window.map(|w| w.max(n.abs_diff(m)));

    let mut dtw = vec![vec![f64::INFINITY; m + 1]; n + 1];
    dtw[0][0] = 0.0;

    for i in 1..=n {
        let (j_start, j_end) = match window {
            Some(w) => (1.max(i.saturating_sub(w)), m.min(i + w)),
            None => (1, m),
        };
        for j in j_start..=j_end {
            let cost = local_cost(a, i - 1, b, j - 1);
            dtw[i][j] = cost + dtw[i - 1][j].min(dtw[i][j - 1]).min(dtw[i - 1][j - 1]);
        }
    }

    dtw
}

/// Compute the Dynamic Time Warping distance between two series.
///
/// Series may differ in length but not in feature dimension.
///
/// # Returns
/// DTW distance (lower is more similar); infinite for mismatched features
pub fn dtw_distance(a: &Series, b: &Series) -> f64 {
    if a.dimensions() != b.dimensions() {
        return f64::INFINITY;
    }
    accumulated_cost(a, b, None)[a.len()][b.len()]
}

/// Compute DTW distance with a Sakoe-Chiba band constraint.
///
/// The band limits warping to within `window` positions of the diagonal.
pub fn dtw_distance_windowed(a: &Series, b: &Series, window: usize) -> f64 {
    if a.dimensions() != b.dimensions() {
        return f64::INFINITY;
    }
    accumulated_cost(a, b, Some(window))[a.len()][b.len()]
}

/// Compute the DTW alignment path.
///
/// Returns pairs of indices (i, j) showing how time steps are aligned.
pub fn dtw_path(a: &Series, b: &Series) -> Vec<(usize, usize)> {
    if a.dimensions() != b.dimensions() {
        return Vec::new();
    }
    let dtw = accumulated_cost(a, b, None);

    let mut path = Vec::new();
    let mut i = a.len();
    let mut j = b.len();

    while i > 0 && j > 0 {
        path.push((i - 1, j - 1));

        let diag = dtw[i - 1][j - 1];
        let left = dtw[i][j - 1];
        let up = dtw[i - 1][j];

        if diag <= left && diag <= up {
            i -= 1;
            j -= 1;
        } else if left < up {
            j -= 1;
        } else {
            i -= 1;
        }
    }

    path.reverse();
    path
}

/// Compute the pairwise DTW distance matrix.
///
/// # Returns
/// Symmetric `n × n` matrix with a zero diagonal
pub fn dtw_pairwise(series: &[Series]) -> Vec<Vec<f64>> {
    let n = series.len();
    let upper: Vec<Vec<f64>> = iter_maybe_parallel!(0..n)
        .map(|i| {
            ((i + 1)..n)
                .map(|j| dtw_distance(&series[i], &series[j]))
                .collect::<Vec<f64>>()
        })
        .collect();

    let mut dist_matrix = vec![vec![0.0; n]; n];
    for (i, row) in upper.iter().enumerate() {
        for (offset, &d) in row.iter().enumerate() {
            let j = i + 1 + offset;
            dist_matrix[i][j] = d;
            dist_matrix[j][i] = d;
        }
    }
    dist_matrix
}

/// Euclidean distance for same-shape series.
///
/// Infinite when lengths or features differ.
pub fn euclidean_distance(a: &Series, b: &Series) -> f64 {
    if a.shape() != b.shape() {
        return f64::INFINITY;
    }
    a.squared_distance(b).sqrt()
}
