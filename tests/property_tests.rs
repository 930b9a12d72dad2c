//! Property-based tests for the shape-based distance and k-Shape fitting.
//!
//! These tests verify invariants that should hold for all valid inputs,
//! using randomly generated time series data.

use kshape_ts::clustering::{
    cross_correlation_fft, cross_correlation_naive, max_correlation, sbd_distance, Clusterer,
    KShape, KShapeConfig, FFT_CROSSOVER,
};
use kshape_ts::core::{Series, ValueLayout};
use kshape_ts::ClusterError;
use proptest::prelude::*;

fn uni(values: &[f64]) -> Series {
    Series::univariate(values.to_vec()).unwrap()
}

/// Strategy for generating series values.
/// Adds small variation to avoid all-constant series.
fn valid_values_strategy(min_len: usize, max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    (min_len..max_len).prop_flat_map(|len| {
        prop::collection::vec(-100.0..100.0_f64, len).prop_map(|mut v| {
            for (i, val) in v.iter_mut().enumerate() {
                *val += (i as f64) * 0.001;
            }
            v
        })
    })
}

/// Strategy for generating two equal-length series.
fn pair_strategy(min_len: usize, max_len: usize) -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
    (min_len..max_len).prop_flat_map(|len| {
        (
            prop::collection::vec(-100.0..100.0_f64, len),
            prop::collection::vec(-100.0..100.0_f64, len),
        )
    })
}

/// Strategy for a small dataset of equal-length series.
fn dataset_strategy() -> impl Strategy<Value = Vec<Vec<f64>>> {
    (4usize..10, 6usize..16).prop_flat_map(|(n, len)| {
        prop::collection::vec(prop::collection::vec(-10.0..10.0_f64, len), n)
    })
}

// =============================================================================
// Property: shape-based distance is a bounded dissimilarity
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn self_distance_is_zero(values in valid_values_strategy(2, 150)) {
        let s = uni(&values);
        let d = sbd_distance(&s, &s).unwrap();
        prop_assert!(d.abs() < 1e-9, "self distance {}", d);
    }

    #[test]
    fn distance_is_bounded((a, b) in pair_strategy(1, 120)) {
        let d = sbd_distance(&uni(&a), &uni(&b)).unwrap();
        prop_assert!((0.0..=2.0).contains(&d), "distance {} out of range", d);
    }

    #[test]
    fn distance_with_zero_series_is_one(values in valid_values_strategy(1, 120)) {
        let zeros = Series::zeros(values.len(), 1).unwrap();
        let d = sbd_distance(&uni(&values), &zeros).unwrap();
        prop_assert!((d - 1.0).abs() < 1e-12);
    }

    #[test]
    fn distance_is_symmetric((a, b) in pair_strategy(2, 100)) {
        let (a, b) = (uni(&a), uni(&b));
        let ab = sbd_distance(&a, &b).unwrap();
        let ba = sbd_distance(&b, &a).unwrap();
        prop_assert!((ab - ba).abs() < 1e-9, "{} vs {}", ab, ba);
    }

    #[test]
    fn distance_ignores_positive_scaling(
        values in valid_values_strategy(2, 100),
        factor in 0.01..100.0_f64
    ) {
        let s = uni(&values);
        let scaled = s.map(|x| x * factor);
        let d = sbd_distance(&s, &scaled).unwrap();
        prop_assert!(d.abs() < 1e-9);
    }

    #[test]
    fn correlation_is_bounded((a, b) in pair_strategy(1, 100)) {
        let c = max_correlation(&uni(&a), &uni(&b)).unwrap();
        prop_assert!((-1.0..=1.0).contains(&c));
    }
}

// =============================================================================
// Property: FFT and direct cross-correlation agree
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    #[test]
    fn fft_matches_naive((a, b) in pair_strategy(FFT_CROSSOVER + 1, 300)) {
        let (a, b) = (uni(&a), uni(&b));
        let fast = cross_correlation_fft(&a, &b).unwrap();
        let slow = cross_correlation_naive(&a, &b).unwrap();
        prop_assert_eq!(fast.len(), slow.len());
        for (x, y) in fast.iter().zip(slow.iter()) {
            prop_assert!((x - y).abs() < 1e-8, "{} vs {}", x, y);
        }
    }

    #[test]
    fn fft_matches_naive_multivariate(
        (a, b) in pair_strategy(FFT_CROSSOVER + 1, 200),
        (c, d) in pair_strategy(1, 2)
    ) {
        // Second feature: a scaled copy of the first plus a constant offset
        let second_a: Vec<f64> = a.iter().map(|x| 0.5 * x + c[0]).collect();
        let second_b: Vec<f64> = b.iter().map(|x| -x + d[0]).collect();
        let sa = Series::new(vec![a, second_a], ValueLayout::Column).unwrap();
        let sb = Series::new(vec![b, second_b], ValueLayout::Column).unwrap();

        let fast = cross_correlation_fft(&sa, &sb).unwrap();
        let slow = cross_correlation_naive(&sa, &sb).unwrap();
        for (x, y) in fast.iter().zip(slow.iter()) {
            prop_assert!((x - y).abs() < 1e-8, "{} vs {}", x, y);
        }
    }
}

// =============================================================================
// Property: fitting is deterministic and never leaves a cluster empty
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn fit_is_deterministic(data in dataset_strategy(), seed in 0u64..1000) {
        let series: Vec<Series> = data.iter().map(|v| uni(v)).collect();
        let config = KShapeConfig::default().n_clusters(2).n_init(2).seed(seed);

        let mut a = KShape::new(config.clone());
        let mut b = KShape::new(config);
        let ra = a.fit(&series);
        let rb = b.fit(&series);
        prop_assert_eq!(ra.is_ok(), rb.is_ok());

        if let (Some(fa), Some(fb)) = (a.fitted(), b.fitted()) {
            prop_assert_eq!(fa.labels(), fb.labels());
            prop_assert_eq!(fa.inertia().to_bits(), fb.inertia().to_bits());
        }
    }

    #[test]
    fn fit_never_returns_empty_clusters(data in dataset_strategy(), k in 2usize..4, seed in 0u64..1000) {
        let series: Vec<Series> = data.iter().map(|v| uni(v)).collect();
        let mut model = KShape::new(KShapeConfig::default().n_clusters(k).seed(seed));

        match model.fit(&series) {
            Ok(()) => {
                let fitted = model.fitted().unwrap();
                prop_assert_eq!(fitted.cluster_sizes().len(), k);
                prop_assert!(fitted.cluster_sizes().iter().all(|&n| n > 0));
                prop_assert!(fitted.inertia() >= 0.0);
            }
            Err(err) => {
                prop_assert!(matches!(err, ClusterError::NoSuccessfulInit { .. }), "{}", err);
                prop_assert!(!model.is_fitted());
            }
        }
    }

    #[test]
    fn predict_reproduces_training_labels(data in dataset_strategy(), seed in 0u64..1000) {
        let series: Vec<Series> = data.iter().map(|v| uni(v)).collect();
        let mut model = KShape::new(KShapeConfig::default().n_clusters(2).seed(seed));

        if let Ok(labels) = model.fit_predict(&series) {
            prop_assert_eq!(model.predict(&series).unwrap(), labels);
        }
    }
}
