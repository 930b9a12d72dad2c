//! Time Series Clustering Example
//!
//! This example demonstrates shape-based distance, k-Shape clustering and a
//! DTW k-means baseline on synthetic series.
//!
//! Run with: cargo run --example time_series_clustering

use kshape_ts::clustering::{
    best_shift, dtw_distance, euclidean_distance, sbd_distance, silhouette_score, Clusterer,
    DistanceMetric, KMeansConfig, KShape, KShapeConfig, ShapeBased, TimeSeriesKMeans,
};
use kshape_ts::core::Series;

fn bump(len: usize, center: f64, width: f64, amplitude: f64) -> Vec<f64> {
    (0..len)
        .map(|t| {
            let x = (t as f64 - center) / width;
            amplitude * (-x * x).exp()
        })
        .collect()
}

fn square(len: usize, start: usize, stop: usize) -> Vec<f64> {
    (0..len)
        .map(|t| if (start..stop).contains(&t) { 1.0 } else { 0.0 })
        .collect()
}

fn main() {
    println!("=== Time Series Clustering Example ===\n");

    // =========================================================================
    // Shape-Based Distance
    // =========================================================================
    println!("--- Shape-Based Distance (SBD) ---\n");

    let a = Series::univariate(bump(32, 10.0, 3.0, 1.0)).unwrap();
    let b = Series::univariate(bump(32, 16.0, 3.0, 5.0)).unwrap();
    let c = Series::univariate(square(32, 8, 20)).unwrap();

    println!("A: bump at t=10");
    println!("B: bump at t=16, five times taller");
    println!("C: square pulse");
    println!();

    println!("SBD distances:");
    println!("  sbd(A, B) = {:.4}", sbd_distance(&a, &b).unwrap());
    println!("  sbd(A, C) = {:.4}", sbd_distance(&a, &c).unwrap());
    println!("  best shift aligning B on A: {}", best_shift(&a, &b).unwrap());

    println!("\nFor comparison:");
    println!("  euclidean(A, B) = {:.4}", euclidean_distance(&a, &b));
    println!("  dtw(A, B)       = {:.4}", dtw_distance(&a, &b));

    // =========================================================================
    // k-Shape Clustering
    // =========================================================================
    println!("\n--- k-Shape Clustering ---\n");

    let mut data = Vec::new();
    for i in 0..5 {
        data.push(Series::univariate(bump(48, 12.0 + 3.0 * i as f64, 3.0, 1.0 + i as f64)).unwrap());
    }
    for i in 0..5 {
        data.push(Series::univariate(square(48, 5 + 4 * i, 20 + 4 * i)).unwrap());
    }

    let mut model = KShape::new(KShapeConfig::default().n_clusters(2).n_init(5).seed(42));
    match model.fit_predict(&data) {
        Ok(labels) => {
            println!("Labels: {:?}", labels);
            if let Some(fitted) = model.fitted() {
                println!("Inertia: {:.4}", fitted.inertia());
                println!("Iterations: {}", fitted.n_iter());
                println!(
                    "Attempts: {} ({} successful, best #{})",
                    fitted.n_attempts(),
                    fitted.n_successful(),
                    fitted.best_attempt()
                );
                println!("Cluster sizes: {:?}", fitted.cluster_sizes());
            }
            match silhouette_score(&data, &labels, &ShapeBased) {
                Ok(score) => println!("Silhouette (SBD): {:.4}", score),
                Err(e) => println!("Silhouette unavailable: {}", e),
            }
        }
        Err(e) => println!("k-Shape failed: {}", e),
    }

    // Predict new series
    let unseen = vec![
        Series::univariate(bump(48, 30.0, 3.0, 2.0)).unwrap(),
        Series::univariate(square(48, 2, 17)).unwrap(),
    ];
    match model.predict(&unseen) {
        Ok(labels) => println!("Predicted labels for unseen series: {:?}", labels),
        Err(e) => println!("Prediction failed: {}", e),
    }

    // =========================================================================
    // DTW k-means baseline
    // =========================================================================
    println!("\n--- DTW k-means ---\n");

    let config = KMeansConfig::default()
        .n_clusters(2)
        .n_init(5)
        .metric(DistanceMetric::Dtw { window: Some(8) })
        .seed(42);
    let mut kmeans = TimeSeriesKMeans::new(config);
    match kmeans.fit_predict(&data) {
        Ok(labels) => {
            println!("Labels: {:?}", labels);
            if let Some(fitted) = kmeans.fitted() {
                println!("Inertia: {:.4}", fitted.inertia());
            }
        }
        Err(e) => println!("k-means failed: {}", e),
    }

    println!("\n=== Example Complete ===");
}
