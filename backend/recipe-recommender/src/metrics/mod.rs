//! Recommender Metrics
//!
//! Prometheus metrics for recommendation requests and CF model maintenance

use crate::models::RecommendationSource;
use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, HistogramVec,
    IntCounter, IntCounterVec,
};
use std::time::Duration;

static REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "recipe_recommender_requests_total",
        "Total recommendation requests by source",
        &["source"]
    )
    .expect("Failed to register recommender requests metric")
});

static RESULTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "recipe_recommender_results_total",
        "Total recipes returned by source",
        &["source"]
    )
    .expect("Failed to register recommender results metric")
});

static REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "recipe_recommender_request_duration_seconds",
        "Duration of recommendation requests",
        &["source"],
        vec![0.0001, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]
    )
    .expect("Failed to register recommender duration metric")
});

static MATRIX_REBUILDS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "recipe_recommender_matrix_rebuilds_total",
        "Total user-item interaction matrix rebuilds"
    )
    .expect("Failed to register matrix rebuilds metric")
});

static SIMILARITY_COMPUTATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "recipe_recommender_similarity_computations_total",
        "Total similarity matrix computations by axis",
        &["axis"]
    )
    .expect("Failed to register similarity computations metric")
});

/// Record one finished request and the number of recipes it returned
pub fn record_request(source: RecommendationSource, results: usize, duration: Duration) {
    let label = source.as_str();
    REQUESTS_TOTAL.with_label_values(&[label]).inc();
    RESULTS_TOTAL
        .with_label_values(&[label])
        .inc_by(results as u64);
    REQUEST_DURATION_SECONDS
        .with_label_values(&[label])
        .observe(duration.as_secs_f64());
}

pub fn record_matrix_rebuild() {
    MATRIX_REBUILDS_TOTAL.inc();
}

/// Record a similarity computation (axis: user/item)
pub fn record_similarity_computation(axis: &str) {
    SIMILARITY_COMPUTATIONS_TOTAL
        .with_label_values(&[axis])
        .inc();
}
