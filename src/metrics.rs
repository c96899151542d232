use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, Encoder, HistogramVec,
    IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    // Session lifecycle
    pub static ref SESSIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "assessment_sessions_total",
        "Total number of assessment sessions",
        &["status"]
    )
    .unwrap();

    pub static ref SESSIONS_ACTIVE: IntGauge = register_int_gauge!(
        "assessment_sessions_active",
        "Number of currently active assessment sessions"
    )
    .unwrap();

    pub static ref SUBMISSIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "assessment_submissions_total",
        "Total number of submitted attempts",
        &["reason"]
    )
    .unwrap();

    // Integrity
    pub static ref VIOLATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "integrity_violations_total",
        "Total number of integrity violations recorded",
        &["violation_type"]
    )
    .unwrap();

    // Persistence
    pub static ref PROGRESS_SAVES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "progress_saves_total",
        "Total number of progress save attempts",
        &["status"]
    )
    .unwrap();

    pub static ref STORE_OPERATION_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "store_operation_duration_seconds",
        "Attempt store operation duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    )
    .unwrap();
}

/// Renders all metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e)))
}

/// Helper: time an attempt-store operation and record its duration
pub async fn track_store_operation<F, T, E>(operation: &str, future: F) -> Result<T, E>
where
    F: std::future::Future<Output = Result<T, E>>,
{
    let start = std::time::Instant::now();
    let result = future.await;

    STORE_OPERATION_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(start.elapsed().as_secs_f64());

    result
}
