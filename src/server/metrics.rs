use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, Gauge, Histogram, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all listings import metrics
const PREFIX: &str = "listings_import";

lazy_static! {
    // Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Import Job Metrics
    pub static ref JOBS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_jobs_total"), "Import jobs by terminal state"),
        &["state"]
    ).expect("Failed to create jobs_total metric");

    pub static ref JOBS_ACTIVE: Gauge = Gauge::new(
        format!("{PREFIX}_jobs_active"),
        "Number of import jobs currently running"
    ).expect("Failed to create jobs_active metric");

    pub static ref JOB_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            format!("{PREFIX}_job_duration_seconds"),
            "Import job duration in seconds"
        )
        .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0])
    ).expect("Failed to create job_duration_seconds metric");

    pub static ref LISTINGS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_listings_total"), "Listings handled by import jobs"),
        &["outcome"]
    ).expect("Failed to create listings_total metric");

    pub static ref MEDIA_DOWNLOADS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_media_downloads_total"), "Listing photo downloads"),
        &["outcome"]
    ).expect("Failed to create media_downloads_total metric");

    // System Metrics
    pub static ref PROCESS_MEMORY_BYTES: Gauge = Gauge::new(
        format!("{PREFIX}_process_memory_bytes"),
        "Process resident memory in bytes"
    ).expect("Failed to create process_memory_bytes metric");
}

/// Initialize the metrics system
pub fn init_metrics() {
    // Register all metrics - ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(JOBS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(JOBS_ACTIVE.clone()));
    let _ = REGISTRY.register(Box::new(JOB_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(LISTINGS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(MEDIA_DOWNLOADS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PROCESS_MEMORY_BYTES.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

pub fn record_import_job_started() {
    JOBS_ACTIVE.inc();
}

/// Record a job reaching its terminal state
pub fn record_import_job_finished(state: &str, duration: Duration) {
    JOBS_ACTIVE.dec();
    JOBS_TOTAL.with_label_values(&[state]).inc();
    JOB_DURATION_SECONDS.observe(duration.as_secs_f64());
}

pub fn record_listing_outcome(outcome: &str) {
    LISTINGS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_media_download(outcome: &str) {
    MEDIA_DOWNLOADS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Update process memory usage
pub fn update_memory_usage() {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            let rss_kb = status
                .lines()
                .find(|line| line.starts_with("VmRSS:"))
                .and_then(|line| line.split_whitespace().nth(1))
                .and_then(|kb| kb.parse::<f64>().ok());
            if let Some(kb) = rss_kb {
                PROCESS_MEMORY_BYTES.set(kb * 1024.0);
            }
        }
    }
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    update_memory_usage();

    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_default();
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
