use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::info;
use std::sync::Arc;
use tokio::sync::OnceCell;


// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE.get_or_init(|| async {
        info!("Initializing Metrics ...");
        Metrics::new()}
    ).await
}

/// Text exposition of every client metric.
pub async fn render() -> String {
    let encoder = TextEncoder::new();
    let metric_families = get_metrics().await.registry.gather();
    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => String::from_utf8_lossy(&buffer).into_owned(),
        Err(e) => format!("# failed to encode metrics: {e}\n"),
    }
}


#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Request metrics
    pub http_requests: IntCounterVec,
    pub http_request_retries: IntCounterVec,
    pub http_request_duration: HistogramVec,

    // Token metrics
    pub token_acquisitions: IntCounterVec,
    pub token_cache_hits: IntCounter,

    // Config
    pub config_validation_errors: IntCounter,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("omnia_timeseries".into()), None).unwrap();

        let metrics: Arc<Metrics> = Arc::new(Self {
            // Requests
            http_requests: IntCounterVec::new(Opts::new("http_requests_total", "HTTP attempts by method and response status"),&["method", "status"],).unwrap(),
            http_request_retries: IntCounterVec::new(Opts::new("http_request_retries_total", "Retried attempts by reason"),&["reason"],).unwrap(),
            http_request_duration: HistogramVec::new(HistogramOpts::new("http_request_duration_seconds", "Whole request duration including retries").buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),&["method"],).unwrap(),

            // Tokens
            token_acquisitions: IntCounterVec::new(Opts::new("token_acquisitions_total", "Token acquisitions from the identity backend"),&["credential", "outcome"],).unwrap(),
            token_cache_hits: IntCounter::new("token_cache_hits_total", "Token requests served from cache").unwrap(),

            config_validation_errors: IntCounter::new("config_validation_errors_total","Issues found while validating configuration",).unwrap(),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.http_requests.clone())).unwrap();
        reg.register(Box::new(metrics.http_request_retries.clone())).unwrap();
        reg.register(Box::new(metrics.http_request_duration.clone())).unwrap();
        reg.register(Box::new(metrics.token_acquisitions.clone())).unwrap();
        reg.register(Box::new(metrics.token_cache_hits.clone())).unwrap();
        reg.register(Box::new(metrics.config_validation_errors.clone())).unwrap();

        metrics
    }
}
