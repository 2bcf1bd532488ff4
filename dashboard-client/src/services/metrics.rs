use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Client-side request and renewal counters.
///
/// Each `ApiClient` owns its own registry so independent clients (and tests)
/// never share counts.
pub struct ClientMetrics {
    registry: Registry,
    requests_total: IntCounterVec,
    request_duration_seconds: HistogramVec,
    renewals_total: IntCounterVec,
}

impl ClientMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("api_client_requests_total", "Total number of API requests sent"),
            &["method", "status"],
        )
        .expect("metric can be created");

        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "api_client_request_duration_seconds",
                "API request duration in seconds",
            ),
            &["method"],
        )
        .expect("metric can be created");

        let renewals_total = IntCounterVec::new(
            Opts::new(
                "api_client_token_renewals_total",
                "Access token renewal exchanges by outcome",
            ),
            &["outcome"],
        )
        .expect("metric can be created");

        registry
            .register(Box::new(requests_total.clone()))
            .expect("collector can be registered");
        registry
            .register(Box::new(request_duration_seconds.clone()))
            .expect("collector can be registered");
        registry
            .register(Box::new(renewals_total.clone()))
            .expect("collector can be registered");

        Self {
            registry,
            requests_total,
            request_duration_seconds,
            renewals_total,
        }
    }

    pub fn observe_request(&self, method: &str, status: &str, seconds: f64) {
        self.requests_total
            .with_label_values(&[method, status])
            .inc();
        self.request_duration_seconds
            .with_label_values(&[method])
            .observe(seconds);
    }

    pub fn record_renewal(&self, outcome: &str) {
        self.renewals_total.with_label_values(&[outcome]).inc();
    }

    /// Number of refresh exchanges that reached the server with `outcome`.
    pub fn renewals(&self, outcome: &str) -> u64 {
        self.renewals_total.with_label_values(&[outcome]).get()
    }

    /// Prometheus text exposition of every metric in this registry.
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::error!(error = %e, "Failed to encode client metrics");
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl Default for ClientMetrics {
    fn default() -> Self {
        Self::new()
    }
}
