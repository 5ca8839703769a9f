use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub routes_saved_total: IntCounterVec,
    pub publish_latency_seconds: HistogramVec,
    pub stop_writes_total: IntCounterVec,
    pub audit_entries_total: IntCounter,
    pub validation_failures_total: IntCounterVec,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let routes_saved_total = IntCounterVec::new(
            Opts::new("routes_saved_total", "Routes saved by status and outcome"),
            &["status", "outcome"],
        )
        .expect("valid routes_saved_total metric");

        let publish_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "publish_latency_seconds",
                "Time to save a route and fan out its stop assignments",
            ),
            &["outcome"],
        )
        .expect("valid publish_latency_seconds metric");

        let stop_writes_total = IntCounterVec::new(
            Opts::new("stop_writes_total", "Per-stop assignment writes by outcome"),
            &["outcome"],
        )
        .expect("valid stop_writes_total metric");

        let audit_entries_total =
            IntCounter::new("audit_entries_total", "Audit entries appended during publish")
                .expect("valid audit_entries_total metric");

        let validation_failures_total = IntCounterVec::new(
            Opts::new(
                "validation_failures_total",
                "Publish validation failures by rule",
            ),
            &["rule"],
        )
        .expect("valid validation_failures_total metric");

        registry
            .register(Box::new(routes_saved_total.clone()))
            .expect("register routes_saved_total");
        registry
            .register(Box::new(publish_latency_seconds.clone()))
            .expect("register publish_latency_seconds");
        registry
            .register(Box::new(stop_writes_total.clone()))
            .expect("register stop_writes_total");
        registry
            .register(Box::new(audit_entries_total.clone()))
            .expect("register audit_entries_total");
        registry
            .register(Box::new(validation_failures_total.clone()))
            .expect("register validation_failures_total");

        Self {
            registry,
            routes_saved_total,
            publish_latency_seconds,
            stop_writes_total,
            audit_entries_total,
            validation_failures_total,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
