//! Prometheus metrics for the fault pipeline.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

/// Kind of injected fault, used as the `type` label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultType {
    Delay,
    HttpError,
    CpuStress,
    MemoryStress,
}

impl FaultType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delay => "delay",
            Self::HttpError => "http_error",
            Self::CpuStress => "cpu_stress",
            Self::MemoryStress => "memory_stress",
        }
    }
}

/// Metrics registry for one server instance.
pub struct MockMetrics {
    registry: Registry,
    faults_injected: IntCounterVec,
    inflight_requests: IntGauge,
    response_duration: HistogramVec,
}

impl MockMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let faults_injected = IntCounterVec::new(
            Opts::new(
                "mock_faults_injected_total",
                "Total number of simulated faults injected, labeled by type (delay, http_error, cpu_stress).",
            ),
            &["type", "path"],
        )
        .expect("valid fault counter definition");

        let inflight_requests = IntGauge::new(
            "mock_inflight_requests",
            "Current number of requests being processed by the server.",
        )
        .expect("valid inflight gauge definition");

        let response_duration = HistogramVec::new(
            HistogramOpts::new(
                "mock_response_duration_seconds",
                "Histogram of response latency (including injected delay) for HTTP requests.",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0,
            ]),
            &["path", "method", "status"],
        )
        .expect("valid latency histogram definition");

        registry
            .register(Box::new(faults_injected.clone()))
            .expect("fault counter registers once");
        registry
            .register(Box::new(inflight_requests.clone()))
            .expect("inflight gauge registers once");
        registry
            .register(Box::new(response_duration.clone()))
            .expect("latency histogram registers once");

        Self {
            registry,
            faults_injected,
            inflight_requests,
            response_duration,
        }
    }

    /// Count one injected fault.
    pub fn record_fault(&self, fault: FaultType, path: &str) {
        self.faults_injected
            .with_label_values(&[fault.as_str(), path])
            .inc();
    }

    /// Read back a fault count, mainly for tests.
    pub fn fault_count(&self, fault: FaultType, path: &str) -> u64 {
        self.faults_injected
            .with_label_values(&[fault.as_str(), path])
            .get()
    }

    pub fn inc_inflight(&self) {
        self.inflight_requests.inc();
    }

    pub fn dec_inflight(&self) {
        self.inflight_requests.dec();
    }

    /// Observe one completed request.
    pub fn observe_duration(&self, path: &str, method: &str, status: u16, seconds: f64) {
        self.response_duration
            .with_label_values(&[path, method, &status.to_string()])
            .observe(seconds);
    }

    /// Reset the fault counter only; gauges and histograms keep running.
    pub fn reset_faults(&self) {
        self.faults_injected.reset();
    }

    /// Render the registry in Prometheus text exposition format.
    pub fn export(&self) -> String {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .expect("metrics encode to an in-memory buffer");
        String::from_utf8(buffer).expect("prometheus exposition is UTF-8")
    }
}

impl Default for MockMetrics {
    fn default() -> Self {
        Self::new()
    }
}
