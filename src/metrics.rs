//! Metrics collection and export module

use crate::executor::errors::ErrorCategory;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::time::{Duration, Instant};

/// Execution pipeline metrics
pub struct Metrics {
    registry: Registry,

    // Counters
    pub executions_total: IntCounter,
    pub executions_confirmed: IntCounter,
    pub executions_failed: IntCounterVec,

    // Gauges
    pub executions_in_flight: IntGauge,

    // Histograms
    pub build_latency: Histogram,
    pub execution_latency: Histogram,
}

impl Metrics {
    /// Create new metrics instance with its own registry
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let executions_total = IntCounter::with_opts(Opts::new(
            "executions_total",
            "Total number of instruction executions attempted",
        ))?;

        let executions_confirmed = IntCounter::with_opts(Opts::new(
            "executions_confirmed",
            "Number of executions confirmed on-chain",
        ))?;

        let executions_failed = IntCounterVec::new(
            Opts::new("executions_failed", "Number of failed executions by error category"),
            &["category"],
        )?;

        let executions_in_flight = IntGauge::with_opts(Opts::new(
            "executions_in_flight",
            "Number of executions currently in progress",
        ))?;

        let build_latency = Histogram::with_opts(
            HistogramOpts::new("build_latency_seconds", "Argument coercion and transaction build latency")
                .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05]),
        )?;

        let execution_latency = Histogram::with_opts(
            HistogramOpts::new("execution_latency_seconds", "End-to-end execution latency")
                .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]),
        )?;

        // Register all metrics
        registry.register(Box::new(executions_total.clone()))?;
        registry.register(Box::new(executions_confirmed.clone()))?;
        registry.register(Box::new(executions_failed.clone()))?;
        registry.register(Box::new(executions_in_flight.clone()))?;
        registry.register(Box::new(build_latency.clone()))?;
        registry.register(Box::new(execution_latency.clone()))?;

        Ok(Self {
            registry,
            executions_total,
            executions_confirmed,
            executions_failed,
            executions_in_flight,
            build_latency,
            execution_latency,
        })
    }

    /// Get the registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_started(&self) {
        self.executions_total.inc();
        self.executions_in_flight.inc();
    }

    /// Pairs with `record_started` however the attempt ends, cancellation included
    pub fn record_finished(&self) {
        self.executions_in_flight.dec();
    }

    pub fn record_confirmed(&self, latency: Duration) {
        self.executions_confirmed.inc();
        self.execution_latency.observe(latency.as_secs_f64());
    }

    pub fn record_failed(&self, category: ErrorCategory, latency: Duration) {
        self.executions_failed
            .with_label_values(&[category.as_str()])
            .inc();
        self.execution_latency.observe(latency.as_secs_f64());
    }

    pub fn failed_count(&self, category: ErrorCategory) -> u64 {
        self.executions_failed
            .with_label_values(&[category.as_str()])
            .get()
    }

    /// Render all metrics in the Prometheus text exposition format
    pub fn gather_text(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Timer helper for measuring operation duration
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    pub fn observe_duration(&self, histogram: &Histogram) {
        histogram.observe(self.start.elapsed().as_secs_f64());
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcomes_recorded() {
        let metrics = Metrics::new().unwrap();

        metrics.record_started();
        metrics.record_started();
        assert_eq!(metrics.executions_in_flight.get(), 2);

        metrics.record_confirmed(Duration::from_millis(800));
        metrics.record_finished();
        metrics.record_failed(ErrorCategory::UserCancelled, Duration::from_millis(50));
        metrics.record_finished();

        assert_eq!(metrics.executions_total.get(), 2);
        assert_eq!(metrics.executions_confirmed.get(), 1);
        assert_eq!(metrics.executions_in_flight.get(), 0);
        assert_eq!(metrics.failed_count(ErrorCategory::UserCancelled), 1);
        assert_eq!(metrics.failed_count(ErrorCategory::NetworkError), 0);
        assert_eq!(metrics.execution_latency.get_sample_count(), 2);
    }

    #[test]
    fn test_gather_text() {
        let metrics = Metrics::new().unwrap();
        metrics.record_started();
        metrics.record_failed(ErrorCategory::SimulationFailed, Duration::from_secs(1));

        let text = metrics.gather_text().unwrap();
        assert!(text.contains("executions_total 1"));
        assert!(text.contains("executions_failed{category=\"simulation_failed\"} 1"));
    }

    #[test]
    fn test_timer() {
        let metrics = Metrics::new().unwrap();
        let timer = Timer::new();
        timer.observe_duration(&metrics.build_latency);
        assert_eq!(metrics.build_latency.get_sample_count(), 1);
        assert!(timer.elapsed() >= Duration::ZERO);
    }
}
