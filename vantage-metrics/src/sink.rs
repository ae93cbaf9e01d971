use parking_lot::Mutex;
use vantage_integration::metric::Metric;

/// Injection seam every metrics-emitting component depends on, rather than
/// on a concrete exporter. Mirrors [`vantage_risk::RiskAlertHook`]'s shape:
/// a single synchronous callback, no async, no buffering contract implied.
pub trait MetricsSink: Send + Sync {
    fn record(&self, metric: Metric);
}

/// Discards every metric. Default for components under test that don't
/// assert on metrics.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl MetricsSink for NoopSink {
    fn record(&self, _metric: Metric) {}
}

/// Logs every recorded [`Metric`] as a `tracing` event at `debug` level.
/// The default sink for the `gateway`/`trader` binaries: a real exporter
/// (Prometheus, statsd, ...) is out of scope, but a metric nobody can see
/// is as good as no metric, so this keeps every call site's output visible
/// in the same structured-logging stream the rest of the process uses.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl MetricsSink for TracingSink {
    fn record(&self, metric: Metric) {
        tracing::debug!(
            metric = metric.name,
            time = metric.time,
            tags = ?metric.tags,
            fields = ?metric.fields,
            "metric"
        );
    }
}

/// Collects every recorded [`Metric`] for test assertions.
#[derive(Debug, Default)]
pub struct VecSink {
    pub metrics: Mutex<Vec<Metric>>,
}

impl MetricsSink for VecSink {
    fn record(&self, metric: Metric) {
        self.metrics.lock().push(metric);
    }
}

impl VecSink {
    pub fn len(&self) -> usize {
        self.metrics.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.metrics.lock().iter().map(|m| m.name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vantage_integration::metric::Metric;

    #[test]
    fn vec_sink_accumulates_every_recorded_metric() {
        let sink = VecSink::default();
        sink.record(Metric { name: "a", time: 0, tags: vec![], fields: vec![] });
        sink.record(Metric { name: "b", time: 0, tags: vec![], fields: vec![] });
        assert_eq!(sink.names(), vec!["a", "b"]);
    }
}
