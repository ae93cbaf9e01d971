use crate::sink::MetricsSink;
use crate::taxonomy::{ErrorReason, WorkflowOutcome};
use std::sync::Arc;
use vantage_integration::metric::{Field, Metric, Tag};

/// Typed call sites over a [`MetricsSink`] for every counter/gauge this
/// crate's callers emit. Cheap to clone (an `Arc` around the sink), so each
/// `SymbolManager`/gateway client task can hold its own copy.
#[derive(Clone)]
pub struct Counters {
    sink: Arc<dyn MetricsSink>,
}

impl std::fmt::Debug for Counters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Counters").finish_non_exhaustive()
    }
}

impl Counters {
    pub fn new(sink: Arc<dyn MetricsSink>) -> Self {
        Self { sink }
    }

    pub fn noop() -> Self {
        Self::new(Arc::new(crate::sink::NoopSink))
    }

    fn emit(&self, name: &'static str, tags: Vec<Tag>, fields: Vec<Field>) {
        self.sink.record(Metric { name, time: now_ms(), tags, fields });
    }

    /// An order placement succeeded (new open order acknowledged by the
    /// venue, including an idempotent-duplicate treated as success).
    pub fn order_placed(&self, symbol: &str) {
        self.emit("orders_placed_total", vec![Tag::new("symbol", symbol)], vec![Field::new("count", 1_i64)]);
    }

    /// An order placement failed. `reason` is the bounded error kind, never
    /// the raw venue error message.
    pub fn order_failed(&self, symbol: &str, reason: ErrorReason) {
        self.emit(
            "orders_failed_total",
            vec![Tag::new("symbol", symbol), Tag::new("reason", reason.as_str())],
            vec![Field::new("count", 1_i64)],
        );
    }

    pub fn order_cancelled(&self, symbol: &str) {
        self.emit("orders_cancelled_total", vec![Tag::new("symbol", symbol)], vec![Field::new("count", 1_i64)]);
    }

    /// Every caught error increments this counter with its bounded reason
    /// label, independent of which counter above also fired.
    pub fn error(&self, component: &'static str, reason: ErrorReason) {
        self.emit(
            "errors_total",
            vec![Tag::new("component", component), Tag::new("reason", reason.as_str())],
            vec![Field::new("count", 1_i64)],
        );
    }

    pub fn workflow_step(&self, step_name: &'static str, outcome: WorkflowOutcome) {
        self.emit(
            "workflow_steps_total",
            vec![Tag::new("step", step_name), Tag::new("outcome", outcome.as_str())],
            vec![Field::new("count", 1_i64)],
        );
    }

    pub fn breaker_transition(&self, symbol: &str, to_state: &'static str) {
        self.emit(
            "breaker_transitions_total",
            vec![Tag::new("symbol", symbol), Tag::new("state", to_state)],
            vec![Field::new("count", 1_i64)],
        );
    }

    /// Low-cardinality gauge: 1 while `SERVING`, 0 while `NOT_SERVING`.
    pub fn gateway_health(&self, serving: bool) {
        self.emit("gateway_health", vec![], vec![Field::new("serving", serving)]);
    }

    pub fn gateway_client_connected(&self, stream: &'static str, subscriber_count: i64) {
        self.emit(
            "gateway_subscribers",
            vec![Tag::new("stream", stream)],
            vec![Field::new("count", subscriber_count)],
        );
    }

    pub fn gateway_client_dropped(&self, stream: &'static str) {
        self.emit("gateway_clients_dropped_total", vec![Tag::new("stream", stream)], vec![Field::new("count", 1_i64)]);
    }

    pub fn client_reconnect_attempt(&self, attempt: u32) {
        self.emit("client_reconnect_attempts_total", vec![], vec![Field::new("attempt", i64::from(attempt))]);
    }

    pub fn symbol_routing_miss(&self) {
        self.emit("symbol_routing_misses_total", vec![], vec![Field::new("count", 1_i64)]);
    }

    pub fn exchange_rtt_ms(&self, method: &'static str, millis: u64) {
        self.emit("exchange_rtt_ms", vec![Tag::new("method", method)], vec![Field::new("millis", millis as i64)]);
    }
}

fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::VecSink;

    #[test]
    fn order_failed_carries_a_bounded_reason_tag_not_a_raw_message() {
        let sink = Arc::new(VecSink::default());
        let counters = Counters::new(sink.clone());

        counters.order_failed("BTCUSDT", ErrorReason::Deterministic);

        let metrics = sink.metrics.lock();
        let metric = metrics.first().expect("one metric recorded");
        assert_eq!(metric.name, "orders_failed_total");
        assert!(metric.tags.iter().any(|t| t.key == "reason" && t.value == "deterministic"));
    }

    #[test]
    fn noop_counters_never_panic_when_unwired() {
        let counters = Counters::noop();
        counters.order_placed("ETHUSDT");
        counters.error("engine", ErrorReason::Transient);
    }
}
