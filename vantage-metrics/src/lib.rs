#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms,
    rust_2024_compatibility
)]

//! Typed counters/gauges/histograms over the error taxonomy and workflow
//! lifecycle, built on [`vantage_integration::metric`]'s low-cardinality
//! [`Metric`](vantage_integration::metric::Metric) vocabulary.
//!
//! A concrete exporter (Prometheus, statsd, ...) is out of scope; this
//! crate only defines the injection seam ([`MetricsSink`]) and the typed
//! call sites that prevent a careless caller from registering an
//! unbounded-cardinality label (e.g. a raw order id) at a metric site.

mod sink;
mod taxonomy;

pub mod counters;

pub use sink::{MetricsSink, NoopSink, TracingSink, VecSink};
pub use taxonomy::{ErrorReason, WorkflowOutcome};

pub use counters::Counters;
