use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialise default non-JSON Vantage logging: `RUST_LOG`-driven level
/// filter, defaulting to `INFO` when unset, human-readable `fmt` layer.
///
/// Configuration/CLI-flag parsing is out of scope; this only wires the
/// `tracing`/`tracing-subscriber` stack every binary uses.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer())
        .init()
}
