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

//! Vantage: a sharded, durable crypto market-making and funding-arbitrage
//! orchestrator.
//!
//! This crate is the thin top-level binary crate: it wires the `vantage-*`
//! library crates into two processes — `gateway` (owns venue credentials,
//! runs [`vantage_gateway::GatewayService`]) and `trader` (runs the
//! [`vantage_engine::Orchestrator`] and
//! [`vantage_client::RemoteExchangeClient`]) — plus the shared
//! configuration shapes and process-startup plumbing (logging, shutdown
//! signal handling) both binaries need.
//!
//! [`config`] holds the `serde`-deserialisable config structs (actual
//! file/env/CLI loading is out of scope); [`logging`] initialises
//! `tracing`/`tracing-subscriber`; [`shutdown`] exposes the signal-driven
//! termination future and the process exit codes.

pub mod config;
pub mod logging;
pub mod shutdown;

pub mod prelude {
    pub use crate::config::{default_grid_config, default_risk_config, GatewayConfig, OrchestratorConfig};
    pub use crate::logging::init_logging;
    pub use crate::shutdown::{wait_for_shutdown_signal, EXIT_FATAL_INTERNAL, EXIT_FATAL_STARTUP, EXIT_OK};
}
