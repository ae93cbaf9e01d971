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

//! The remote exchange client: the [`vantage_execution::exchange::Exchange`]
//! implementation that talks to a [`vantage_gateway::GatewayTransport`]
//! instead of a venue directly. Connects with bounded exponential backoff,
//! fails fast past the attempt cap, and spawns one forwarding task per
//! stream subscription that tears down promptly when the caller drops it.

mod client;
mod connect;
mod forward;
mod status;

pub use client::RemoteExchangeClient;
pub use connect::ConnectConfig;
