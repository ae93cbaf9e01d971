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

//! The exchange gateway: a standalone process that owns one live venue
//! connection and exposes it to many trading clients over a streaming RPC
//! facade.
//!
//! This crate defines the transport-agnostic [`GatewayTransport`] seam and
//! the [`GatewayService`] that fans a single venue's streams out to
//! non-blocking per-client queues, plus the one concrete transport this repo
//! ships: [`ChannelTransport`], an in-process `tokio::mpsc`-backed channel.
//! `vantage-client` is the only other crate that depends on
//! [`GatewayTransport`]; production deployments would add a
//! `tonic::transport`-backed implementation once a protobuf schema exists.

mod channel_transport;
mod error;
mod fanout;
mod health;
mod service;
mod status;
mod transport;

pub use channel_transport::ChannelTransport;
pub use error::GatewayError;
pub use health::{HealthState, HealthStatus};
pub use service::{GatewayService, ShutdownHandle, DEFAULT_CLIENT_QUEUE_CAPACITY};
pub use transport::{EventStream, GatewayEvent, GatewayRequest, GatewayResponse, GatewayTransport, SubscribeRequest};
