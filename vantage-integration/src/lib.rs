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

//! Low-level, venue-agnostic plumbing shared by every Vantage crate: channels,
//! value snapshots, the low-cardinality metric vocabulary, token-bucket rate
//! limiting and small collection helpers.
//!
//! None of this crate knows about orders, symbols or venues - those concepts
//! live in [`vantage_instrument`] and [`vantage_execution`].

/// [`Tx`](channel::Tx) trait and bounded/unbounded channel wrappers used for
/// every inter-task communication path (gateway fan-out, orchestrator
/// dispatch, workflow step queues).
pub mod channel;

/// Small `OneOrMany`/`NoneOneOrMany` collections and `Fnv`-hashed index maps.
pub mod collection;

/// Transport-level error type shared by [`vantage_gateway`] and
/// [`vantage_client`].
pub mod error;

/// Low-cardinality [`Metric`](metric::Metric) vocabulary.
pub mod metric;

/// Token-bucket [`RateLimiter`](rate_limit::RateLimiter) for outgoing venue
/// calls.
pub mod rate_limit;

/// [`Snapshot`](snapshot::Snapshot) value-copy wrapper for monitoring/UI
/// consumers that must never hold a component's internal lock.
pub mod snapshot;

pub use error::TransportError;
pub use snapshot::Snapshot;

/// Determines if something (typically an error) is considered unrecoverable
/// for the channel or task it surfaced on. A [`channel::Tx::Error`] that is
/// unrecoverable means the receiver is gone and the sender should stop
/// trying rather than retry.
pub trait Unrecoverable {
    fn is_unrecoverable(&self) -> bool;
}
