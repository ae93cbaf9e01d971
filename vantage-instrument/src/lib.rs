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

//! Core Symbol, Exchange and wire-enum data structures shared by every Vantage
//! crate.
//!
//! Unlike a general multi-asset instrument model, Vantage treats a traded pair
//! as a flat [`Symbol`] (base/quote, decimals, min qty) rather than a generic
//! `Instrument<ExchangeKey, AssetKey>` graph: every venue this system talks to
//! is a spot or linear-perpetual market, never an options chain or dated
//! future, so the extra generality is not load bearing here.

/// Venue identity ([`exchange::ExchangeId`]) and per-venue indexing.
pub mod exchange;

/// [`Symbol`](symbol::Symbol) and [`SymbolInfo`](symbol::SymbolInfo), plus
/// the wire enums (`Side`, `OrderStatus`, `OrderType`, `TimeInForce`) shared
/// across the execution, risk and strategy layers.
pub mod symbol;

pub use exchange::ExchangeId;
pub use symbol::{OrderStatus, OrderType, Side, Symbol, SymbolInfo, TimeInForce};
