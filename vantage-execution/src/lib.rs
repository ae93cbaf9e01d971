#![forbid(unsafe_code)]
#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    unused_qualifications
)]

//! The `Exchange` capability trait and everything it speaks in: orders and
//! their lifecycle state machine, accounts, positions, trades, funding-rate
//! readings, and the deterministic id scheme that makes order placement
//! idempotent across restarts.
//!
//! This crate knows nothing about any specific venue, the gateway transport,
//! or persistence — those live in `vantage-gateway`, `vantage-client` and
//! `vantage-engine` respectively.

pub mod account;
pub mod error;
pub mod exchange;
pub mod funding;
pub mod id;
pub mod market;
pub mod order;
pub mod position;
pub mod request;
pub mod simulated;
pub mod state;
pub mod trade;

pub use account::{Account, AssetBalance};
pub use error::{ApiError, ClientError, ConnectivityError, KeyError};
pub use exchange::Exchange;
pub use funding::FundingRate;
pub use id::{ClientOrderId, OrderId, StrategyId};
pub use market::{Kline, PriceUpdate};
pub use order::Order;
pub use position::{Position, PositionSide};
pub use request::{OrderKey, OrderRequestCancel, OrderRequestOpen, RequestCancel, RequestOpen};
pub use simulated::{SimulatedConfig, SimulatedExchange};
pub use state::{ActiveOrderState, InactiveOrderState, OrderState};
pub use trade::Trade;
