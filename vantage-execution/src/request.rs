use crate::{
    id::{ClientOrderId, OrderId, StrategyId},
    state::Cancelled,
};
use derive_more::Constructor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use vantage_instrument::{exchange::ExchangeId, OrderType, Side, Symbol, TimeInForce};

/// Uniquely identifies an order across every retry: unlike [`OrderId`] this
/// is known before the venue has accepted the order.
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Constructor,
)]
pub struct OrderKey {
    pub exchange: ExchangeId,
    pub symbol: Symbol,
    pub strategy: StrategyId,
    pub cid: ClientOrderId,
}

#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Constructor,
)]
pub struct RequestOpen {
    pub side: Side,
    pub price: Decimal,
    pub quantity: Decimal,
    pub kind: OrderType,
    pub time_in_force: TimeInForce,
    /// Reduce-only orders may only decrease an existing position.
    pub reduce_only: bool,
    /// Routes a spot order to the venue's margin endpoints (funding-arb short legs).
    pub use_margin: bool,
}

#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default, Deserialize, Serialize, Constructor,
)]
pub struct RequestCancel {
    /// `None` when only the `client_order_id` in the enclosing [`OrderKey`]
    /// is known (cancel sent before the placement ack arrived).
    pub id: Option<OrderId>,
}

#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Constructor)]
pub struct OrderRequestOpen {
    pub key: OrderKey,
    pub state: RequestOpen,
}

#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Constructor)]
pub struct OrderRequestCancel {
    pub key: OrderKey,
    pub state: RequestCancel,
}

/// Outcome of a cancel request: either the order is confirmed cancelled or
/// the venue/transport rejected the request.
pub type OrderResponseCancel = (OrderKey, Result<Cancelled, crate::error::ApiError>);
