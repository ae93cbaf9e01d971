use crate::id::{ClientOrderId, OrderId};
use chrono::{DateTime, Utc};
use derive_more::Constructor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use vantage_instrument::{Side, Symbol};

/// A single fill, emitted by the order stream alongside status transitions.
///
/// Consumed by the risk layer's drawdown and consecutive-loss trackers.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Constructor)]
pub struct Trade {
    pub trade_id: SmolStr,
    pub order_id: OrderId,
    pub client_order_id: ClientOrderId,
    pub symbol: Symbol,
    pub side: Side,
    pub price: Decimal,
    pub quantity: Decimal,
    pub fee: Decimal,
    pub fee_asset: SmolStr,
    pub time_exchange: DateTime<Utc>,
}
