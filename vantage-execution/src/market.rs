use derive_more::Constructor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use vantage_instrument::Symbol;

/// Best bid/ask or last-trade price tick used to drive `on_price_update`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Constructor)]
pub struct PriceUpdate {
    pub symbol: Symbol,
    pub price: Decimal,
    pub timestamp_ms: i64,
}

/// One OHLCV candle.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Constructor)]
pub struct Kline {
    pub symbol: Symbol,
    pub open_time_ms: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}
