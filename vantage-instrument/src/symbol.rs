use derive_more::{Constructor, Display};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Trading pair identifier, e.g. `BTCUSDT`.
///
/// Stored as a [`SmolStr`] so routing keys (registry lookups, channel tags,
/// metric labels) clone cheaply without heap allocation for the common case.
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Display, Deserialize, Serialize, Constructor,
)]
pub struct Symbol(pub SmolStr);

impl Symbol {
    pub fn new(value: impl Into<SmolStr>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Self(SmolStr::new(value))
    }
}

/// Immutable venue metadata for a [`Symbol`], fetched once on startup.
///
/// `price_decimals`/`qty_decimals` are the scale venue order books are quoted
/// at; `min_qty` is the smallest order size the venue accepts; `multiplier`
/// converts contract quantity to underlying notional (1 for spot).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Constructor)]
pub struct SymbolInfo {
    pub symbol: Symbol,
    pub base: SmolStr,
    pub quote: SmolStr,
    pub price_decimals: u32,
    pub qty_decimals: u32,
    pub min_qty: Decimal,
    pub multiplier: Decimal,
}

impl SymbolInfo {
    /// Round a price to this symbol's declared price precision.
    pub fn round_price(&self, price: Decimal) -> Decimal {
        price.round_dp(self.price_decimals)
    }

    /// Round a quantity to this symbol's declared quantity precision.
    pub fn round_qty(&self, qty: Decimal) -> Decimal {
        qty.round_dp(self.qty_decimals)
    }
}

/// Order side.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Display, Deserialize, Serialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Opposite side, used when unwinding or hedging a leg.
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Stable single-character code used as an input to deterministic
    /// `client_order_id` derivation.
    pub fn code(self) -> u8 {
        match self {
            Side::Buy => b'B',
            Side::Sell => b'S',
        }
    }
}

/// Order type.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Display, Deserialize, Serialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Limit,
    Market,
    PostOnly,
}

/// Time-in-force.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Display, Deserialize, Serialize,
)]
pub enum TimeInForce {
    #[serde(rename = "GTC")]
    GoodUntilCancelled,
    #[serde(rename = "IOC")]
    ImmediateOrCancel,
    #[serde(rename = "FOK")]
    FillOrKill,
}

/// Venue order status.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Display, Deserialize, Serialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
    Expired,
}

impl OrderStatus {
    /// An order in a terminal status will never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Canceled | OrderStatus::Rejected | OrderStatus::Expired
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_opposite_round_trips() {
        assert_eq!(Side::Buy.opposite().opposite(), Side::Buy);
    }

    #[test]
    fn order_status_terminal() {
        assert!(OrderStatus::Filled.is_terminal());
        assert!(!OrderStatus::New.is_terminal());
        assert!(!OrderStatus::PartiallyFilled.is_terminal());
    }

    #[test]
    fn order_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::PartiallyFilled).unwrap(),
            "\"PARTIALLY_FILLED\""
        );
    }

    #[test]
    fn time_in_force_wire_format() {
        assert_eq!(
            serde_json::to_string(&TimeInForce::GoodUntilCancelled).unwrap(),
            "\"GTC\""
        );
    }
}
