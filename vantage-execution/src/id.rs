use derive_more::Display;
use rand::prelude::IndexedRandom;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use smol_str::SmolStr;
use vantage_instrument::Side;

/// Local, deterministic order identifier.
///
/// `client_order_id = H(strategy_id, price_ticks, side_code)` is stable
/// across restarts for the same grid level: re-placing after a crash
/// reproduces the same id, so the venue's duplicate-id response can be
/// treated as confirmation rather than an error.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display)]
pub struct ClientOrderId(pub SmolStr);

impl ClientOrderId {
    /// Construct a `ClientOrderId` from the specified string.
    pub fn new<S: Into<SmolStr>>(id: S) -> Self {
        Self(id.into())
    }

    /// Derive the deterministic id for a grid level or arb leg.
    ///
    /// `price_ticks` is the price expressed as an integer multiple of the
    /// symbol's tick size, so that two price updates that round to the same
    /// level collide on the same id.
    pub fn deterministic(strategy: &StrategyId, price_ticks: i64, side: Side) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(strategy.0.as_bytes());
        hasher.update(price_ticks.to_le_bytes());
        hasher.update([side.code()]);
        let digest = hasher.finalize();

        // 16 hex chars (8 bytes of digest) fit SmolStr's 23 byte inline buffer.
        Self(SmolStr::new(hex::encode(&digest[..8])))
    }

    /// A random stack-allocated id, for requests that have no notion of a
    /// stable grid level (e.g. ad-hoc manual orders).
    pub fn random() -> Self {
        const SYMBOLS: [char; 62] = [
            '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g',
            'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x',
            'y', 'z', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O',
            'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z',
        ];
        const LEN: usize = 20;

        let mut rng = rand::rng();
        let raw: [u8; LEN] = std::array::from_fn(|_| {
            *SYMBOLS.choose(&mut rng).expect("SYMBOLS is not empty") as u8
        });
        let s = std::str::from_utf8(&raw).expect("SYMBOLS are valid utf8");

        Self(SmolStr::new_inline(s))
    }
}

impl Default for ClientOrderId {
    fn default() -> Self {
        Self::random()
    }
}

/// Venue-assigned order identifier, carried alongside [`ClientOrderId`] but
/// never used for slot routing (some venues reuse ids across accounts or
/// return them late).
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
pub struct OrderId(pub SmolStr);

impl OrderId {
    pub fn new<S: AsRef<str>>(id: S) -> Self {
        Self(SmolStr::new(id))
    }
}

/// Identifier of the strategy instance that owns a grid level or arb leg.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display)]
pub struct StrategyId(pub SmolStr);

impl StrategyId {
    pub fn new<S: AsRef<str>>(id: S) -> Self {
        Self(SmolStr::new(id))
    }

    pub fn unknown() -> Self {
        Self::new("unknown")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_id_is_stable_across_calls() {
        let strategy = StrategyId::new("grid-btcusdt");
        let a = ClientOrderId::deterministic(&strategy, 4_000_000, Side::Buy);
        let b = ClientOrderId::deterministic(&strategy, 4_000_000, Side::Buy);
        assert_eq!(a, b);
    }

    #[test]
    fn deterministic_id_differs_by_price_tick_and_side() {
        let strategy = StrategyId::new("grid-btcusdt");
        let buy = ClientOrderId::deterministic(&strategy, 4_000_000, Side::Buy);
        let sell = ClientOrderId::deterministic(&strategy, 4_000_000, Side::Sell);
        let other_price = ClientOrderId::deterministic(&strategy, 4_000_100, Side::Buy);
        assert_ne!(buy, sell);
        assert_ne!(buy, other_price);
    }
}
