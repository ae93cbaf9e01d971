use derive_more::Constructor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use vantage_instrument::{exchange::ExchangeId, Symbol};

/// A funding-rate reading for one venue/symbol pair.
///
/// Spot legs report the sentinel `rate = 0, next_funding_time_ms = 0` with a
/// real `timestamp_ms`, so staleness checks still apply uniformly.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Constructor)]
pub struct FundingRate {
    pub venue: ExchangeId,
    pub symbol: Symbol,
    pub rate: Decimal,
    pub predicted_rate: Option<Decimal>,
    pub next_funding_time_ms: i64,
    pub timestamp_ms: i64,
}

impl FundingRate {
    pub fn spot_sentinel(venue: ExchangeId, symbol: Symbol, timestamp_ms: i64) -> Self {
        Self {
            venue,
            symbol,
            rate: Decimal::ZERO,
            predicted_rate: None,
            next_funding_time_ms: 0,
            timestamp_ms,
        }
    }

    /// Whether this reading is older than `ttl_ms` as of `now_ms`.
    pub fn is_stale(&self, ttl_ms: i64, now_ms: i64) -> bool {
        now_ms.saturating_sub(self.timestamp_ms) > ttl_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn staleness_is_relative_to_now() {
        let funding = FundingRate::new(ExchangeId::BybitSpot, Symbol::from("BTCUSDT"), dec!(0.0001), None, 1_000, 0);
        assert!(!funding.is_stale(5_000, 4_000));
        assert!(funding.is_stale(5_000, 5_001));
    }

    #[test]
    fn spot_sentinel_has_zero_rate_and_next_funding_time() {
        let funding = FundingRate::spot_sentinel(ExchangeId::BinanceSpot, Symbol::from("ETHUSDT"), 1_000);
        assert_eq!(funding.rate, Decimal::ZERO);
        assert_eq!(funding.next_funding_time_ms, 0);
    }
}
