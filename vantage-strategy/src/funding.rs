use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use vantage_execution::FundingRate;
use vantage_instrument::{exchange::ExchangeId, Symbol};

/// A candidate cross-venue spot<->perp pair under consideration by the
/// selector, before any scoring or staleness filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbCandidate {
    pub symbol: Symbol,
    pub spot: (ExchangeId, FundingRate),
    pub perp: (ExchangeId, FundingRate),
    /// 24h traded volume in quote notional, used for the liquidity filter.
    pub spot_volume_24h: Decimal,
    pub perp_volume_24h: Decimal,
}

/// A scored, ready-to-enter opportunity. At most one may be in flight per
/// symbol at a time (single-in-flight guard lives in the engine's durable
/// workflow, not here).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbOpportunity {
    pub symbol: Symbol,
    pub long_leg: (ExchangeId, Symbol),
    pub short_leg: (ExchangeId, Symbol),
    pub spread: Decimal,
    pub apr: Decimal,
    pub notional: Decimal,
    pub use_margin_spot: bool,
    pub quality_score: Decimal,
}

/// Weights for the selector's linear quality score: a weighted sum of Yield
/// (APR), Risk (inverse of funding-rate volatility, approximated here by the
/// spread magnitude itself being penalised past a comfort zone) and Maturity
/// (how long until the next funding settlement, favouring soon-to-settle
/// spreads). Deliberately a simple linear form rather than a multiplicative
/// combination of many factors, so a single dominant weight never silently
/// zeroes out the others.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub yield_weight: Decimal,
    pub risk_weight: Decimal,
    pub maturity_weight: Decimal,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            yield_weight: Decimal::new(6, 1),    // 0.6
            risk_weight: Decimal::new(3, 1),      // 0.3
            maturity_weight: Decimal::new(1, 1), // 0.1
        }
    }
}

/// Filters and scoring thresholds applied by [`FundingArbSelector`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorConfig {
    pub min_volume_24h: Decimal,
    pub funding_staleness_ttl_ms: i64,
    pub min_apr: Decimal,
    pub min_quality_score: Decimal,
    pub weights: ScoreWeights,
    /// Notional sized as this fraction of the smaller leg's 24h volume,
    /// clamped to a sane per-trade cap upstream by the caller.
    pub notional_fraction_of_volume: Decimal,
}

/// Scans candidate cross-venue pairs and ranks the ones worth entering.
///
/// The spec calls for scanning "in parallel (bounded worker pool)" — that
/// concurrency is a property of how the *caller* drives this selector across
/// many candidates (a bounded `tokio::task::JoinSet` per orchestrator tick),
/// not of the scoring function itself, which is a pure, synchronous
/// computation over one candidate at a time.
#[derive(Debug, Clone)]
pub struct FundingArbSelector {
    config: SelectorConfig,
}

impl FundingArbSelector {
    pub fn new(config: SelectorConfig) -> Self {
        Self { config }
    }

    /// Evaluate a single candidate, returning `None` if it fails a liquidity,
    /// staleness, or quality filter.
    pub fn evaluate(&self, candidate: &ArbCandidate, now_ms: i64) -> Option<ArbOpportunity> {
        if candidate.spot_volume_24h < self.config.min_volume_24h
            || candidate.perp_volume_24h < self.config.min_volume_24h
        {
            return None;
        }

        let (spot_venue, spot_rate) = &candidate.spot;
        let (perp_venue, perp_rate) = &candidate.perp;
        if spot_rate.is_stale(self.config.funding_staleness_ttl_ms, now_ms)
            || perp_rate.is_stale(self.config.funding_staleness_ttl_ms, now_ms)
        {
            return None;
        }

        let spread = perp_rate.rate - spot_rate.rate;
        let apr = spread * Decimal::from(3 * 365); // 3 fundings/day, compounding ignored.
        if apr.abs() < self.config.min_apr {
            return None;
        }

        let notional = candidate
            .spot_volume_24h
            .min(candidate.perp_volume_24h)
            * self.config.notional_fraction_of_volume;

        let quality_score = self.score(apr, spread, perp_rate.next_funding_time_ms - now_ms);
        if quality_score < self.config.min_quality_score {
            return None;
        }

        // Positive funding (perps paying longs): go long spot, short perp.
        // Negative funding: short spot (margin) and long perp.
        let (long_leg, short_leg, use_margin_spot) = if apr >= Decimal::ZERO {
            ((*spot_venue, candidate.symbol.clone()), (*perp_venue, candidate.symbol.clone()), false)
        } else {
            ((*perp_venue, candidate.symbol.clone()), (*spot_venue, candidate.symbol.clone()), true)
        };

        Some(ArbOpportunity {
            symbol: candidate.symbol.clone(),
            long_leg,
            short_leg,
            spread,
            apr,
            notional,
            use_margin_spot,
            quality_score,
        })
    }

    /// Filter and rank a batch of candidates, best opportunity first.
    pub fn select(&self, candidates: &[ArbCandidate], now_ms: i64) -> Vec<ArbOpportunity> {
        let mut opportunities: Vec<_> =
            candidates.iter().filter_map(|c| self.evaluate(c, now_ms)).collect();
        opportunities.sort_by(|a, b| b.quality_score.cmp(&a.quality_score));
        opportunities
    }

    fn score(&self, apr: Decimal, spread: Decimal, ms_to_next_funding: i64) -> Decimal {
        let yield_term = apr.abs() * self.config.weights.yield_weight;
        // Risk term penalises an implausibly wide spread (likely stale/bad
        // data) rather than rewarding it linearly forever.
        let risk_term = (Decimal::ONE - spread.abs().min(Decimal::ONE)) * self.config.weights.risk_weight;
        // Maturity term favours spreads closer to settlement (less time for
        // the basis to move against the position before funding is paid).
        let hours_to_next = Decimal::from(ms_to_next_funding.max(0)) / Decimal::from(3_600_000);
        let maturity_term =
            (Decimal::ONE - (hours_to_next / Decimal::from(8)).min(Decimal::ONE)) * self.config.weights.maturity_weight;

        yield_term + risk_term + maturity_term
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn config() -> SelectorConfig {
        SelectorConfig {
            min_volume_24h: dec!(10_000),
            funding_staleness_ttl_ms: 5 * 60 * 1000,
            min_apr: dec!(0.05),
            min_quality_score: dec!(0),
            weights: ScoreWeights::default(),
            notional_fraction_of_volume: dec!(0.001),
        }
    }

    fn candidate(spot_rate: Decimal, perp_rate: Decimal, now_ms: i64) -> ArbCandidate {
        ArbCandidate {
            symbol: Symbol::from("BTCUSDT"),
            spot: (ExchangeId::BinanceSpot, FundingRate::spot_sentinel(ExchangeId::BinanceSpot, Symbol::from("BTCUSDT"), now_ms)),
            perp: (
                ExchangeId::BybitPerpetualsUsd,
                FundingRate::new(ExchangeId::BybitPerpetualsUsd, Symbol::from("BTCUSDT"), perp_rate, None, now_ms + 3_600_000, now_ms),
            ),
            spot_volume_24h: dec!(1_000_000),
            perp_volume_24h: dec!(1_000_000),
        }
        .with_spot_rate(spot_rate, now_ms)
    }

    impl ArbCandidate {
        fn with_spot_rate(mut self, rate: Decimal, now_ms: i64) -> Self {
            self.spot.1 = FundingRate::new(ExchangeId::BinanceSpot, self.symbol.clone(), rate, None, 0, now_ms);
            self
        }
    }

    #[test]
    fn positive_funding_spread_goes_long_spot_short_perp() {
        let selector = FundingArbSelector::new(config());
        let candidate = candidate(dec!(0), dec!(0.001), 1_000_000);
        let opportunity = selector.select(&[candidate], 1_000_000);
        assert_eq!(opportunity.len(), 1);
        assert_eq!(opportunity[0].long_leg.0, ExchangeId::BinanceSpot);
        assert_eq!(opportunity[0].short_leg.0, ExchangeId::BybitPerpetualsUsd);
        assert!(!opportunity[0].use_margin_spot);
    }

    #[test]
    fn negative_funding_spread_shorts_spot_with_margin() {
        let selector = FundingArbSelector::new(config());
        let candidate = candidate(dec!(0), dec!(-0.001), 1_000_000);
        let opportunity = selector.select(&[candidate], 1_000_000);
        assert_eq!(opportunity.len(), 1);
        assert_eq!(opportunity[0].short_leg.0, ExchangeId::BinanceSpot);
        assert!(opportunity[0].use_margin_spot);
    }

    #[test]
    fn stale_leg_is_excluded() {
        let selector = FundingArbSelector::new(config());
        let mut candidate = candidate(dec!(0), dec!(0.001), 1_000_000);
        candidate.perp.1.timestamp_ms = 0; // now ancient relative to now_ms below
        let opportunities = selector.select(&[candidate], 10_000_000);
        assert!(opportunities.is_empty());
    }

    #[test]
    fn below_volume_floor_is_excluded() {
        let selector = FundingArbSelector::new(config());
        let mut candidate = candidate(dec!(0), dec!(0.001), 1_000_000);
        candidate.spot_volume_24h = dec!(1);
        let opportunities = selector.select(&[candidate], 1_000_000);
        assert!(opportunities.is_empty());
    }

    #[test]
    fn select_ranks_higher_apr_first() {
        let selector = FundingArbSelector::new(config());
        let weak = candidate(dec!(0), dec!(0.0006), 1_000_000);
        let strong = candidate(dec!(0), dec!(0.002), 1_000_000);
        let opportunities = selector.select(&[weak, strong], 1_000_000);
        assert_eq!(opportunities.len(), 2);
        assert!(opportunities[0].apr > opportunities[1].apr);
    }
}
