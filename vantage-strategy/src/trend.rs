use crate::regime::Regime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use vantage_ta::indicators::ExponentialMovingAverage;

/// Configuration for [`TrendClassifier`]'s fast/slow EMA crossover.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendConfig {
    pub fast_period: usize,
    pub slow_period: usize,
    /// Minimum fractional separation between the fast and slow EMA,
    /// relative to the slow EMA, before a trend is called. Below this the
    /// market is reported as `RANGE` so noise around a flat EMA pair
    /// doesn't flicker the regime every tick.
    pub trend_threshold: Decimal,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self { fast_period: 8, slow_period: 34, trend_threshold: Decimal::new(5, 3) }
    }
}

/// Classifies `RANGE`/`BULL_TREND`/`BEAR_TREND` from a fast/slow EMA
/// crossover on closing prices. Feeds [`crate::grid::GridStrategy`]'s
/// regime filter alongside the risk breaker's `HIGH_VOLATILITY` override,
/// which always takes precedence over whatever this classifier reports.
#[derive(Debug, Clone)]
pub struct TrendClassifier {
    config: TrendConfig,
    fast: ExponentialMovingAverage,
    slow: ExponentialMovingAverage,
}

impl TrendClassifier {
    pub fn new(config: TrendConfig) -> Self {
        let fast = ExponentialMovingAverage::new(config.fast_period);
        let slow = ExponentialMovingAverage::new(config.slow_period);
        Self { config, fast, slow }
    }

    /// Feed one closing price and classify the resulting trend.
    pub fn classify(&mut self, close: Decimal) -> Regime {
        let fast = self.fast.update(close);
        let slow = self.slow.update(close);
        if slow.is_zero() {
            return Regime::Range;
        }

        let separation = (fast - slow) / slow;
        if separation >= self.config.trend_threshold {
            Regime::BullTrend
        } else if separation <= -self.config.trend_threshold {
            Regime::BearTrend
        } else {
            Regime::Range
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn fast_classifier() -> TrendClassifier {
        TrendClassifier::new(TrendConfig { fast_period: 2, slow_period: 5, trend_threshold: dec!(0.01) })
    }

    #[test]
    fn a_sustained_rally_is_classified_bull_trend() {
        let mut classifier = fast_classifier();
        let mut regime = Regime::Range;
        for price in [dec!(100), dec!(105), dec!(112), dec!(120), dec!(130), dec!(142), dec!(155)] {
            regime = classifier.classify(price);
        }
        assert_eq!(regime, Regime::BullTrend);
    }

    #[test]
    fn a_sustained_decline_is_classified_bear_trend() {
        let mut classifier = fast_classifier();
        let mut regime = Regime::Range;
        for price in [dec!(100), dec!(95), dec!(88), dec!(80), dec!(70), dec!(58), dec!(45)] {
            regime = classifier.classify(price);
        }
        assert_eq!(regime, Regime::BearTrend);
    }

    #[test]
    fn a_flat_price_series_stays_range() {
        let mut classifier = fast_classifier();
        let mut regime = Regime::Range;
        for _ in 0..10 {
            regime = classifier.classify(dec!(100));
        }
        assert_eq!(regime, Regime::Range);
    }
}
