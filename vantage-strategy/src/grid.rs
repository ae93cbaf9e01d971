use crate::{
    regime::{Regime, TimeOfDayOffWindow},
    target::{TargetOrder, TargetState},
    trend::TrendConfig,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use vantage_instrument::Side;
use vantage_risk::VolatilityScaler;
use vantage_ta::indicators::AverageTrueRange;

/// Whether inventory skew shifts the anchor price multiplicatively (scales
/// with price) or additively (scales with the grid's own interval). Exposed
/// as config rather than hard-coded since either convention is defensible
/// and venues differ in which one matches trader intuition.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum SkewMode {
    Multiplicative,
    Additive,
}

impl Default for SkewMode {
    fn default() -> Self {
        Self::Multiplicative
    }
}

/// Static configuration for a [`GridStrategy`] instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// Base spacing between adjacent grid levels before volatility scaling.
    pub base_interval: Decimal,
    /// Number of levels emitted above, and below, the anchor price.
    pub levels: u32,
    /// Base quantity for the level nearest the anchor.
    pub base_qty: Decimal,
    /// Multiplicative taper applied to `base_qty` per level away from the
    /// anchor (e.g. `0.9` shrinks qty 10% per level out).
    pub qty_taper: Decimal,
    pub skew_mode: SkewMode,
    /// Multiplicative mode: fraction of inventory ratio applied to price.
    /// Additive mode: fraction of `effective_interval` applied per unit of
    /// inventory ratio.
    pub skew_factor: Decimal,
    /// Position size, in quote notional, considered "full" inventory for
    /// the purpose of computing the skew's `inventory_ratio`.
    pub max_inventory_qty: Decimal,
    pub atr_period: usize,
    pub volatility_scale: VolatilityScaler,
    #[serde(default)]
    pub off_windows: Vec<TimeOfDayOffWindow>,
    /// Fast/slow EMA crossover thresholds feeding the engine's trend
    /// classifier, which supplies the `BULL_TREND`/`BEAR_TREND` labels this
    /// strategy's regime filter reacts to (spec 4.6's regime filter; the
    /// breaker's `HIGH_VOLATILITY` always overrides it).
    #[serde(default)]
    pub trend: TrendConfig,
}

/// Durable-across-ticks grid computation: feeds candle data into an ATR
/// indicator and turns a price tick plus position snapshot into a
/// [`TargetState`]. Carries no order/slot state of its own — that is the
/// engine's responsibility.
#[derive(Debug, Clone)]
pub struct GridStrategy {
    config: GridConfig,
    atr: AverageTrueRange,
}

impl GridStrategy {
    pub fn new(config: GridConfig) -> Self {
        let atr = AverageTrueRange::new(config.atr_period);
        Self { config, atr }
    }

    /// Feed one candle's high/low/close so the ATR window advances. Call
    /// once per kline close, independently of `compute_target_state` which
    /// runs once per price tick.
    pub fn on_kline(&mut self, high: Decimal, low: Decimal, close: Decimal) {
        self.atr.update(high, low, close);
    }

    /// The trend-classifier configuration carried by this strategy's
    /// config, so the engine can build a [`crate::trend::TrendClassifier`]
    /// without re-threading a separate config value through every call
    /// site that constructs a strategy.
    pub fn trend_config(&self) -> &TrendConfig {
        &self.config.trend
    }

    /// Compute the desired `TargetState` for the current tick.
    ///
    /// `position_qty` is signed: positive is long, negative is short.
    /// `minute_of_day_utc` selects any configured time-of-day `OFF` window.
    pub fn compute_target_state(
        &self,
        price: Decimal,
        position_qty: Decimal,
        base_regime: Regime,
        minute_of_day_utc: u16,
    ) -> TargetState {
        let regime = if self.config.off_windows.iter().any(|w| w.contains(minute_of_day_utc)) {
            Regime::Off
        } else {
            base_regime
        };

        let atr = self.atr.current();
        let effective_interval = match atr {
            Some(atr) => self.config.base_interval * self.config.volatility_scale.scale(atr),
            None => self.config.base_interval,
        };

        if regime.is_reduce_only() {
            return TargetState::reduce_only(price, effective_interval, regime);
        }

        let anchor_price = self.skewed_anchor(price, position_qty, effective_interval);
        let mut orders = Vec::with_capacity(self.config.levels as usize * 2);

        for level in 1..=self.config.levels {
            let offset = effective_interval * Decimal::from(level);
            let qty = self.level_qty(level);

            if regime.allows_buy() {
                orders.push(TargetOrder {
                    side: Side::Buy,
                    price: anchor_price - offset,
                    qty,
                });
            }
            if regime.allows_sell() {
                orders.push(TargetOrder {
                    side: Side::Sell,
                    price: anchor_price + offset,
                    qty,
                });
            }
        }

        TargetState {
            anchor_price,
            orders,
            target_position_qty: Decimal::ZERO,
            effective_interval,
            regime,
        }
    }

    fn inventory_ratio(&self, position_qty: Decimal) -> Decimal {
        if self.config.max_inventory_qty.is_zero() {
            return Decimal::ZERO;
        }
        (position_qty / self.config.max_inventory_qty).clamp(Decimal::NEGATIVE_ONE, Decimal::ONE)
    }

    /// Skew the anchor away from raw price to lean against current
    /// inventory: long inventory pushes the anchor down (favouring more
    /// sells, fewer buys), short inventory pushes it up.
    fn skewed_anchor(&self, price: Decimal, position_qty: Decimal, effective_interval: Decimal) -> Decimal {
        let ratio = self.inventory_ratio(position_qty);
        match self.config.skew_mode {
            SkewMode::Multiplicative => {
                price * (Decimal::ONE - self.config.skew_factor * ratio)
            }
            SkewMode::Additive => {
                price - self.config.skew_factor * ratio * effective_interval
            }
        }
    }

    fn level_qty(&self, level: u32) -> Decimal {
        let mut qty = self.config.base_qty;
        for _ in 1..level {
            qty *= self.config.qty_taper;
        }
        qty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn config() -> GridConfig {
        GridConfig {
            base_interval: dec!(100),
            levels: 2,
            base_qty: dec!(1),
            qty_taper: dec!(0.5),
            skew_mode: SkewMode::Multiplicative,
            skew_factor: dec!(0.1),
            max_inventory_qty: dec!(10),
            atr_period: 14,
            volatility_scale: VolatilityScaler::new(dec!(1), dec!(0.5), dec!(2)),
            off_windows: Vec::new(),
            trend: crate::trend::TrendConfig::default(),
        }
    }

    #[test]
    fn range_regime_emits_a_two_sided_grid_with_tapering_qty() {
        let strategy = GridStrategy::new(config());
        let state = strategy.compute_target_state(dec!(40_000), Decimal::ZERO, Regime::Range, 0);

        assert_eq!(state.orders.len(), 4);
        let buys: Vec<_> = state.orders.iter().filter(|o| o.side == Side::Buy).collect();
        let sells: Vec<_> = state.orders.iter().filter(|o| o.side == Side::Sell).collect();
        assert_eq!(buys.len(), 2);
        assert_eq!(sells.len(), 2);
        assert_eq!(buys[0].qty, dec!(1));
        assert_eq!(buys[1].qty, dec!(0.5));
    }

    #[test]
    fn bull_trend_emits_buys_only() {
        let strategy = GridStrategy::new(config());
        let state = strategy.compute_target_state(dec!(40_000), Decimal::ZERO, Regime::BullTrend, 0);
        assert!(state.orders.iter().all(|o| o.side == Side::Buy));
        assert_eq!(state.orders.len(), 2);
    }

    #[test]
    fn high_volatility_emits_no_orders() {
        let strategy = GridStrategy::new(config());
        let state = strategy.compute_target_state(dec!(40_000), Decimal::ZERO, Regime::HighVolatility, 0);
        assert!(state.orders.is_empty());
        assert_eq!(state.regime, Regime::HighVolatility);
    }

    #[test]
    fn time_of_day_window_forces_off_even_in_range_regime() {
        let mut cfg = config();
        cfg.off_windows.push(TimeOfDayOffWindow { start_minute_utc: 0, end_minute_utc: 60 });
        let strategy = GridStrategy::new(cfg);
        let state = strategy.compute_target_state(dec!(40_000), Decimal::ZERO, Regime::Range, 30);
        assert_eq!(state.regime, Regime::Off);
        assert!(state.orders.is_empty());
    }

    #[test]
    fn long_inventory_skews_anchor_down_in_multiplicative_mode() {
        let strategy = GridStrategy::new(config());
        let flat = strategy.compute_target_state(dec!(40_000), Decimal::ZERO, Regime::Range, 0);
        let long = strategy.compute_target_state(dec!(40_000), dec!(10), Regime::Range, 0);
        assert!(long.anchor_price < flat.anchor_price);
    }

    #[test]
    fn additive_skew_mode_shifts_anchor_by_interval_fraction() {
        let mut cfg = config();
        cfg.skew_mode = SkewMode::Additive;
        let strategy = GridStrategy::new(cfg);
        let long = strategy.compute_target_state(dec!(40_000), dec!(10), Regime::Range, 0);
        // ratio=1, skew_factor=0.1, interval=100 -> anchor shifts down by 10.
        assert_eq!(long.anchor_price, dec!(39_990));
    }
}
