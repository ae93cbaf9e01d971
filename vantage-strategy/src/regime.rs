use serde::{Deserialize, Serialize};

/// Categorical market label driving the grid strategy's order-side filter.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Regime {
    /// Two-sided grid, full size.
    Range,
    /// Buys only; sells are filtered out of the target state.
    BullTrend,
    /// Sells only.
    BearTrend,
    /// No new orders; existing inventory may only be reduced.
    HighVolatility,
    /// Forced off by a time-of-day policy; equivalent to `HighVolatility`
    /// for order generation but kept distinct for logging/metrics.
    Off,
}

impl std::fmt::Display for Regime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Regime::Range => "RANGE",
            Regime::BullTrend => "BULL_TREND",
            Regime::BearTrend => "BEAR_TREND",
            Regime::HighVolatility => "HIGH_VOLATILITY",
            Regime::Off => "OFF",
        };
        f.write_str(label)
    }
}

impl Regime {
    pub fn allows_buy(self) -> bool {
        matches!(self, Regime::Range | Regime::BullTrend)
    }

    pub fn allows_sell(self) -> bool {
        matches!(self, Regime::Range | Regime::BearTrend)
    }

    /// Whether new orders of either side may be opened at all. `false` means
    /// the grid may only cancel/reduce, per `HIGH_VOLATILITY`/`OFF`.
    pub fn allows_new_orders(self) -> bool {
        matches!(self, Regime::Range | Regime::BullTrend | Regime::BearTrend)
    }

    pub fn is_reduce_only(self) -> bool {
        matches!(self, Regime::HighVolatility | Regime::Off)
    }
}

/// A contiguous, inclusive `[start, end)` window of minutes-since-midnight-UTC
/// during which the grid is forced `Regime::Off` regardless of the volatility
/// filter. Supports overnight windows where `end < start` (e.g. 22:00-06:00).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct TimeOfDayOffWindow {
    pub start_minute_utc: u16,
    pub end_minute_utc: u16,
}

impl TimeOfDayOffWindow {
    pub fn contains(&self, minute_of_day_utc: u16) -> bool {
        if self.start_minute_utc <= self.end_minute_utc {
            (self.start_minute_utc..self.end_minute_utc).contains(&minute_of_day_utc)
        } else {
            minute_of_day_utc >= self.start_minute_utc || minute_of_day_utc < self.end_minute_utc
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bull_trend_allows_buys_only() {
        assert!(Regime::BullTrend.allows_buy());
        assert!(!Regime::BullTrend.allows_sell());
    }

    #[test]
    fn bear_trend_allows_sells_only() {
        assert!(!Regime::BearTrend.allows_buy());
        assert!(Regime::BearTrend.allows_sell());
    }

    #[test]
    fn high_volatility_blocks_new_orders_both_sides() {
        assert!(!Regime::HighVolatility.allows_buy());
        assert!(!Regime::HighVolatility.allows_sell());
        assert!(Regime::HighVolatility.is_reduce_only());
    }

    #[test]
    fn display_matches_the_screaming_snake_case_wire_form() {
        assert_eq!(Regime::Range.to_string(), "RANGE");
        assert_eq!(Regime::BullTrend.to_string(), "BULL_TREND");
        assert_eq!(Regime::BearTrend.to_string(), "BEAR_TREND");
    }

    #[test]
    fn overnight_window_wraps_midnight() {
        let window = TimeOfDayOffWindow { start_minute_utc: 22 * 60, end_minute_utc: 6 * 60 };
        assert!(window.contains(23 * 60));
        assert!(window.contains(0));
        assert!(window.contains(5 * 60 + 59));
        assert!(!window.contains(12 * 60));
    }
}
