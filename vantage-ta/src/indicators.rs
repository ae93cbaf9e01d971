use rust_decimal::Decimal;
use std::collections::VecDeque;

/// Simple moving average indicator.
#[derive(Debug, Clone)]
pub struct SimpleMovingAverage {
    period: usize,
    values: VecDeque<Decimal>,
    sum: Decimal,
}

impl SimpleMovingAverage {
    /// Create a new SMA with the given period.
    pub fn new(period: usize) -> Self {
        Self { period, values: VecDeque::new(), sum: Decimal::ZERO }
    }

    /// Update the SMA with a new value and return the latest average.
    pub fn update(&mut self, value: Decimal) -> Decimal {
        self.values.push_back(value);
        self.sum += value;
        if self.values.len() > self.period {
            if let Some(old) = self.values.pop_front() {
                self.sum -= old;
            }
        }
        self.average()
    }

    /// Current average value.
    pub fn average(&self) -> Decimal {
        if self.values.is_empty() {
            Decimal::ZERO
        } else {
            self.sum / Decimal::from(self.values.len() as u64)
        }
    }
}

/// Exponential moving average indicator.
#[derive(Debug, Clone)]
pub struct ExponentialMovingAverage {
    multiplier: Decimal,
    value: Option<Decimal>,
}

impl ExponentialMovingAverage {
    /// Create a new EMA with the given period.
    pub fn new(period: usize) -> Self {
        let multiplier = Decimal::from(2u64) / Decimal::from(period as u64 + 1);
        Self { multiplier, value: None }
    }

    /// Update the EMA with a new price and return the latest value.
    pub fn update(&mut self, price: Decimal) -> Decimal {
        match self.value {
            Some(val) => {
                let next = (price - val) * self.multiplier + val;
                self.value = Some(next);
                next
            }
            None => {
                self.value = Some(price);
                price
            }
        }
    }

    /// Current EMA value if initialised.
    pub fn value(&self) -> Option<Decimal> {
        self.value
    }
}

/// Average True Range, a volatility measure used to scale grid spacing and
/// position size: a wider ATR widens the effective grid interval.
#[derive(Debug, Clone)]
pub struct AverageTrueRange {
    period: usize,
    prev_close: Option<Decimal>,
    true_ranges: VecDeque<Decimal>,
    sum: Decimal,
}

impl AverageTrueRange {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            prev_close: None,
            true_ranges: VecDeque::new(),
            sum: Decimal::ZERO,
        }
    }

    /// Feed one candle's high/low/close and return the current ATR value.
    ///
    /// Returns `None` until at least one true range has been recorded (the
    /// very first candle has no previous close to compare against, so its
    /// true range degenerates to `high - low`).
    pub fn update(&mut self, high: Decimal, low: Decimal, close: Decimal) -> Option<Decimal> {
        let true_range = match self.prev_close {
            Some(prev_close) => (high - low)
                .max((high - prev_close).abs())
                .max((low - prev_close).abs()),
            None => high - low,
        };
        self.prev_close = Some(close);

        self.true_ranges.push_back(true_range);
        self.sum += true_range;
        if self.true_ranges.len() > self.period {
            if let Some(old) = self.true_ranges.pop_front() {
                self.sum -= old;
            }
        }

        Some(self.sum / Decimal::from(self.true_ranges.len() as u64))
    }

    pub fn is_full(&self) -> bool {
        self.true_ranges.len() == self.period
    }

    /// Current ATR value without feeding a new candle, or `None` if no
    /// candle has been recorded yet.
    pub fn current(&self) -> Option<Decimal> {
        if self.true_ranges.is_empty() {
            None
        } else {
            Some(self.sum / Decimal::from(self.true_ranges.len() as u64))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn atr_of_constant_range_candles_equals_the_range() {
        let mut atr = AverageTrueRange::new(3);
        assert_eq!(atr.update(dec!(110), dec!(100), dec!(105)), Some(dec!(10)));
        assert_eq!(atr.update(dec!(112), dec!(102), dec!(107)), Some(dec!(10)));
        assert_eq!(atr.update(dec!(111), dec!(101), dec!(106)), Some(dec!(10)));
        assert!(atr.is_full());
    }

    #[test]
    fn atr_captures_a_gap_beyond_the_candle_range() {
        let mut atr = AverageTrueRange::new(2);
        atr.update(dec!(110), dec!(100), dec!(105));
        // Second candle's range is only 2, but its high is 3 above the prior
        // close, so the true range picks up the wider gap: (10 + 3) / 2.
        let value = atr.update(dec!(108), dec!(106), dec!(107)).unwrap();
        assert_eq!(value, dec!(6.5));
    }
}
