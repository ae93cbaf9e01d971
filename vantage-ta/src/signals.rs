use crate::patterns::{crossover, Cross};
use rust_decimal::Decimal;

/// Directional trading signal produced by a signal generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Buy,
    Sell,
}

/// Emits a [`Signal`] whenever a fast/slow series pair crosses.
#[derive(Debug, Clone, Default)]
pub struct CrossOverSignal {
    prev: Option<(Decimal, Decimal)>,
}

impl CrossOverSignal {
    pub fn new() -> Self {
        Self { prev: None }
    }

    /// Feed the latest fast/slow pair and return a signal if a crossover
    /// just occurred.
    pub fn update(&mut self, fast: Decimal, slow: Decimal) -> Option<Signal> {
        let signal = self.prev.and_then(|(prev_fast, prev_slow)| {
            match crossover(prev_fast, prev_slow, fast, slow) {
                Some(Cross::Above) => Some(Signal::Buy),
                Some(Cross::Below) => Some(Signal::Sell),
                None => None,
            }
        });

        self.prev = Some((fast, slow));
        signal
    }
}
