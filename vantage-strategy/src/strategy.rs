use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration parameters for a strategy, keyed by name so config loading
/// stays generic across strategy kinds rather than growing one struct per
/// strategy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategyConfig {
    #[serde(default)]
    pub parameters: HashMap<String, f64>,
}

impl StrategyConfig {
    /// Convenience helper to get a parameter by name.
    pub fn get(&self, key: &str) -> Option<f64> {
        self.parameters.get(key).copied()
    }
}

/// Trait implemented by event-driven strategies.
///
/// Both [`crate::grid::GridStrategy`] and the funding-arb selector in
/// [`crate::funding`] are pure computations over a snapshot of inputs rather
/// than long-lived event subscribers, so this trait is reserved for the
/// lighter-weight strategy shapes (manual overrides, test doubles) that do
/// own lifecycle state.
pub trait Strategy<E> {
    /// Called once before the strategy begins processing events.
    fn on_start(&mut self, _config: &StrategyConfig) {}

    /// Handle a single event.
    fn on_event(&mut self, event: &E);

    /// Called when the strategy is shutting down.
    fn on_stop(&mut self) {}
}

/// A simple strategy that records every event it receives. Used in tests to
/// assert event routing without depending on grid/arb logic.
#[derive(Debug, Default)]
pub struct RecordingStrategy<E> {
    pub events: Vec<E>,
}

impl<E: Clone> Strategy<E> for RecordingStrategy<E> {
    fn on_event(&mut self, event: &E) {
        self.events.push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_strategy_collects_events() {
        let mut strat = RecordingStrategy::default();
        strat.on_start(&StrategyConfig::default());
        strat.on_event(&1);
        strat.on_event(&2);
        strat.on_stop();
        assert_eq!(strat.events, vec![1, 2]);
    }
}
