use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use vantage_execution::Position;
use vantage_instrument::Symbol;

/// A read-only snapshot of one symbol's position, cheap to clone for
/// strategy/risk callers that must not hold the manager's lock across an
/// `await` point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub symbol: Symbol,
    pub qty: Decimal,
    pub entry_price: Decimal,
    pub mark_price: Decimal,
    pub unrealized_pnl: Decimal,
}

impl PositionSnapshot {
    fn flat(symbol: Symbol) -> Self {
        Self {
            symbol,
            qty: Decimal::ZERO,
            entry_price: Decimal::ZERO,
            mark_price: Decimal::ZERO,
            unrealized_pnl: Decimal::ZERO,
        }
    }
}

/// Shared, lock-bounded view of one symbol's live position, updated from the
/// venue's position stream and read by the grid/risk layers on every tick.
///
/// Grounded on the `parking_lot::RwLock` snapshot-access idiom used
/// throughout the risk/execution layers: readers never block each other, and
/// a writer only holds the lock for the duration of the field copy, never
/// across an await.
#[derive(Debug, Clone)]
pub struct PositionManager {
    inner: Arc<RwLock<PositionSnapshot>>,
}

impl PositionManager {
    pub fn new(symbol: Symbol) -> Self {
        Self { inner: Arc::new(RwLock::new(PositionSnapshot::flat(symbol))) }
    }

    /// Apply a streamed [`Position`] update from the venue.
    pub fn apply(&self, position: &Position) {
        let mut guard = self.inner.write();
        guard.qty = if position.is_flat() {
            Decimal::ZERO
        } else {
            match position.side {
                vantage_execution::PositionSide::Short => -position.size,
                _ => position.size,
            }
        };
        guard.entry_price = position.entry_price;
        guard.mark_price = position.mark_price;
        guard.unrealized_pnl = position.unrealized_pnl;
    }

    /// Apply a local fill before the venue's own position stream catches up,
    /// so the grid's inventory skew reacts within the same tick as the fill
    /// rather than waiting a round trip.
    pub fn apply_local_fill(&self, side: vantage_instrument::Side, qty: Decimal, price: Decimal) {
        let mut guard = self.inner.write();
        let signed = match side {
            vantage_instrument::Side::Buy => qty,
            vantage_instrument::Side::Sell => -qty,
        };
        guard.qty += signed;
        guard.mark_price = price;
    }

    pub fn snapshot(&self) -> PositionSnapshot {
        self.inner.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn a_fresh_manager_reports_flat() {
        let manager = PositionManager::new(Symbol::from("BTCUSDT"));
        assert_eq!(manager.snapshot().qty, Decimal::ZERO);
    }

    #[test]
    fn local_buy_fill_increases_qty_immediately() {
        let manager = PositionManager::new(Symbol::from("BTCUSDT"));
        manager.apply_local_fill(vantage_instrument::Side::Buy, dec!(0.01), dec!(40_000));
        assert_eq!(manager.snapshot().qty, dec!(0.01));

        manager.apply_local_fill(vantage_instrument::Side::Sell, dec!(0.005), dec!(40_100));
        assert_eq!(manager.snapshot().qty, dec!(0.005));
    }

    #[test]
    fn a_short_position_update_is_reported_as_negative_qty() {
        let manager = PositionManager::new(Symbol::from("BTCUSDT"));
        manager.apply(&Position::new(
            Symbol::from("BTCUSDT"),
            vantage_execution::PositionSide::Short,
            dec!(0.02),
            dec!(40_000),
            dec!(39_900),
            dec!(2),
            None,
            dec!(1),
        ));
        assert_eq!(manager.snapshot().qty, dec!(-0.02));
    }
}
