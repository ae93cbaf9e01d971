use crate::regime::Regime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use vantage_instrument::Side;

/// One desired grid level. Not yet an [`vantage_execution::Order`] — the
/// engine diffs this against current `Slot`s and assigns each surviving
/// level a deterministic `client_order_id` before dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetOrder {
    pub side: Side,
    pub price: Decimal,
    pub qty: Decimal,
}

/// Declarative description of the desired open orders + position for one
/// symbol at one instant. Computed fresh on every price tick; never
/// persisted (the engine persists `Slot`s, not this).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetState {
    pub anchor_price: Decimal,
    pub orders: Vec<TargetOrder>,
    pub target_position_qty: Decimal,
    pub effective_interval: Decimal,
    pub regime: Regime,
}

impl TargetState {
    /// Flat target state for when the regime forbids new orders but existing
    /// inventory may remain (used by `HIGH_VOLATILITY`/`OFF`).
    pub fn reduce_only(anchor_price: Decimal, effective_interval: Decimal, regime: Regime) -> Self {
        Self {
            anchor_price,
            orders: Vec::new(),
            target_position_qty: Decimal::ZERO,
            effective_interval,
            regime,
        }
    }
}
