use crate::slot::{Slot, SlotTable};
use rust_decimal::Decimal;
use vantage_execution::{ClientOrderId, StrategyId};
use vantage_instrument::Side;
use vantage_strategy::{TargetOrder, TargetState};

/// One instruction the engine must execute this tick to reconcile the live
/// [`SlotTable`] with a fresh [`TargetState`].
#[derive(Debug, Clone, PartialEq)]
pub enum SlotAction {
    /// Lock `slot_id` and place a new order at `price`/`qty`, both already
    /// rounded to the symbol's declared precision.
    Place { slot_id: i64, side: Side, price: Decimal, qty: Decimal, cid: ClientOrderId },
    /// Cancel the live order resting in `slot_id`.
    Cancel { slot_id: i64, cid: ClientOrderId },
}

/// Diff a [`TargetState`] against the current [`SlotTable`], producing the
/// ordered list of [`SlotAction`]s needed to converge.
///
/// Free slots nearest the target's anchor price are claimed first; locked
/// slots resting furthest from the anchor are cancelled first. This mirrors
/// how a human grid operator would reprice: clear the stale edges before
/// opening fresh levels near the money, rather than churning the whole
/// ladder on every tick.
pub struct ActionPlanner {
    tick_size: Decimal,
}

impl ActionPlanner {
    pub fn new(tick_size: Decimal) -> Self {
        Self { tick_size }
    }

    fn price_ticks(&self, price: Decimal) -> i64 {
        if self.tick_size.is_zero() {
            return 0;
        }
        (price / self.tick_size).round().to_string().parse().unwrap_or(0)
    }

    /// Produce the cancel actions (for slots the target no longer wants) and
    /// the place actions (for target levels not already resting), in the
    /// order the engine should issue them: cancels first, to free
    /// inventory/margin ahead of any new placement.
    pub fn plan(&self, target: &TargetState, slots: &SlotTable, strategy: &StrategyId) -> Vec<SlotAction> {
        let mut actions = Vec::new();

        let mut wanted: Vec<&TargetOrder> = target.orders.iter().collect();
        wanted.sort_by_key(|o| (o.price - target.anchor_price).abs());

        let mut claimed: Vec<i64> = Vec::new();

        // Cancel every locked slot whose resting price/side no longer
        // appears in the target, furthest-from-anchor first so the levels
        // closest to the money are disturbed last.
        let mut stale: Vec<&Slot> = slots
            .locked_slots()
            .filter(|slot| {
                !target
                    .orders
                    .iter()
                    .any(|o| o.side == slot.side && o.price == slot.price)
            })
            .collect();
        stale.sort_by_key(|s| std::cmp::Reverse((s.price - target.anchor_price).abs()));

        for slot in stale {
            if let Some(cid) = slot.client_order_id.clone() {
                actions.push(SlotAction::Cancel { slot_id: slot.slot_id, cid });
            }
        }

        // Any target level already resting in a locked slot is satisfied;
        // mark its slot claimed so a free slot isn't also opened for it.
        for slot in slots.locked_slots() {
            if target.orders.iter().any(|o| o.side == slot.side && o.price == slot.price) {
                claimed.push(slot.slot_id);
            }
        }

        let mut free: Vec<&Slot> = slots.free_slots().filter(|s| !claimed.contains(&s.slot_id)).collect();
        free.sort_by_key(|s| (s.price - target.anchor_price).abs());

        for order in wanted {
            let already_resting = slots
                .locked_slots()
                .any(|s| s.side == order.side && s.price == order.price);
            if already_resting {
                continue;
            }

            let Some(pos) = free.iter().position(|s| !claimed.contains(&s.slot_id)) else {
                break;
            };
            let slot = free.remove(pos);
            claimed.push(slot.slot_id);

            let cid = ClientOrderId::deterministic(strategy, self.price_ticks(order.price), order.side);
            actions.push(SlotAction::Place {
                slot_id: slot.slot_id,
                side: order.side,
                price: order.price,
                qty: order.qty,
                cid,
            });
        }

        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::Slot;
    use rust_decimal_macros::dec;
    use vantage_strategy::Regime;

    fn strategy() -> StrategyId {
        StrategyId::new("grid-btcusdt")
    }

    #[test]
    fn places_into_free_slots_nearest_the_anchor_first() {
        let mut slots = SlotTable::new();
        slots.insert(Slot::new_free(0, Side::Buy, Decimal::ZERO, Decimal::ZERO, 0));
        slots.insert(Slot::new_free(1, Side::Buy, Decimal::ZERO, Decimal::ZERO, 0));

        let target = TargetState {
            anchor_price: dec!(40_000),
            orders: vec![TargetOrder { side: Side::Buy, price: dec!(39_990), qty: dec!(0.01) }],
            target_position_qty: Decimal::ZERO,
            effective_interval: dec!(10),
            regime: Regime::Range,
        };

        let planner = ActionPlanner::new(dec!(0.01));
        let actions = planner.plan(&target, &slots, &strategy());
        assert_eq!(actions.len(), 1);
        assert!(matches!(actions[0], SlotAction::Place { price, .. } if price == dec!(39_990)));
    }

    #[test]
    fn cancels_locked_slots_no_longer_in_the_target() {
        let mut slots = SlotTable::new();
        let mut resting = Slot::new_free(0, Side::Buy, dec!(39_800), dec!(0.01), 0);
        resting.apply_status(vantage_instrument::OrderStatus::New, Decimal::ZERO, 1);
        resting.client_order_id = Some(ClientOrderId::new("stale-level"));
        slots.insert(resting);

        let target = TargetState::reduce_only(dec!(40_000), dec!(10), Regime::HighVolatility);

        let planner = ActionPlanner::new(dec!(0.01));
        let actions = planner.plan(&target, &slots, &strategy());
        assert_eq!(actions.len(), 1);
        assert!(matches!(&actions[0], SlotAction::Cancel { slot_id, .. } if *slot_id == 0));
    }

    #[test]
    fn a_resting_level_that_matches_the_target_is_left_alone() {
        let mut slots = SlotTable::new();
        let mut resting = Slot::new_free(0, Side::Buy, dec!(39_990), dec!(0.01), 0);
        resting.apply_status(vantage_instrument::OrderStatus::New, Decimal::ZERO, 1);
        resting.client_order_id = Some(ClientOrderId::new("matches"));
        slots.insert(resting);

        let target = TargetState {
            anchor_price: dec!(40_000),
            orders: vec![TargetOrder { side: Side::Buy, price: dec!(39_990), qty: dec!(0.01) }],
            target_position_qty: Decimal::ZERO,
            effective_interval: dec!(10),
            regime: Regime::Range,
        };

        let planner = ActionPlanner::new(dec!(0.01));
        let actions = planner.plan(&target, &slots, &strategy());
        assert!(actions.is_empty());
    }
}
