use crate::action::{ActionPlanner, SlotAction};
use crate::slot::{Slot, SlotTable};
use crate::store::{Store, StoreError};
use crate::workflow::{WorkflowId, WorkflowStatus, WorkflowStore};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info, warn};
use vantage_execution::{
    exchange::Exchange, ClientError, OrderKey, OrderRequestCancel, OrderRequestOpen, OrderState,
    RequestCancel, RequestOpen, StrategyId,
};
use vantage_instrument::{exchange::ExchangeId, OrderType, Side, Symbol, SymbolInfo, TimeInForce};
use vantage_risk::{BreakerState, CircuitBreaker};
use vantage_strategy::{GridStrategy, Regime, TargetState, TrendClassifier};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("exchange call failed: {0}")]
    Client(#[from] ClientError),
}

/// A fill the venue reports for a `client_order_id` the engine has no slot
/// record of. Returned by [`GridEngine::on_order_update`] so the caller can
/// apply it to its own position tracker (the engine has no position
/// tracker of its own to reconcile against; that lives on the
/// `SymbolManager`/`PositionManager` that owns this engine).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GhostFill {
    pub side: Side,
    pub qty: Decimal,
    pub price: Decimal,
}

/// Drives one symbol's grid: computes a fresh [`TargetState`] per price tick,
/// diffs it against the durable [`SlotTable`] and issues the resulting
/// place/cancel actions against an [`Exchange`], persisting every slot
/// mutation before acknowledging the tick.
///
/// Owned exclusively by one `SymbolManager` task; never shared across
/// symbols or cloned across threads.
pub struct GridEngine<E: Exchange> {
    exchange: E,
    store: Store,
    workflows: WorkflowStore,
    symbol: Symbol,
    symbol_info: SymbolInfo,
    strategy_id: StrategyId,
    strategy: GridStrategy,
    slots: SlotTable,
    planner: ActionPlanner,
    breaker: CircuitBreaker,
    trend: TrendClassifier,
    regime: Regime,
    sequence: u64,
}

impl<E: Exchange> GridEngine<E> {
    pub fn new(
        exchange: E,
        store: Store,
        symbol: Symbol,
        symbol_info: SymbolInfo,
        strategy_id: StrategyId,
        strategy: GridStrategy,
        breaker: CircuitBreaker,
    ) -> Result<Self, EngineError> {
        let slots = SlotTable::load(&store, &symbol)?;
        let planner = ActionPlanner::new(Decimal::new(1, symbol_info.price_decimals));
        let workflows = WorkflowStore::new(store.clone());
        let trend = TrendClassifier::new(strategy.trend_config().clone());

        Ok(Self {
            exchange,
            store,
            workflows,
            symbol,
            symbol_info,
            strategy_id,
            strategy,
            slots,
            planner,
            breaker,
            trend,
            regime: Regime::Range,
            sequence: 0,
        })
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn breaker_mut(&mut self) -> &mut CircuitBreaker {
        &mut self.breaker
    }

    /// The regime last computed by [`Self::on_price_update`] (breaker state
    /// combined with the trend classifier), for logging/monitoring.
    pub fn regime(&self) -> Regime {
        self.regime
    }

    /// Ensure `n` free slots exist, creating fresh ones if the table is new
    /// or the grid's configured level count has grown.
    pub fn ensure_slot_capacity(&mut self, n: i64, now_ms: i64) -> Result<(), EngineError> {
        let existing = self.slots.all().count() as i64;
        for slot_id in existing..n {
            self.slots.insert(Slot::new_free(slot_id, Side::Buy, Decimal::ZERO, Decimal::ZERO, now_ms));
        }
        self.slots.persist(&self.store, &self.symbol)?;
        Ok(())
    }

    /// Feed one price tick: update the ATR indicator, compute the target
    /// state, diff against the slot table, and dispatch the resulting
    /// actions. A tripped breaker still allows cancels but blocks new buys;
    /// `allows_sell` is always true so inventory can still be flattened.
    pub async fn on_price_update(
        &mut self,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        position_qty: Decimal,
        minute_of_day_utc: u16,
        now_ms: i64,
    ) -> Result<Vec<SlotAction>, EngineError> {
        self.strategy.on_kline(high, low, close);

        // The breaker's HIGH_VOLATILITY always overrides whatever the trend
        // classifier reports; otherwise the classifier's RANGE/BULL_TREND/
        // BEAR_TREND label drives the strategy's regime filter (spec 4.6).
        let trend_regime = self.trend.classify(close);
        let regime = if self.breaker.state() == BreakerState::Open {
            Regime::HighVolatility
        } else {
            trend_regime
        };

        if regime != self.regime {
            info!("Regime Changed: {} -> {}", self.regime, regime);
            self.regime = regime;
        }

        let mut target = self.strategy.compute_target_state(close, position_qty, regime, minute_of_day_utc);
        if !self.breaker.allows_buy() {
            target.orders.retain(|o| o.side != Side::Buy);
        }

        for order in target.orders.iter_mut() {
            order.price = self.symbol_info.round_price(order.price);
            order.qty = self.symbol_info.round_qty(order.qty);
        }

        self.dispatch(&target).await
    }

    async fn dispatch(&mut self, target: &TargetState) -> Result<Vec<SlotAction>, EngineError> {
        let actions = self.planner.plan(target, &self.slots, &self.strategy_id);

        for action in &actions {
            self.sequence += 1;
            let workflow_id = WorkflowId::derive(&[self.symbol.as_str(), &self.sequence.to_string()]);

            if self.workflows.is_success(&workflow_id)? {
                continue;
            }
            self.workflows.begin(&workflow_id, "dispatch_slot_action", "", chrono_now_ms())?;

            let result = self.execute(action).await;
            match &result {
                Ok(()) => {
                    self.workflows.complete(&workflow_id, "dispatch_slot_action", "", WorkflowStatus::Success, &true, chrono_now_ms())?;
                }
                Err(err) => {
                    warn!(?err, ?action, "slot action failed");
                    self.workflows.complete(&workflow_id, "dispatch_slot_action", "", WorkflowStatus::Failed, &false, chrono_now_ms())?;
                }
            }
        }

        Ok(actions)
    }

    async fn execute(&mut self, action: &SlotAction) -> Result<(), EngineError> {
        match action {
            SlotAction::Place { slot_id, side, price, qty, cid } => {
                let key = OrderKey::new(self.exchange.exchange_id(), self.symbol.clone(), self.strategy_id.clone(), cid.clone());
                let request = OrderRequestOpen::new(
                    key,
                    RequestOpen::new(*side, *price, *qty, OrderType::Limit, TimeInForce::GoodUntilCancelled, false, false),
                );

                if let Some(slot) = self.slots.get_mut(*slot_id) {
                    slot.client_order_id = Some(cid.clone());
                }
                self.slots.persist_one(&self.store, &self.symbol, *slot_id)?;

                match self.exchange.place_order(request).await {
                    Ok(order) => {
                        if let Some(slot) = self.slots.get_mut(*slot_id) {
                            let status = OrderState::Active(order.state.clone()).wire_status();
                            slot.apply_status(status, Decimal::ZERO, chrono_now_ms());
                            slot.order_id = order.state.order_id();
                        }
                        self.slots.persist_one(&self.store, &self.symbol, *slot_id)?;
                        Ok(())
                    }
                    Err(err) => {
                        if let Some(slot) = self.slots.get_mut(*slot_id) {
                            slot.reset_to_free(chrono_now_ms());
                        }
                        self.slots.persist_one(&self.store, &self.symbol, *slot_id)?;
                        Err(err.into())
                    }
                }
            }
            SlotAction::Cancel { slot_id, cid } => {
                let order_id = self.slots.get(*slot_id).and_then(|s| s.order_id.clone());
                let key = OrderKey::new(self.exchange.exchange_id(), self.symbol.clone(), self.strategy_id.clone(), cid.clone());
                let request = OrderRequestCancel::new(key, RequestCancel::new(order_id));

                self.exchange.cancel_order(request).await?;
                if let Some(slot) = self.slots.get_mut(*slot_id) {
                    slot.settle(chrono_now_ms());
                }
                self.slots.persist_one(&self.store, &self.symbol, *slot_id)?;
                Ok(())
            }
        }
    }

    /// Apply a venue order-state update to whichever slot owns it. A fully
    /// filled slot is immediately settled back to `FREE`; a venue-initiated
    /// cancel/reject/expiry is freed the same way rather than left parked
    /// in `SlotState::Canceled`, since neither `free_slots()` nor
    /// `locked_slots()` ever see a slot in that state again otherwise (spec
    /// 4.5's `LOCKED --cancel/reject/expire--> FREE` transition).
    ///
    /// An update whose `client_order_id` matches no slot — typically a fill
    /// the engine missed across a restart — is treated as a ghost fill: the
    /// caller is handed back the fill so it can reconcile its own position
    /// tracker immediately, ahead of the venue's position stream catching
    /// up (spec 4.5.2).
    pub fn on_order_update(&mut self, order: vantage_execution::Order<OrderState>, now_ms: i64) -> Result<Option<GhostFill>, EngineError> {
        let status = order.state.wire_status();
        let executed_qty = match &order.state {
            OrderState::Active(vantage_execution::ActiveOrderState::Open(open)) => open.filled_quantity,
            _ => order.quantity,
        };

        let slot = match self.slots.find_by_client_order_id_mut(order.client_order_id()) {
            Some(slot) => slot,
            None => return Ok(self.reconcile_ghost_update(&order, status, executed_qty)),
        };

        let changed = slot.apply_status(status, executed_qty, now_ms);
        match status {
            vantage_instrument::OrderStatus::Filled => slot.settle(now_ms),
            vantage_instrument::OrderStatus::Canceled
            | vantage_instrument::OrderStatus::Rejected
            | vantage_instrument::OrderStatus::Expired => slot.reset_to_free(now_ms),
            _ => {}
        }
        let slot_id = slot.slot_id;
        if changed {
            self.slots.persist_one(&self.store, &self.symbol, slot_id)?;
        }
        Ok(None)
    }

    /// An order update for a `client_order_id` this engine has no slot
    /// record of. If it actually reports executed quantity, it is a ghost
    /// fill the venue knows about that local state lost track of (e.g. a
    /// fill that landed in the gap between a crash and recovery); any other
    /// status (a bare reject/cancel/expiry with nothing executed) has no
    /// inventory impact and is just noise to log.
    fn reconcile_ghost_update(
        &self,
        order: &vantage_execution::Order<OrderState>,
        status: vantage_instrument::OrderStatus,
        executed_qty: Decimal,
    ) -> Option<GhostFill> {
        let is_fill = matches!(
            status,
            vantage_instrument::OrderStatus::Filled | vantage_instrument::OrderStatus::PartiallyFilled
        );

        if is_fill && executed_qty > Decimal::ZERO {
            warn!(
                cid = %order.client_order_id(),
                side = ?order.side,
                %executed_qty,
                "ghost fill: order update for unknown client_order_id, reconciling inventory",
            );
            Some(GhostFill { side: order.side, qty: executed_qty, price: order.price })
        } else {
            debug!(cid = %order.client_order_id(), ?status, "order update for unknown client_order_id, ignoring");
            None
        }
    }

    /// Reconcile in-memory/durable slot state against the venue's actual
    /// open orders on startup or after a reconnect. Any slot claiming to be
    /// `LOCKED` with no matching live order is a ghost and is freed.
    pub async fn sync_orders(&mut self) -> Result<(), EngineError> {
        let live = self.exchange.get_open_orders(&self.symbol).await?;
        let locked_slot_ids: Vec<i64> = self.slots.locked_slots().map(|s| s.slot_id).collect();

        for slot_id in locked_slot_ids {
            let has_live_order = self.slots.get(slot_id).and_then(|s| s.order_id.as_ref()).map(|id| {
                live.iter().any(|o| o.state.order_id().as_ref() == Some(id))
            });

            if has_live_order != Some(true) {
                if let Some(slot) = self.slots.get_mut(slot_id) {
                    warn!(slot_id, "ghost order detected during sync, freeing slot");
                    slot.reset_to_free(chrono_now_ms());
                }
                self.slots.persist_one(&self.store, &self.symbol, slot_id)?;
            }
        }

        info!(symbol = %self.symbol, live_orders = live.len(), "order sync complete");
        Ok(())
    }

    pub fn exchange_id(&self) -> ExchangeId {
        self.exchange.exchange_id()
    }

    pub fn slots(&self) -> &SlotTable {
        &self.slots
    }
}

/// Monotonic-ish wall clock reader used by the engine. A thin wrapper so
/// call sites read `chrono_now_ms()` rather than repeating the cast,
/// matching how other Vantage crates centralise their single time source.
fn chrono_now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn a_freshly_loaded_slot_table_for_an_unseen_symbol_is_empty() {
        let store = Store::open_in_memory().unwrap();
        let slots = SlotTable::load(&store, &Symbol::from("BTCUSDT")).unwrap();
        assert_eq!(slots.all().count(), 0);
    }

    #[test]
    fn symbol_info_rounds_price_and_qty_to_their_declared_precision() {
        let info = SymbolInfo::new(Symbol::from("BTCUSDT"), "BTC".into(), "USDT".into(), 2, 4, dec!(0.0001), dec!(1));
        assert_eq!(info.round_price(dec!(39_990.12345)), dec!(39_990.12));
        assert_eq!(info.round_qty(dec!(0.123456)), dec!(0.1235));
    }
}
