use crate::workflow::{WorkflowId, WorkflowStatus, WorkflowStore};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{info, warn};
use vantage_execution::exchange::Exchange;
use vantage_execution::{
    ClientError, ClientOrderId, OrderKey, OrderRequestCancel, OrderRequestOpen, RequestCancel,
    RequestOpen, StrategyId,
};
use vantage_instrument::{OrderType, Side, TimeInForce};
use vantage_strategy::ArbOpportunity;

#[derive(Debug, Error)]
pub enum ArbError {
    #[error("store: {0}")]
    Store(#[from] crate::store::StoreError),

    #[error("exchange: {0}")]
    Client(#[from] ClientError),
}

/// Outcome of running one funding-arb entry or exit workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbFillOutcome {
    pub long_leg_executed_qty: Decimal,
    pub short_leg_executed_qty: Decimal,
    /// `min` of the two legs' executed quantity: the position actually held
    /// after hedge-sizing reconciles any partial-fill asymmetry.
    pub hedged_qty: Decimal,
    pub compensated: bool,
}

/// Deterministic id for one leg of an arb entry/exit:
/// `client_order_id = H(symbol, next_funding_time, leg)`. Distinct from the
/// grid's `ClientOrderId::deterministic` (keyed on price level) since an arb
/// leg has no notion of a price ladder, only a funding epoch.
fn leg_client_order_id(symbol: &str, next_funding_time_ms: i64, leg: &str) -> ClientOrderId {
    let mut hasher = Sha256::new();
    hasher.update(symbol.as_bytes());
    hasher.update([0u8]);
    hasher.update(next_funding_time_ms.to_le_bytes());
    hasher.update([0u8]);
    hasher.update(leg.as_bytes());
    let digest = hasher.finalize();
    ClientOrderId::new(hex::encode(&digest[..8]))
}

/// Runs a funding-arb entry (or, with an opportunity whose legs are already
/// reversed, an exit) as one durable workflow: both legs placed in parallel
/// as IOC orders, fills awaited, and any asymmetry between the two legs'
/// executed quantity resolved by either scaling down the larger fill's
/// resting remainder or cancelling/unwinding the excess.
///
/// `use_margin` on the short leg's request is the only place margin routing
/// enters this workflow; it is carried unchanged into the compensation path
/// so a spot short that failed over to margin doesn't silently unwind
/// through a plain spot order.
pub struct ArbWorkflow<L: Exchange, S: Exchange> {
    long_exchange: L,
    short_exchange: S,
    workflows: WorkflowStore,
    strategy_id: StrategyId,
}

impl<L: Exchange, S: Exchange> ArbWorkflow<L, S> {
    pub fn new(long_exchange: L, short_exchange: S, workflows: WorkflowStore, strategy_id: StrategyId) -> Self {
        Self { long_exchange, short_exchange, workflows, strategy_id }
    }

    /// Enter one arb position. `next_funding_time_ms` both seeds the
    /// deterministic workflow id (so a crash-and-retry recognises the same
    /// attempt rather than placing a second pair of legs) and the two legs'
    /// deterministic `client_order_id`s.
    pub async fn run_entry(&self, opportunity: &ArbOpportunity, next_funding_time_ms: i64, now_ms: i64) -> Result<ArbFillOutcome, ArbError> {
        self.run(opportunity, next_funding_time_ms, "entry", now_ms).await
    }

    /// Exit a position opened by [`Self::run_entry`]. The caller passes an
    /// opportunity whose `notional` reflects the recorded executed quantity
    /// from entry, not a freshly computed size, and whose legs are the same
    /// venues/symbols as entry (direction is inverted by swapping `side`
    /// inside the request construction, not by swapping long/short venues).
    pub async fn run_exit(&self, opportunity: &ArbOpportunity, next_funding_time_ms: i64, now_ms: i64) -> Result<ArbFillOutcome, ArbError> {
        self.run(opportunity, next_funding_time_ms, "exit", now_ms).await
    }

    async fn run(&self, opportunity: &ArbOpportunity, next_funding_time_ms: i64, phase: &str, now_ms: i64) -> Result<ArbFillOutcome, ArbError> {
        let workflow_id = WorkflowId::derive(&[opportunity.symbol.as_str(), &next_funding_time_ms.to_string(), phase]);

        if self.workflows.is_success(&workflow_id)? {
            if let Some(record) = self.workflows.get(&workflow_id)? {
                if let Some(outcome) = self.workflows.decode_output(&record)? {
                    return Ok(outcome);
                }
            }
        }
        self.workflows.begin(&workflow_id, &format!("arb_{phase}"), opportunity.symbol.as_str(), now_ms)?;

        let (exit, entering) = (phase == "exit", phase == "entry");
        let long_side = if exit { Side::Sell } else { Side::Buy };
        let short_side = if exit { Side::Buy } else { Side::Sell };
        let _ = entering;

        let long_cid = leg_client_order_id(opportunity.symbol.as_str(), next_funding_time_ms, "long");
        let short_cid = leg_client_order_id(opportunity.symbol.as_str(), next_funding_time_ms, "short");

        let long_price = self.long_exchange.get_latest_price(&opportunity.long_leg.1).await?.price;
        let short_price = self.short_exchange.get_latest_price(&opportunity.short_leg.1).await?.price;

        let long_request = OrderRequestOpen::new(
            OrderKey::new(opportunity.long_leg.0, opportunity.long_leg.1.clone(), self.strategy_id.clone(), long_cid.clone()),
            RequestOpen::new(long_side, long_price, opportunity.notional, OrderType::Limit, TimeInForce::ImmediateOrCancel, exit, false),
        );
        let short_request = OrderRequestOpen::new(
            OrderKey::new(opportunity.short_leg.0, opportunity.short_leg.1.clone(), self.strategy_id.clone(), short_cid.clone()),
            RequestOpen::new(short_side, short_price, opportunity.notional, OrderType::Limit, TimeInForce::ImmediateOrCancel, exit, opportunity.use_margin_spot),
        );

        let (long_result, short_result) = tokio::join!(
            self.long_exchange.place_order(long_request),
            self.short_exchange.place_order(short_request),
        );

        let long_filled = long_result.as_ref().map(filled_quantity).unwrap_or(Decimal::ZERO);
        let short_filled = short_result.as_ref().map(filled_quantity).unwrap_or(Decimal::ZERO);

        let hedged_qty = long_filled.min(short_filled);
        let zero_fill = hedged_qty.is_zero() && (long_filled > Decimal::ZERO || short_filled > Decimal::ZERO);

        if zero_fill {
            warn!(symbol = %opportunity.symbol, %long_filled, %short_filled, "one arb leg filled, the other did not: compensating");
            if long_filled > Decimal::ZERO {
                self.unwind_long(opportunity, &long_cid, long_filled, long_side).await?;
            }
            if short_filled > Decimal::ZERO {
                self.unwind_short(opportunity, &short_cid, short_filled, short_side).await?;
            }
        } else if long_filled != short_filled {
            info!(symbol = %opportunity.symbol, %long_filled, %short_filled, "resizing the larger leg down to match the smaller fill");
            if long_filled > hedged_qty {
                self.unwind_long(opportunity, &long_cid, long_filled - hedged_qty, long_side).await?;
            }
            if short_filled > hedged_qty {
                self.unwind_short(opportunity, &short_cid, short_filled - hedged_qty, short_side).await?;
            }
        }

        let outcome = ArbFillOutcome {
            long_leg_executed_qty: long_filled,
            short_leg_executed_qty: short_filled,
            hedged_qty,
            compensated: zero_fill,
        };

        let status = if hedged_qty.is_zero() && zero_fill { WorkflowStatus::Failed } else { WorkflowStatus::Success };
        self.workflows.complete(&workflow_id, &format!("arb_{phase}"), opportunity.symbol.as_str(), status, &outcome, now_ms)?;

        Ok(outcome)
    }

    /// Cancel the long leg's resting remainder and close the excess at
    /// market on the opposite side of the leg that was just attempted.
    async fn unwind_long(&self, opportunity: &ArbOpportunity, cid: &ClientOrderId, qty: Decimal, attempted_side: Side) -> Result<(), ArbError> {
        let cancel = OrderRequestCancel::new(
            OrderKey::new(opportunity.long_leg.0, opportunity.long_leg.1.clone(), self.strategy_id.clone(), cid.clone()),
            RequestCancel::new(None),
        );
        let _ = self.long_exchange.cancel_order(cancel).await;

        if qty > Decimal::ZERO {
            let price = self.long_exchange.get_latest_price(&opportunity.long_leg.1).await?.price;
            let request = OrderRequestOpen::new(
                OrderKey::new(opportunity.long_leg.0, opportunity.long_leg.1.clone(), self.strategy_id.clone(), ClientOrderId::random()),
                RequestOpen::new(attempted_side.opposite(), price, qty, OrderType::Market, TimeInForce::ImmediateOrCancel, true, false),
            );
            self.long_exchange.place_order(request).await?;
        }
        Ok(())
    }

    /// Cancel the short leg's resting remainder and close the excess at
    /// market, preserving `use_margin` so a margin short is unwound through
    /// the same collateral path it was opened on.
    async fn unwind_short(&self, opportunity: &ArbOpportunity, cid: &ClientOrderId, qty: Decimal, attempted_side: Side) -> Result<(), ArbError> {
        let cancel = OrderRequestCancel::new(
            OrderKey::new(opportunity.short_leg.0, opportunity.short_leg.1.clone(), self.strategy_id.clone(), cid.clone()),
            RequestCancel::new(None),
        );
        let _ = self.short_exchange.cancel_order(cancel).await;

        if qty > Decimal::ZERO {
            let price = self.short_exchange.get_latest_price(&opportunity.short_leg.1).await?.price;
            let request = OrderRequestOpen::new(
                OrderKey::new(opportunity.short_leg.0, opportunity.short_leg.1.clone(), self.strategy_id.clone(), ClientOrderId::random()),
                RequestOpen::new(attempted_side.opposite(), price, qty, OrderType::Market, TimeInForce::ImmediateOrCancel, true, opportunity.use_margin_spot),
            );
            self.short_exchange.place_order(request).await?;
        }
        Ok(())
    }
}

fn filled_quantity(order: &vantage_execution::Order<vantage_execution::state::ActiveOrderState>) -> Decimal {
    match &order.state {
        vantage_execution::state::ActiveOrderState::Open(open) => open.filled_quantity,
        _ => Decimal::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn hedged_qty_is_the_smaller_of_the_two_legs() {
        let outcome = ArbFillOutcome {
            long_leg_executed_qty: dec!(0.9),
            short_leg_executed_qty: dec!(0.4),
            hedged_qty: dec!(0.4),
            compensated: false,
        };
        assert_eq!(outcome.hedged_qty, outcome.long_leg_executed_qty.min(outcome.short_leg_executed_qty));
    }

    #[test]
    fn leg_client_order_id_is_stable_and_distinguishes_legs() {
        let a = leg_client_order_id("BTCUSDT", 1_700_000_000_000, "long");
        let b = leg_client_order_id("BTCUSDT", 1_700_000_000_000, "long");
        let c = leg_client_order_id("BTCUSDT", 1_700_000_000_000, "short");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
