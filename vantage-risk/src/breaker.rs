use crate::config::RiskConfig;
use rust_decimal::Decimal;
use std::time::Instant;
use tracing::{info, warn};

/// Circuit breaker lifecycle state.
///
/// `CLOSED` trades normally. `OPEN` rejects placements and cancels resting
/// buy-side orders. `HALF_OPEN` allows a small number of probe orders; enough
/// consecutive successes return the breaker to `CLOSED`, any failure sends it
/// straight back to `OPEN`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

/// Why the breaker most recently tripped. Carried for logging/alerting; does
/// not change trip behaviour.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TripReason {
    ConsecutiveLosses,
    Drawdown,
    Latency,
    FundingStale,
    BasisStop,
    Manual,
}

/// Per-symbol (or per-process) breaker. Holds no venue handle: callers are
/// responsible for acting on `allows_buy`/`allows_sell` and for cancelling
/// resting orders when [`CircuitBreaker::trip`] fires.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    config: RiskConfig,
    state: BreakerState,
    reason: Option<TripReason>,
    opened_at: Option<Instant>,
    consecutive_losses: u32,
    half_open_successes: u32,
    basis_adverse_streak: u32,
}

impl CircuitBreaker {
    pub fn new(config: RiskConfig) -> Self {
        Self {
            config,
            state: BreakerState::Closed,
            reason: None,
            opened_at: None,
            consecutive_losses: 0,
            half_open_successes: 0,
            basis_adverse_streak: 0,
        }
    }

    pub fn state(&self) -> BreakerState {
        self.state
    }

    pub fn reason(&self) -> Option<TripReason> {
        self.reason
    }

    /// Buy-side placements are blocked whenever the breaker is `OPEN`.
    /// `HALF_OPEN` allows limited probing; callers gate probe volume
    /// themselves and report the outcome via [`Self::record_probe_result`].
    pub fn allows_buy(&self) -> bool {
        !matches!(self.state, BreakerState::Open)
    }

    /// Sell-side (reduce-only) placements are always allowed while tripped,
    /// since an open breaker must still be able to flatten inventory.
    pub fn allows_sell(&self) -> bool {
        true
    }

    /// Feed the outcome of a completed trade. A loss increments the
    /// consecutive-loss counter and may trip the breaker; any non-loss
    /// resets the counter to zero.
    pub fn record_trade_pnl(&mut self, realised_pnl: Decimal) {
        if realised_pnl < Decimal::ZERO {
            self.consecutive_losses += 1;
            if self.consecutive_losses >= self.config.consecutive_loss_limit {
                self.trip(TripReason::ConsecutiveLosses);
            }
        } else {
            self.consecutive_losses = 0;
        }
    }

    /// Feed a drawdown fraction (e.g. from [`crate::drawdown::DrawdownTracker`]).
    pub fn record_drawdown(&mut self, drawdown: Decimal) {
        if drawdown > self.config.drawdown_limit {
            self.trip(TripReason::Drawdown);
        }
    }

    /// Feed a p99 latency reading (e.g. from [`crate::latency::LatencyTracker`]).
    pub fn record_latency_p99(&mut self, p99_ms: u64) {
        if p99_ms >= self.config.latency_limit_ms {
            self.trip(TripReason::Latency);
        }
    }

    /// Either funding leg is older than the configured TTL.
    pub fn record_funding_staleness(&mut self, stale: bool) {
        if stale {
            self.trip(TripReason::FundingStale);
        }
    }

    /// Feed one basis reading. Returns `true` the instant the basis-stop
    /// threshold is crossed (distinct from a general trip, since an arb exit
    /// is a one-shot unwind rather than an ongoing breaker state for callers
    /// that don't otherwise consult `state()`).
    pub fn record_basis_reading(&mut self, adverse: bool) -> bool {
        if adverse {
            self.basis_adverse_streak += 1;
        } else {
            self.basis_adverse_streak = 0;
        }

        if self.basis_adverse_streak >= self.config.basis_stop_consecutive {
            self.trip(TripReason::BasisStop);
            true
        } else {
            false
        }
    }

    pub fn trip(&mut self, reason: TripReason) {
        if self.state != BreakerState::Open {
            warn!(?reason, "circuit breaker tripped OPEN");
        }
        self.state = BreakerState::Open;
        self.reason = Some(reason);
        self.opened_at = Some(Instant::now());
        self.half_open_successes = 0;
    }

    /// Operator override: force the breaker open regardless of thresholds.
    pub fn force_trip(&mut self) {
        self.trip(TripReason::Manual);
    }

    /// Operator override: force the breaker immediately back to `CLOSED`,
    /// atomically resetting every counter so no stale state lingers.
    pub fn force_reset(&mut self) {
        self.reset_to_closed();
    }

    /// Advance `OPEN -> HALF_OPEN` once the cooldown has elapsed. No-op
    /// outside `OPEN`. Returns `true` if the transition happened.
    pub fn try_half_open(&mut self) -> bool {
        let BreakerState::Open = self.state else {
            return false;
        };
        let elapsed = self
            .opened_at
            .map(|at| at.elapsed() >= self.config.cooldown)
            .unwrap_or(false);

        if elapsed {
            info!("circuit breaker cooldown elapsed, entering HALF_OPEN");
            self.state = BreakerState::HalfOpen;
            self.half_open_successes = 0;
        }
        elapsed
    }

    /// Report the outcome of a `HALF_OPEN` probe order. Any failure reopens
    /// the breaker immediately; enough consecutive successes closes it.
    pub fn record_probe_result(&mut self, success: bool) {
        let BreakerState::HalfOpen = self.state else {
            return;
        };

        if !success {
            warn!("HALF_OPEN probe failed, reopening circuit breaker");
            self.trip(TripReason::Manual);
            return;
        }

        self.half_open_successes += 1;
        if self.half_open_successes >= self.config.half_open_required_successes {
            info!("circuit breaker probes satisfied, closing");
            self.reset_to_closed();
        }
    }

    fn reset_to_closed(&mut self) {
        self.state = BreakerState::Closed;
        self.reason = None;
        self.opened_at = None;
        self.consecutive_losses = 0;
        self.half_open_successes = 0;
        self.basis_adverse_streak = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn fast_config() -> RiskConfig {
        RiskConfig {
            consecutive_loss_limit: 3,
            cooldown: Duration::from_millis(0),
            half_open_required_successes: 2,
            ..RiskConfig::default()
        }
    }

    #[test]
    fn consecutive_losses_trip_breaker() {
        let mut breaker = CircuitBreaker::new(fast_config());
        breaker.record_trade_pnl(dec!(-1));
        breaker.record_trade_pnl(dec!(-1));
        assert_eq!(breaker.state(), BreakerState::Closed);
        breaker.record_trade_pnl(dec!(-1));
        assert_eq!(breaker.state(), BreakerState::Open);
        assert_eq!(breaker.reason(), Some(TripReason::ConsecutiveLosses));
        assert!(!breaker.allows_buy());
        assert!(breaker.allows_sell());
    }

    #[test]
    fn a_win_resets_the_consecutive_loss_counter() {
        let mut breaker = CircuitBreaker::new(fast_config());
        breaker.record_trade_pnl(dec!(-1));
        breaker.record_trade_pnl(dec!(-1));
        breaker.record_trade_pnl(dec!(1));
        breaker.record_trade_pnl(dec!(-1));
        breaker.record_trade_pnl(dec!(-1));
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[test]
    fn half_open_requires_consecutive_successes() {
        let mut breaker = CircuitBreaker::new(fast_config());
        breaker.force_trip();
        assert!(breaker.try_half_open());
        assert_eq!(breaker.state(), BreakerState::HalfOpen);

        breaker.record_probe_result(true);
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
        breaker.record_probe_result(true);
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[test]
    fn half_open_failure_reopens_immediately() {
        let mut breaker = CircuitBreaker::new(fast_config());
        breaker.force_trip();
        breaker.try_half_open();
        breaker.record_probe_result(true);
        breaker.record_probe_result(false);
        assert_eq!(breaker.state(), BreakerState::Open);
    }

    #[test]
    fn basis_stop_counts_consecutive_adverse_readings() {
        let mut breaker = CircuitBreaker::new(fast_config());
        assert!(!breaker.record_basis_reading(true));
        assert!(!breaker.record_basis_reading(true));
        // A favourable reading in between resets the streak.
        assert!(!breaker.record_basis_reading(false));
        assert!(!breaker.record_basis_reading(true));
        assert!(!breaker.record_basis_reading(true));
        assert!(breaker.record_basis_reading(true));
        assert_eq!(breaker.reason(), Some(TripReason::BasisStop));
    }

    #[test]
    fn force_reset_clears_all_counters() {
        let mut breaker = CircuitBreaker::new(fast_config());
        breaker.record_trade_pnl(dec!(-1));
        breaker.record_trade_pnl(dec!(-1));
        breaker.force_trip();
        breaker.force_reset();
        assert_eq!(breaker.state(), BreakerState::Closed);
        // Counter was reset, so two more losses should not immediately trip.
        breaker.record_trade_pnl(dec!(-1));
        breaker.record_trade_pnl(dec!(-1));
        assert_eq!(breaker.state(), BreakerState::Closed);
    }
}
