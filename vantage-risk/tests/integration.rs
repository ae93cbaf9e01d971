use rust_decimal_macros::dec;
use vantage_instrument::{exchange::ExchangeId, Symbol};
use vantage_risk::{
    alert::{RiskViolation, VecAlertHook},
    breaker::{BreakerState, CircuitBreaker, TripReason},
    check::{CheckHigherThan, CheckLossLimit, RiskCheck},
    config::RiskConfig,
    correlation::CorrelationMatrix,
    drawdown::DrawdownTracker,
    exposure::ExposureTracker,
    latency::LatencyTracker,
    position_tracker::PositionTracker,
    volatility::VolatilityScaler,
};

#[test]
fn exposure_alert_triggered() {
    let mut tracker: ExposureTracker<Symbol> = ExposureTracker::new();
    tracker.update(Symbol::from("BTCUSDT"), dec!(50));
    let alerts = VecAlertHook::default();
    tracker.check_limit(Symbol::from("BTCUSDT"), dec!(20), &alerts);
    assert!(matches!(alerts.alerts.lock().pop().unwrap(), RiskViolation::ExposureLimit { .. }));
}

#[test]
fn drawdown_alert_triggered() {
    let mut tracker: DrawdownTracker<Symbol> = DrawdownTracker::new();
    tracker.update_pnl(Symbol::from("BTCUSDT"), dec!(100));
    tracker.update_pnl(Symbol::from("BTCUSDT"), dec!(-60));
    let alerts = VecAlertHook::default();
    tracker.check_limit(Symbol::from("BTCUSDT"), dec!(0.3), &alerts);
    assert!(matches!(alerts.alerts.lock().pop().unwrap(), RiskViolation::DrawdownLimit { .. }));
}

#[test]
fn correlation_alert_triggered() {
    let mut corr: CorrelationMatrix<Symbol> = CorrelationMatrix::new();
    corr.set_limit(Symbol::from("BTCUSDT"), Symbol::from("ETHUSDT"), dec!(40));
    let alerts = VecAlertHook::default();
    corr.check_limit(Symbol::from("BTCUSDT"), Symbol::from("ETHUSDT"), dec!(50), &alerts);
    assert!(matches!(alerts.alerts.lock().pop().unwrap(), RiskViolation::CorrelationLimit { .. }));
}

#[test]
fn volatility_scaler_adjusts_position() {
    let scaler = VolatilityScaler::new(dec!(0.02), dec!(0.5), dec!(2));
    let adjusted = scaler.adjust_position(dec!(10), dec!(0.04));
    assert_eq!(adjusted, dec!(5));
}

#[test]
fn position_tracker_limits() {
    let mut tracker: PositionTracker<Symbol> = PositionTracker::new();
    tracker.update(ExchangeId::BinanceSpot, Symbol::from("BTCUSDT"), dec!(5));
    let alerts = VecAlertHook::default();
    tracker.check_limit(ExchangeId::BinanceSpot, Symbol::from("BTCUSDT"), dec!(2), &alerts);
    assert!(matches!(alerts.alerts.lock().pop().unwrap(), RiskViolation::ExposureLimit { .. }));
}

#[test]
fn loss_limit_check_blocks_oversized_orders() {
    let check = CheckLossLimit::new(dec!(100));
    assert!(check.check(&dec!(50)).is_ok());
    assert!(check.check(&dec!(150)).is_err());
}

#[test]
fn notional_ceiling_check_blocks_oversized_orders() {
    let check = CheckHigherThan::new(dec!(10_000));
    assert!(check.check(&dec!(9_999)).is_ok());
    assert!(check.check(&dec!(10_001)).is_err());
}

#[test]
fn latency_breaker_trips_once_p99_crosses_the_limit() {
    let mut tracker = LatencyTracker::new(5);
    let mut breaker = CircuitBreaker::new(RiskConfig { latency_limit_ms: 500, ..RiskConfig::default() });

    for rtt in [80, 90, 85, 95, 88] {
        tracker.record(rtt);
        breaker.record_latency_p99(tracker.p99_ms().unwrap());
    }
    assert_eq!(breaker.state(), BreakerState::Closed);

    tracker.record(5_000);
    breaker.record_latency_p99(tracker.p99_ms().unwrap());
    assert_eq!(breaker.state(), BreakerState::Open);
    assert_eq!(breaker.reason(), Some(TripReason::Latency));
}

#[test]
fn funding_staleness_trips_the_breaker() {
    let mut breaker = CircuitBreaker::new(RiskConfig::default());
    breaker.record_funding_staleness(false);
    assert_eq!(breaker.state(), BreakerState::Closed);
    breaker.record_funding_staleness(true);
    assert_eq!(breaker.state(), BreakerState::Open);
    assert_eq!(breaker.reason(), Some(TripReason::FundingStale));
}
