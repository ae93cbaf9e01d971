#![forbid(unsafe_code)]
#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    unused_qualifications
)]

//! Risk management primitives: exposure/drawdown/correlation/position
//! tracking, a volatility-based position scaler, pre-trade [`check`]s, a
//! rolling [`latency`] tracker, and the [`breaker::CircuitBreaker`] state
//! machine that ties them all into a single CLOSED/OPEN/HALF_OPEN gate.
//!
//! Every threshold consumed by the breaker lives in [`config::RiskConfig`]
//! rather than as a crate constant, since sensible values are
//! environment-specific and must be tunable without a rebuild.

pub mod alert;
pub mod breaker;
pub mod check;
pub mod config;
pub mod correlation;
pub mod drawdown;
pub mod exposure;
pub mod latency;
pub mod position_tracker;
pub mod volatility;

pub use alert::{RiskAlertHook, RiskViolation, VecAlertHook};
pub use breaker::{BreakerState, CircuitBreaker, TripReason};
pub use check::{CheckFailHigherThan, CheckFailLossLimit, CheckHigherThan, CheckLossLimit, RiskCheck};
pub use config::RiskConfig;
pub use correlation::CorrelationMatrix;
pub use drawdown::DrawdownTracker;
pub use exposure::ExposureTracker;
pub use latency::LatencyTracker;
pub use position_tracker::PositionTracker;
pub use volatility::VolatilityScaler;
