use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a [`crate::breaker::CircuitBreaker`].
///
/// Every threshold named in the breaker design is a field here rather than a
/// constant: TTLs and windows are environment-specific (a quiet funding
/// market can tolerate a longer staleness TTL than a manic one) and must not
/// be hard-coded into the trigger logic.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RiskConfig {
    /// Consecutive realised-loss trades before tripping OPEN.
    pub consecutive_loss_limit: u32,
    /// Drawdown fraction (e.g. `0.1` = 10%) within `drawdown_window` before tripping.
    pub drawdown_limit: rust_decimal::Decimal,
    /// Rolling window over which drawdown is evaluated.
    #[serde(with = "duration_ms")]
    pub drawdown_window: Duration,
    /// p99 exchange RTT threshold before tripping.
    pub latency_limit_ms: u64,
    /// Sample count for the latency sliding window.
    pub latency_window_samples: usize,
    /// Funding-rate feed staleness TTL; either leg stale blocks new arb entries.
    pub funding_staleness_ttl_ms: i64,
    /// Consecutive adverse basis readings before forcing an arb exit.
    pub basis_stop_consecutive: u32,
    /// Cooldown after tripping before the breaker allows a `HALF_OPEN` probe.
    #[serde(with = "duration_ms")]
    pub cooldown: Duration,
    /// Successful probes required in `HALF_OPEN` before returning to `CLOSED`.
    pub half_open_required_successes: u32,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            consecutive_loss_limit: 5,
            drawdown_limit: rust_decimal::Decimal::new(10, 2), // 0.10
            drawdown_window: Duration::from_secs(15 * 60),
            latency_limit_ms: 2_000,
            latency_window_samples: 60,
            funding_staleness_ttl_ms: 5 * 60 * 1_000,
            basis_stop_consecutive: 3,
            cooldown: Duration::from_secs(60),
            half_open_required_successes: 3,
        }
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(de)?;
        Ok(Duration::from_millis(millis))
    }
}
