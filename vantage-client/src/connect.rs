use std::time::Duration;
use tracing::{info, warn};
use vantage_execution::{ClientError, ConnectivityError};
use vantage_gateway::{GatewayRequest, GatewayResponse, GatewayTransport};
use vantage_metrics::Counters;

/// Connect-with-backoff policy: exponential backoff from `initial_backoff`
/// doubling up to `max_backoff`, capped at `max_attempts` attempts, each
/// bounded by `handshake_timeout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectConfig {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub handshake_timeout: Duration,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            handshake_timeout: Duration::from_secs(10),
        }
    }
}

impl ConnectConfig {
    fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(31);
        self.initial_backoff.saturating_mul(1u32 << shift).min(self.max_backoff)
    }
}

/// Dial `transport` with a `CheckHealth` handshake, retrying per
/// [`ConnectConfig`] until it succeeds or the attempt cap is reached. Fails
/// fast (no infinite retry) so the caller can exit non-zero on a
/// Fatal-Startup error.
pub async fn connect_with_backoff<T: GatewayTransport>(
    transport: &T,
    config: ConnectConfig,
    metrics: &Counters,
) -> Result<(), ClientError> {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        metrics.client_reconnect_attempt(attempt);
        info!(attempt, max_attempts = config.max_attempts, "connecting to gateway");

        let outcome = tokio::time::timeout(config.handshake_timeout, transport.call(GatewayRequest::CheckHealth)).await;

        match outcome {
            Ok(Ok(GatewayResponse::Health(true))) => {
                info!(attempt, "gateway handshake succeeded");
                return Ok(());
            }
            Ok(Ok(_)) => warn!(attempt, "gateway reported not serving"),
            Ok(Err(status)) => warn!(attempt, %status, "gateway handshake call failed"),
            Err(_) => warn!(attempt, timeout_ms = config.handshake_timeout.as_millis(), "gateway handshake timed out"),
        }

        if attempt >= config.max_attempts {
            return Err(ClientError::Connectivity(ConnectivityError::Timeout));
        }

        tokio::time::sleep(config.backoff_for_attempt(attempt)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_until_the_cap() {
        let config = ConnectConfig::default();
        assert_eq!(config.backoff_for_attempt(1), Duration::from_secs(1));
        assert_eq!(config.backoff_for_attempt(2), Duration::from_secs(2));
        assert_eq!(config.backoff_for_attempt(3), Duration::from_secs(4));
        assert_eq!(config.backoff_for_attempt(7), Duration::from_secs(60));
        assert_eq!(config.backoff_for_attempt(10), Duration::from_secs(60));
    }
}
