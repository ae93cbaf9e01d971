use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use vantage_instrument::exchange::ExchangeId;
use vantage_risk::RiskConfig;
use vantage_strategy::{GridConfig, SkewMode};

/// Process-level configuration for the `gateway` binary.
///
/// File/env/CLI loading is out of scope; this is the plain
/// `serde`-deserialisable shape such a loader would populate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Venue this process owns the one live connection to.
    pub exchange_id: ExchangeId,
    /// Human-readable name surfaced by `GetName`/logs.
    pub name: String,
    /// Deadline for draining in-flight streams on graceful shutdown.
    #[serde(with = "duration_ms")]
    pub shutdown_drain: std::time::Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            exchange_id: ExchangeId::Simulated,
            name: "vantage-gateway".to_string(),
            shutdown_drain: std::time::Duration::from_secs(5),
        }
    }
}

/// Process-level configuration for the `trader` binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Path to the durable WAL-journaled store. `None` runs against an
    /// in-memory store, useful for demos and tests that don't need to
    /// survive a restart.
    pub store_path: Option<std::path::PathBuf>,
    pub connect: vantage_client::ConnectConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self { store_path: None, connect: vantage_client::ConnectConfig::default() }
    }
}

/// A grid configuration sane for local development/demos: ten levels each
/// side of the anchor, a round-number interval and linearly tapering size.
/// Real deployments override every field from their own config source.
pub fn default_grid_config() -> GridConfig {
    GridConfig {
        base_interval: Decimal::new(50, 0),
        levels: 5,
        base_qty: Decimal::new(1, 1),
        qty_taper: Decimal::new(9, 1),
        skew_mode: SkewMode::Multiplicative,
        skew_factor: Decimal::new(1, 1),
        max_inventory_qty: Decimal::new(10, 0),
        atr_period: 14,
        volatility_scale: vantage_risk::VolatilityScaler {
            base_volatility: Decimal::new(1, 2),
            min_scale: Decimal::new(5, 1),
            max_scale: Decimal::new(2, 0),
        },
        off_windows: Vec::new(),
        trend: vantage_strategy::TrendConfig::default(),
    }
}

pub fn default_risk_config() -> RiskConfig {
    RiskConfig::default()
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_config_default_is_simulated_and_serving_soon() {
        let config = GatewayConfig::default();
        assert_eq!(config.exchange_id, ExchangeId::Simulated);
        assert!(!config.shutdown_drain.is_zero());
    }

    #[test]
    fn default_grid_config_emits_levels_on_both_sides() {
        let grid = default_grid_config();
        assert_eq!(grid.levels, 5);
        assert!(grid.base_qty > Decimal::ZERO);
    }
}
