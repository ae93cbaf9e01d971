use crate::store::{checksum, verify_checksum, Store, StoreError};
use serde::{Deserialize, Serialize};
use vantage_instrument::exchange::ExchangeId;
use vantage_instrument::Symbol;
use vantage_risk::RiskConfig;
use vantage_strategy::GridConfig;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum SymbolStatus {
    Active,
    Paused,
    Removed,
}

impl SymbolStatus {
    fn as_str(self) -> &'static str {
        match self {
            SymbolStatus::Active => "ACTIVE",
            SymbolStatus::Paused => "PAUSED",
            SymbolStatus::Removed => "REMOVED",
        }
    }

    fn from_str(s: &str) -> Self {
        match s {
            "PAUSED" => SymbolStatus::Paused,
            "REMOVED" => SymbolStatus::Removed,
            _ => SymbolStatus::Active,
        }
    }
}

/// Everything a `SymbolManager` needs to stand a symbol's grid up, durably
/// recorded so a restart can reconstruct the full trading-pair set without
/// re-reading any external config source.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolConfig {
    pub symbol: Symbol,
    pub venue: ExchangeId,
    pub strategy: GridConfig,
    pub risk: RiskConfig,
    pub status: SymbolStatus,
}

/// Durable table of trading pairs the orchestrator should be running.
///
/// Adding or removing a pair is itself a workflow step (spec 4.6:
/// "AddTradingPair/RemoveTradingPair/StartOrchestrator are durable
/// workflows"): the mutation and its commit are one transaction, so a crash
/// between "operator requested a new pair" and "orchestrator spawned its
/// manager" is resolved by re-reading the registry on restart rather than by
/// replaying an external request queue.
#[derive(Debug, Clone)]
pub struct SymbolRegistry {
    store: Store,
}

impl SymbolRegistry {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Durably add (or update) a trading pair. Idempotent: adding the same
    /// symbol again just replaces its configuration.
    pub fn add_trading_pair(&self, config: &SymbolConfig) -> Result<(), StoreError> {
        self.put(config)
    }

    /// Durably mark a trading pair removed. The row is kept (not deleted) so
    /// the orchestrator can distinguish "never configured" from "configured,
    /// then torn down" when a stray event arrives after removal.
    pub fn remove_trading_pair(&self, symbol: &Symbol) -> Result<(), StoreError> {
        let mut config = self
            .get(symbol)?
            .ok_or_else(|| StoreError::ChecksumMismatch { table: "symbol_registry", key: symbol.as_str().to_string() })?;
        config.status = SymbolStatus::Removed;
        self.put(&config)
    }

    fn put(&self, config: &SymbolConfig) -> Result<(), StoreError> {
        let strategy_json = serde_json::to_string(&config.strategy)?;
        let risk_json = serde_json::to_string(&config.risk)?;
        let venue_str = config.venue.as_str().to_string();
        let status_str = config.status.as_str();
        let fields = [
            config.symbol.as_str(),
            venue_str.as_str(),
            strategy_json.as_str(),
            risk_json.as_str(),
            status_str,
        ];
        let sum = checksum(&fields);

        self.store.with_conn(|conn| {
            conn.execute(
                "INSERT INTO symbol_registry (symbol, venue, strategy_config, risk_config, status, checksum)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(symbol) DO UPDATE SET
                    venue = excluded.venue, strategy_config = excluded.strategy_config,
                    risk_config = excluded.risk_config, status = excluded.status,
                    checksum = excluded.checksum",
                rusqlite::params![config.symbol.as_str(), venue_str, strategy_json, risk_json, status_str, sum],
            )?;
            Ok(())
        })
    }

    pub fn get(&self, symbol: &Symbol) -> Result<Option<SymbolConfig>, StoreError> {
        let symbol_str = symbol.as_str().to_string();
        self.store.with_conn(|conn| {
            let result = conn.query_row(
                "SELECT venue, strategy_config, risk_config, status, checksum FROM symbol_registry WHERE symbol = ?1",
                [&symbol_str],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            );

            match result {
                Ok((venue, strategy_json, risk_json, status, stored_checksum)) => {
                    let fields = [symbol_str.as_str(), venue.as_str(), strategy_json.as_str(), risk_json.as_str(), status.as_str()];
                    verify_checksum("symbol_registry", &symbol_str, &fields, &stored_checksum)?;

                    Ok(Some(SymbolConfig {
                        symbol: symbol_str.as_str().into(),
                        venue: parse_exchange_id(&venue),
                        strategy: serde_json::from_str(&strategy_json)?,
                        risk: serde_json::from_str(&risk_json)?,
                        status: SymbolStatus::from_str(&status),
                    }))
                }
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    /// List every `ACTIVE` trading pair; called once on startup to rebuild
    /// the orchestrator's routing map (spec 4.6 `Recover()`).
    pub fn recover(&self) -> Result<Vec<SymbolConfig>, StoreError> {
        let symbols: Vec<String> = self.store.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT symbol FROM symbol_registry WHERE status = 'ACTIVE'")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })?;

        let mut configs = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            if let Some(config) = self.get(&Symbol::from(symbol.as_str()))? {
                configs.push(config);
            }
        }
        Ok(configs)
    }
}

fn parse_exchange_id(s: &str) -> ExchangeId {
    serde_json::from_str(&format!("\"{s}\"")).unwrap_or(ExchangeId::BinanceSpot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_config(symbol: &str) -> SymbolConfig {
        SymbolConfig {
            symbol: Symbol::from(symbol),
            venue: ExchangeId::BinanceSpot,
            strategy: GridConfig {
                base_interval: dec!(10),
                levels: 2,
                base_qty: dec!(0.01),
                qty_taper: dec!(1),
                skew_mode: vantage_strategy::SkewMode::Multiplicative,
                skew_factor: dec!(0),
                max_inventory_qty: dec!(1),
                atr_period: 14,
                volatility_scale: vantage_risk::VolatilityScaler::new(dec!(1), dec!(1), dec!(2)),
                off_windows: Vec::new(),
                trend: vantage_strategy::TrendConfig::default(),
            },
            risk: RiskConfig::default(),
            status: SymbolStatus::Active,
        }
    }

    #[test]
    fn added_pair_round_trips_through_the_registry() {
        let registry = SymbolRegistry::new(Store::open_in_memory().unwrap());
        registry.add_trading_pair(&sample_config("BTCUSDT")).unwrap();

        let fetched = registry.get(&Symbol::from("BTCUSDT")).unwrap().unwrap();
        assert_eq!(fetched.status, SymbolStatus::Active);
        assert_eq!(fetched.strategy.levels, 2);
    }

    #[test]
    fn recover_only_returns_active_pairs() {
        let registry = SymbolRegistry::new(Store::open_in_memory().unwrap());
        registry.add_trading_pair(&sample_config("BTCUSDT")).unwrap();
        registry.add_trading_pair(&sample_config("ETHUSDT")).unwrap();
        registry.remove_trading_pair(&Symbol::from("ETHUSDT")).unwrap();

        let active = registry.recover().unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].symbol, Symbol::from("BTCUSDT"));
    }
}
