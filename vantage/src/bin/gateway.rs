//! The `gateway` process: owns the one live venue connection and exposes it
//! to `trader` processes through [`GatewayService`].
//!
//! The only [`vantage_gateway::GatewayTransport`] this repo ships is
//! [`vantage_gateway::ChannelTransport`], an in-process `tokio::mpsc`
//! handle (protobuf code generation for a real network transport is out of
//! scope here). A `ChannelTransport` handle cannot leave this process, so
//! running `gateway` on its own only demonstrates the service's
//! startup/health/shutdown lifecycle; see `trader` for the combined binary
//! a `RemoteExchangeClient` actually talks to.
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tracing::{error, info};
use vantage::prelude::*;
use vantage_execution::account::AssetBalance;
use vantage_execution::simulated::{SimulatedConfig, SimulatedExchange};
use vantage_gateway::GatewayService;
use vantage_instrument::{Symbol, SymbolInfo};
use vantage_metrics::{Counters, TracingSink};

#[tokio::main]
async fn main() {
    init_logging();

    let config = GatewayConfig::default();
    info!(exchange_id = %config.exchange_id.as_str(), name = %config.name, "starting gateway");

    let metrics = Counters::new(Arc::new(TracingSink));
    let exchange = SimulatedExchange::new(demo_venue_config(&config));
    let service = GatewayService::new(exchange, metrics);

    if let Err(err) = service.validate_credentials().await {
        error!(%err, "venue credential validation failed");
        std::process::exit(EXIT_FATAL_STARTUP);
    }
    info!("venue credentials validated, gateway serving");

    wait_for_shutdown_signal().await;
    info!("shutdown signal received, draining gateway");

    let handle = service.shutdown_handle();
    match handle.shutdown(config.shutdown_drain).await {
        Ok(()) => {
            info!("gateway shut down cleanly");
            std::process::exit(EXIT_OK);
        }
        Err(err) => {
            error!(%err, "gateway shutdown deadline exceeded");
            std::process::exit(EXIT_FATAL_INTERNAL);
        }
    }
}

/// A single demo symbol so `validate_credentials`/`check_health` has
/// something to report on; real deployments populate this from the venue's
/// own symbol listing rather than a hardcoded default (config loading is
/// out of scope here).
fn demo_venue_config(config: &GatewayConfig) -> SimulatedConfig {
    SimulatedConfig::single_symbol(
        config.exchange_id,
        SymbolInfo::new(Symbol::from("BTCUSDT"), "BTC".into(), "USDT".into(), 2, 6, dec!(0.0001), Decimal::ONE),
        AssetBalance::new("USDT".into(), dec!(100000), Decimal::ZERO),
    )
}
