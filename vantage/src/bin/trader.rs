//! The `trader` process: runs the [`Orchestrator`] and a
//! [`RemoteExchangeClient`] against a gateway.
//!
//! The only [`vantage_gateway::GatewayTransport`] this repo ships is
//! [`vantage_gateway::ChannelTransport`], an in-process handle. A handle to
//! it cannot cross a process boundary, so this binary stands its own
//! [`GatewayService`] up in-process and connects to it exactly the way a
//! separate `gateway` process would be dialled once a real transport
//! exists — the client/orchestrator wiring below is the part that matters.
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use vantage::prelude::*;
use vantage_client::RemoteExchangeClient;
use vantage_engine::{Orchestrator, Store, SymbolConfig, SymbolStatus};
use vantage_execution::account::AssetBalance;
use vantage_execution::simulated::{SimulatedConfig, SimulatedExchange};
use vantage_gateway::{ChannelTransport, GatewayService};
use vantage_instrument::{Symbol, SymbolInfo};
use vantage_metrics::{Counters, TracingSink};

const DEMO_SYMBOL: &str = "BTCUSDT";

#[tokio::main]
async fn main() {
    init_logging();

    let gateway_config = GatewayConfig::default();
    let orchestrator_config = OrchestratorConfig::default();

    let venue = SimulatedExchange::new(demo_venue_config(&gateway_config));
    let service = GatewayService::new(venue.clone(), Counters::new(Arc::new(TracingSink)));
    if let Err(err) = service.validate_credentials().await {
        error!(%err, "venue credential validation failed");
        std::process::exit(EXIT_FATAL_STARTUP);
    }
    let transport = ChannelTransport::serve(service.clone());

    let client = match RemoteExchangeClient::connect(
        gateway_config.exchange_id,
        gateway_config.name.clone(),
        transport,
        orchestrator_config.connect,
        Counters::new(Arc::new(TracingSink)),
    )
    .await
    {
        Ok(client) => client,
        Err(err) => {
            error!(%err, "could not connect to gateway");
            std::process::exit(EXIT_FATAL_STARTUP);
        }
    };

    let store = match &orchestrator_config.store_path {
        Some(path) => Store::open(path),
        None => Store::open_in_memory(),
    };
    let store = match store {
        Ok(store) => store,
        Err(err) => {
            error!(%err, "failed to open the durable store");
            std::process::exit(EXIT_FATAL_STARTUP);
        }
    };

    let mut orchestrator = Orchestrator::new(client, store);
    if let Err(err) = orchestrator.start().await {
        error!(%err, "failed to recover orchestrator state");
        std::process::exit(EXIT_FATAL_INTERNAL);
    }

    let symbol = Symbol::from(DEMO_SYMBOL);
    if !orchestrator.routed_symbols().contains(&symbol) {
        let config = SymbolConfig {
            symbol: symbol.clone(),
            venue: gateway_config.exchange_id,
            strategy: default_grid_config(),
            risk: default_risk_config(),
            status: SymbolStatus::Active,
        };
        if let Err(err) = orchestrator.add_trading_pair(config).await {
            error!(%err, "failed to add the demo trading pair");
            std::process::exit(EXIT_FATAL_INTERNAL);
        }
    }
    info!(%symbol, "trading pair active");

    let ticker = tokio::spawn(drive_demo_prices(venue, symbol));

    wait_for_shutdown_signal().await;
    info!("shutdown signal received, tearing down trader");
    ticker.abort();

    for symbol in orchestrator.routed_symbols() {
        if let Err(err) = orchestrator.remove_trading_pair(&symbol) {
            warn!(%symbol, %err, "failed to cleanly remove trading pair on shutdown");
        }
    }

    std::process::exit(EXIT_OK);
}

fn demo_venue_config(config: &GatewayConfig) -> SimulatedConfig {
    SimulatedConfig::single_symbol(
        config.exchange_id,
        SymbolInfo::new(Symbol::from(DEMO_SYMBOL), "BTC".into(), "USDT".into(), 2, 6, dec!(0.0001), Decimal::ONE),
        AssetBalance::new("USDT".into(), dec!(100000), Decimal::ZERO),
    )
}

/// Stand-in market data feed: nudges the last price up and down around a
/// fixed midpoint every tick so the grid strategy has something to react
/// to. Not a venue market-data adapter — [`SimulatedExchange`] has no real
/// market data of its own, so something has to drive it for this to be a
/// runnable demo.
async fn drive_demo_prices(venue: SimulatedExchange, symbol: Symbol) {
    let mid = dec!(50000);
    let step = dec!(10);
    let mut tick: i64 = 0;
    loop {
        let offset = step * Decimal::from(tick % 20 - 10);
        venue.set_price(symbol.clone(), mid + offset);
        tick += 1;
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}
