use crate::engine::GridEngine;
use crate::manager::{SymbolChannels, SymbolManager};
use crate::registry::{SymbolConfig, SymbolRegistry};
use crate::store::{Store, StoreError};
use futures::StreamExt;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};
use vantage_execution::exchange::Exchange;
use vantage_execution::ClientError;
use vantage_instrument::Symbol;
use vantage_risk::CircuitBreaker;
use vantage_strategy::GridStrategy;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("exchange: {0}")]
    Client(#[from] ClientError),

    #[error("symbol {0} is not configured")]
    UnknownSymbol(Symbol),
}

/// Read-mostly routing table from [`Symbol`] to that symbol's inbound
/// channels, shared between the stream-demux task and any other producer
/// (e.g. a manual-order admin surface) that needs to reach a running
/// `SymbolManager`.
type RoutingTable = Arc<RwLock<HashMap<Symbol, SymbolChannels>>>;

/// Owns every `SymbolManager` task for one venue connection: recovers the
/// durable trading-pair set on startup, spawns one task per symbol, and
/// demuxes that venue's price/kline/order/position streams into each
/// symbol's bounded channels.
///
/// A panic inside one `SymbolManager`'s event loop is caught at the
/// `JoinHandle` level (`tokio::spawn` unwinds into the handle rather than
/// the process) so one symbol's bug cannot take the rest of the venue's
/// trading down with it; the orchestrator logs the panic and leaves the
/// symbol stopped rather than restarting it blindly, since an engine that
/// panicked mid-mutation may hold corrupt in-memory `Slot` state.
pub struct Orchestrator<E: Exchange> {
    exchange: E,
    store: Store,
    registry: SymbolRegistry,
    routing: RoutingTable,
    tasks: HashMap<Symbol, tokio::task::JoinHandle<()>>,
}

impl<E: Exchange> Orchestrator<E> {
    pub fn new(exchange: E, store: Store) -> Self {
        let registry = SymbolRegistry::new(store.clone());
        Self {
            exchange,
            store,
            registry,
            routing: Arc::new(RwLock::new(HashMap::new())),
            tasks: HashMap::new(),
        }
    }

    /// Durable `Recover()`: rebuild every `ACTIVE` symbol's manager from the
    /// registry, then start demuxing this venue's streams into them.
    pub async fn start(&mut self) -> Result<(), OrchestratorError> {
        let configs = self.registry.recover()?;
        info!(count = configs.len(), "recovering trading pairs");

        for config in configs {
            if let Err(err) = self.spawn_symbol(config.clone()).await {
                error!(symbol = %config.symbol, ?err, "failed to spawn recovered symbol");
            }
        }

        self.spawn_stream_demux();
        Ok(())
    }

    /// Durable `AddTradingPair` workflow: persist the configuration, then
    /// spawn its manager immediately so the new pair starts trading without
    /// requiring a process restart.
    pub async fn add_trading_pair(&mut self, config: SymbolConfig) -> Result<(), OrchestratorError> {
        self.registry.add_trading_pair(&config)?;
        self.spawn_symbol(config).await
    }

    /// Durable `RemoveTradingPair` workflow: mark the pair removed, cancel
    /// its task, and drop its routing entry so no further events reach it.
    pub fn remove_trading_pair(&mut self, symbol: &Symbol) -> Result<(), OrchestratorError> {
        self.registry.remove_trading_pair(symbol)?;
        self.routing.write().remove(symbol);
        if let Some(handle) = self.tasks.remove(symbol) {
            handle.abort();
        }
        Ok(())
    }

    async fn spawn_symbol(&mut self, config: SymbolConfig) -> Result<(), OrchestratorError> {
        let symbol_info = self.exchange.get_symbol_info(&config.symbol).await?;
        let strategy = GridStrategy::new(config.strategy.clone());
        let breaker = CircuitBreaker::new(config.risk.clone());
        let strategy_id = vantage_execution::StrategyId::new(format!("grid-{}", config.symbol.as_str()));

        let mut engine = GridEngine::new(
            self.exchange.clone(),
            self.store.clone(),
            config.symbol.clone(),
            symbol_info,
            strategy_id,
            strategy,
            breaker,
        )?;
        engine.ensure_slot_capacity(config.strategy.levels as i64 * 2, now_ms())?;

        let (mut manager, channels, receivers) = SymbolManager::new(config.symbol.clone(), engine);
        manager.start().await?;

        self.routing.write().insert(config.symbol.clone(), channels);
        let symbol = config.symbol.clone();
        let handle = manager.spawn(receivers);
        self.tasks.insert(symbol.clone(), handle);

        info!(%symbol, "symbol manager spawned");
        Ok(())
    }

    /// Subscribe to this venue's streams for every currently routed symbol
    /// and forward each item to its owner's channel. Demuxing failures (a
    /// full channel, a routing-table miss for a symbol mid-teardown) are
    /// logged and dropped rather than propagated, since a single missed
    /// tick is recoverable on the next one.
    fn spawn_stream_demux(&self) {
        let exchange = self.exchange.clone();
        let routing = Arc::clone(&self.routing);
        let symbols: Vec<Symbol> = self.routing.read().keys().cloned().collect();

        tokio::spawn(demux_prices(exchange.clone(), Arc::clone(&routing), symbols.clone()));
        tokio::spawn(demux_orders(exchange.clone(), Arc::clone(&routing)));
        tokio::spawn(demux_positions(exchange, routing, None));
    }

    pub fn routed_symbols(&self) -> Vec<Symbol> {
        self.routing.read().keys().cloned().collect()
    }
}

async fn demux_prices<E: Exchange>(exchange: E, routing: RoutingTable, symbols: Vec<Symbol>) {
    if symbols.is_empty() {
        return;
    }
    let stream = match exchange.price(symbols).await {
        Ok(stream) => stream,
        Err(err) => {
            error!(?err, "failed to subscribe to price stream");
            return;
        }
    };
    tokio::pin!(stream);

    while let Some(update) = stream.next().await {
        let table = routing.read();
        if let Some(channels) = table.get(&update.symbol) {
            if channels.price_tx.try_send(update).is_err() {
                warn!("price channel full or closed, dropping tick");
            }
        }
    }
}

/// Order updates are never dropped: a full channel backs up the stream
/// reader rather than shedding the event, since a dropped fill would leave
/// a `Slot` permanently `LOCKED` against an order that's actually terminal.
/// The resulting slowness is meant to surface to the caller, not be hidden
/// here.
async fn demux_orders<E: Exchange>(exchange: E, routing: RoutingTable) {
    let stream = match exchange.orders().await {
        Ok(stream) => stream,
        Err(err) => {
            error!(?err, "failed to subscribe to order stream");
            return;
        }
    };
    tokio::pin!(stream);

    while let Some(order) = stream.next().await {
        let sender = routing.read().get(order.symbol()).map(|c| c.order_tx.clone());
        match sender {
            Some(order_tx) => {
                if order_tx.send(order).await.is_err() {
                    warn!("order channel closed while enqueueing, symbol manager must have stopped");
                }
            }
            None => warn!(symbol = %order.symbol(), "order update for unrouted symbol, dropping"),
        }
    }
}

async fn demux_positions<E: Exchange>(exchange: E, routing: RoutingTable, symbol: Option<Symbol>) {
    let stream = match exchange.positions(symbol).await {
        Ok(stream) => stream,
        Err(err) => {
            error!(?err, "failed to subscribe to position stream");
            return;
        }
    };
    tokio::pin!(stream);

    while let Some(position) = stream.next().await {
        let table = routing.read();
        if let Some(channels) = table.get(&position.symbol) {
            if channels.position_tx.try_send(position).is_err() {
                warn!("position channel full or closed, dropping update");
            }
        }
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
