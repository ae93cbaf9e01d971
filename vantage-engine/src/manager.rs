use crate::engine::{EngineError, GridEngine};
use crate::position::PositionManager;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use vantage_execution::exchange::Exchange;
use vantage_execution::{Kline, Order, OrderState, Position, PriceUpdate};
use vantage_instrument::Symbol;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// One symbol's event surface, split by source so a burst of price ticks on
/// a hot symbol cannot starve order or position updates behind it in a
/// single shared queue.
#[derive(Debug)]
pub struct SymbolChannels {
    pub price_tx: mpsc::Sender<PriceUpdate>,
    pub kline_tx: mpsc::Sender<Kline>,
    pub order_tx: mpsc::Sender<Order<OrderState>>,
    pub position_tx: mpsc::Sender<Position>,
}

/// Receiver half of a [`SymbolManager`]'s channels, handed back alongside
/// the manager itself so the orchestrator can route inbound events to the
/// [`SymbolChannels`] senders while holding onto this for [`SymbolManager::spawn`].
pub struct SymbolReceivers {
    price_rx: mpsc::Receiver<PriceUpdate>,
    kline_rx: mpsc::Receiver<Kline>,
    order_rx: mpsc::Receiver<Order<OrderState>>,
    position_rx: mpsc::Receiver<Position>,
}

/// Owns one symbol's full runtime state: its [`PositionManager`], its
/// [`GridEngine`], and the bounded channels that feed it events from the
/// orchestrator. Runs as a single task so every mutation to the engine's
/// slot table is strictly serialised — no two events for the same symbol
/// are ever processed concurrently.
pub struct SymbolManager<E: Exchange> {
    symbol: Symbol,
    engine: GridEngine<E>,
    positions: PositionManager,
    last_kline: Option<Kline>,
}

impl<E: Exchange> SymbolManager<E> {
    pub fn new(symbol: Symbol, engine: GridEngine<E>) -> (Self, SymbolChannels, SymbolReceivers) {
        let (price_tx, price_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (kline_tx, kline_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (order_tx, order_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (position_tx, position_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let positions = PositionManager::new(symbol.clone());
        let manager = Self { symbol, engine, positions, last_kline: None };
        let channels = SymbolChannels { price_tx, kline_tx, order_tx, position_tx };
        let receivers = SymbolReceivers { price_rx, kline_rx, order_rx, position_rx };

        (manager, channels, receivers)
    }

    /// Recover durable state and reconcile against the venue before serving
    /// any event.
    pub async fn start(&mut self) -> Result<(), EngineError> {
        self.engine.sync_orders().await?;
        info!(symbol = %self.symbol, "symbol manager started");
        Ok(())
    }

    /// Run the manager's serial event loop until every channel closes.
    /// Intended to be spawned as its own task per symbol so a panic in one
    /// symbol's processing cannot take down another's (panic isolation is
    /// enforced by the orchestrator catching the join handle's result, not
    /// by this loop itself).
    pub async fn run(mut self, mut receivers: SymbolReceivers) {
        loop {
            tokio::select! {
                biased;

                Some(order) = receivers.order_rx.recv() => {
                    self.handle_order_update(order);
                }
                Some(position) = receivers.position_rx.recv() => {
                    self.positions.apply(&position);
                }
                Some(kline) = receivers.kline_rx.recv() => {
                    self.last_kline = Some(kline);
                }
                Some(price) = receivers.price_rx.recv() => {
                    self.handle_price_update(price).await;
                }
                else => break,
            }
        }

        warn!(symbol = %self.symbol, "symbol manager event loop exited: all channels closed");
    }

    /// Spawn this manager's event loop, returning a join handle the
    /// orchestrator can await for panic isolation.
    pub fn spawn(self, receivers: SymbolReceivers) -> tokio::task::JoinHandle<()>
    where
        E: 'static,
    {
        tokio::spawn(self.run(receivers))
    }

    async fn handle_price_update(&mut self, price: PriceUpdate) {
        let (high, low, close) = match &self.last_kline {
            Some(k) => (k.high, k.low, k.close),
            None => (price.price, price.price, price.price),
        };

        let position_qty = self.positions.snapshot().qty;
        let minute_of_day_utc = minute_of_day_utc(price.timestamp_ms);

        match self
            .engine
            .on_price_update(high, low, close, position_qty, minute_of_day_utc, price.timestamp_ms)
            .await
        {
            Ok(actions) if !actions.is_empty() => {
                info!(symbol = %self.symbol, actions = actions.len(), "grid actions dispatched");
            }
            Ok(_) => {}
            Err(err) => error!(symbol = %self.symbol, ?err, "price update handling failed"),
        }
    }

    fn handle_order_update(&mut self, order: Order<OrderState>) {
        match self.engine.on_order_update(order, now_ms()) {
            Ok(Some(ghost)) => {
                warn!(symbol = %self.symbol, ?ghost, "applying ghost fill to local position");
                self.positions.apply_local_fill(ghost.side, ghost.qty, ghost.price);
            }
            Ok(None) => {}
            Err(err) => error!(symbol = %self.symbol, ?err, "order update handling failed"),
        }
    }

    pub fn positions(&self) -> &PositionManager {
        &self.positions
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn minute_of_day_utc(timestamp_ms: i64) -> u16 {
    use chrono::Timelike;
    let Some(dt) = chrono::DateTime::from_timestamp_millis(timestamp_ms) else {
        return 0;
    };
    (dt.hour() * 60 + dt.minute()) as u16
}

#[cfg(test)]
mod tests {
    use super::minute_of_day_utc;

    #[test]
    fn minute_of_day_reads_utc_hour_and_minute() {
        // 2024-01-01T00:00:00Z
        assert_eq!(minute_of_day_utc(1_704_067_200_000), 0);
        // 2024-01-01T12:34:00Z -> 12*60+34 = 754
        assert_eq!(minute_of_day_utc(1_704_067_200_000 + (12 * 3600 + 34 * 60) * 1000), 754);
    }
}
