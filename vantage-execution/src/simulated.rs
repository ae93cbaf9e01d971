use crate::{
    account::{Account, AssetBalance},
    error::{ApiError, ClientError, ConnectivityError},
    funding::FundingRate,
    id::{ClientOrderId, OrderId},
    market::{Kline, PriceUpdate},
    order::Order,
    position::{Position, PositionSide},
    request::{OrderRequestCancel, OrderRequestOpen},
    state::{ActiveOrderState, CancelInFlight, Cancelled, Open, OrderState},
    trade::Trade,
};
use chrono::Utc;
use futures::stream::{BoxStream, StreamExt};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::{collections::HashMap, sync::Arc, sync::atomic::{AtomicBool, AtomicU64, Ordering}};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;
use vantage_instrument::{exchange::ExchangeId, Side, Symbol, SymbolInfo};

const BROADCAST_CAPACITY: usize = 1024;

/// Static venue metadata and starting balances for a [`SimulatedExchange`].
#[derive(Debug, Clone)]
pub struct SimulatedConfig {
    pub exchange_id: ExchangeId,
    pub name: String,
    pub symbols: Vec<SymbolInfo>,
    pub starting_balances: Vec<AssetBalance>,
    pub maker_fee: Decimal,
}

impl SimulatedConfig {
    /// A single-symbol configuration with one quote-asset balance, useful
    /// for demos and the grid/funding-arb scenario tests.
    pub fn single_symbol(exchange_id: ExchangeId, symbol: SymbolInfo, quote_balance: AssetBalance) -> Self {
        Self {
            exchange_id,
            name: exchange_id.as_str().to_string(),
            symbols: vec![symbol],
            starting_balances: vec![quote_balance],
            maker_fee: Decimal::ZERO,
        }
    }
}

struct Inner {
    config: SimulatedConfig,
    online: AtomicBool,
    orders: Mutex<HashMap<ClientOrderId, Order<ActiveOrderState>>>,
    history: Mutex<HashMap<ClientOrderId, Order<OrderState>>>,
    trades: Mutex<Vec<Trade>>,
    last_price: Mutex<HashMap<Symbol, Decimal>>,
    account: Mutex<Account>,
    positions: Mutex<HashMap<Symbol, Position>>,
    funding: Mutex<HashMap<Symbol, FundingRate>>,
    next_trade_id: AtomicU64,
    order_tx: broadcast::Sender<Order<OrderState>>,
    price_tx: broadcast::Sender<PriceUpdate>,
    account_tx: broadcast::Sender<Account>,
    position_tx: broadcast::Sender<Position>,
    funding_tx: broadcast::Sender<FundingRate>,
}

/// An in-memory, single-process stand-in for a venue: fills orders that
/// cross the last known price immediately, rests everything else, and
/// streams price/order/account/position/funding updates over broadcast
/// channels so a gateway can sit in front of it without code changes.
///
/// Not a venue adapter: no REST/WebSocket client lives here, and the
/// matching rule (cross-or-rest against a single last price, no book
/// depth) is deliberately simplistic. It exists so the gateway and trader
/// binaries have a concrete [`crate::exchange::Exchange`] to run against,
/// and so tests can drive deterministic scenarios via [`SimulatedExchange::set_price`].
#[derive(Clone)]
pub struct SimulatedExchange {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SimulatedExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedExchange")
            .field("exchange_id", &self.inner.config.exchange_id)
            .field("name", &self.inner.config.name)
            .finish_non_exhaustive()
    }
}

impl SimulatedExchange {
    pub fn new(config: SimulatedConfig) -> Self {
        let account = Account::new(config.starting_balances.clone(), Decimal::ZERO, None);
        let (order_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        let (price_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        let (account_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        let (position_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        let (funding_tx, _) = broadcast::channel(BROADCAST_CAPACITY);

        Self {
            inner: Arc::new(Inner {
                config,
                online: AtomicBool::new(true),
                orders: Mutex::new(HashMap::new()),
                history: Mutex::new(HashMap::new()),
                trades: Mutex::new(Vec::new()),
                last_price: Mutex::new(HashMap::new()),
                account: Mutex::new(account),
                positions: Mutex::new(HashMap::new()),
                funding: Mutex::new(HashMap::new()),
                next_trade_id: AtomicU64::new(1),
                order_tx,
                price_tx,
                account_tx,
                position_tx,
                funding_tx,
            }),
        }
    }

    /// Flip whether [`Exchange::check_health`] succeeds, to exercise the
    /// gateway's health surface and the client's reconnect path in tests.
    pub fn set_online(&self, online: bool) {
        self.inner.online.store(online, Ordering::SeqCst);
    }

    /// Push a new last-traded price for `symbol`, filling any resting order
    /// on the wrong side of it and broadcasting the tick.
    pub fn set_price(&self, symbol: Symbol, price: Decimal) {
        self.inner.last_price.lock().insert(symbol.clone(), price);
        let _ = self.inner.price_tx.send(PriceUpdate::new(symbol.clone(), price, now_ms()));
        self.match_resting_orders(&symbol, price);
    }

    fn symbol_info(&self, symbol: &Symbol) -> Option<SymbolInfo> {
        self.inner.config.symbols.iter().find(|s| &s.symbol == symbol).cloned()
    }

    fn crosses(side: Side, order_price: Decimal, market_price: Decimal) -> bool {
        match side {
            Side::Buy => order_price >= market_price,
            Side::Sell => order_price <= market_price,
        }
    }

    fn match_resting_orders(&self, symbol: &Symbol, price: Decimal) {
        let crossed: Vec<ClientOrderId> = self
            .inner
            .orders
            .lock()
            .iter()
            .filter(|(_, order)| {
                order.key.symbol == *symbol
                    && matches!(&order.state, ActiveOrderState::Open(_))
                    && Self::crosses(order.side, order.price, price)
            })
            .map(|(cid, _)| cid.clone())
            .collect();

        for cid in crossed {
            self.fill(symbol, &cid, price);
        }
    }

    fn fill(&self, symbol: &Symbol, cid: &ClientOrderId, price: Decimal) {
        let Some(order) = self.inner.orders.lock().remove(cid) else { return };
        let ActiveOrderState::Open(open) = &order.state else {
            self.inner.orders.lock().insert(cid.clone(), order);
            return;
        };

        debug!(symbol = symbol.as_str(), cid = %cid.0, %price, "simulated fill");
        let trade_id = self.inner.next_trade_id.fetch_add(1, Ordering::SeqCst);
        let fee = price * order.quantity * self.inner.config.maker_fee;
        let trade = Trade::new(
            trade_id.to_string().into(),
            open.id.clone(),
            cid.clone(),
            symbol.clone(),
            order.side,
            price,
            order.quantity,
            fee,
            "USDT".into(),
            Utc::now(),
        );
        self.inner.trades.lock().push(trade);

        self.apply_fill_to_account(symbol, order.side, price, order.quantity, fee);

        let filled: Order<OrderState> = Order {
            key: order.key.clone(),
            side: order.side,
            price: order.price,
            quantity: order.quantity,
            kind: order.kind,
            time_in_force: order.time_in_force,
            reduce_only: order.reduce_only,
            use_margin: order.use_margin,
            state: OrderState::fully_filled(),
        };
        self.inner.history.lock().insert(cid.clone(), filled.clone());
        let _ = self.inner.order_tx.send(filled);
    }

    fn apply_fill_to_account(&self, symbol: &Symbol, side: Side, price: Decimal, quantity: Decimal, fee: Decimal) {
        {
            let mut account = self.inner.account.lock();
            if let Some(balance) = account.balances.first_mut() {
                let notional = price * quantity;
                match side {
                    Side::Buy => balance.free -= notional + fee,
                    Side::Sell => balance.free += notional - fee,
                }
            }
            let _ = self.inner.account_tx.send(account.clone());
        }

        let mut positions = self.inner.positions.lock();
        let position = positions.entry(symbol.clone()).or_insert_with(|| Position::new(
            symbol.clone(),
            PositionSide::Flat,
            Decimal::ZERO,
            Decimal::ZERO,
            price,
            Decimal::ZERO,
            None,
            Decimal::ONE,
        ));

        let signed_delta = match side {
            Side::Buy => quantity,
            Side::Sell => -quantity,
        };
        let new_size = position.size + signed_delta;
        position.entry_price = if new_size.is_zero() {
            Decimal::ZERO
        } else if position.size.signum() == new_size.signum() || position.size.is_zero() {
            (position.entry_price * position.size.abs() + price * signed_delta.abs())
                / (position.size.abs() + signed_delta.abs())
        } else {
            position.entry_price
        };
        position.size = new_size;
        position.mark_price = price;
        position.side = if new_size.is_zero() {
            PositionSide::Flat
        } else if new_size.is_sign_positive() {
            PositionSide::Long
        } else {
            PositionSide::Short
        };
        position.unrealized_pnl = (price - position.entry_price) * position.size;
        let snapshot = position.clone();
        drop(positions);
        let _ = self.inner.position_tx.send(snapshot);
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

impl crate::exchange::Exchange for SimulatedExchange {
    type AccountStream = BoxStream<'static, Account>;
    type OrderStream = BoxStream<'static, Order<OrderState>>;
    type PriceStream = BoxStream<'static, PriceUpdate>;
    type KlineStream = BoxStream<'static, Kline>;
    type PositionStream = BoxStream<'static, Position>;
    type FundingStream = BoxStream<'static, FundingRate>;

    fn exchange_id(&self) -> ExchangeId {
        self.inner.config.exchange_id
    }

    fn get_name(&self) -> &str {
        &self.inner.config.name
    }

    async fn check_health(&self) -> Result<(), ClientError> {
        if self.inner.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ClientError::Connectivity(ConnectivityError::ExchangeOffline(self.inner.config.exchange_id)))
        }
    }

    async fn place_order(&self, request: OrderRequestOpen) -> Result<Order<ActiveOrderState>, ClientError> {
        if self.symbol_info(&request.key.symbol).is_none() {
            return Err(ClientError::Api(ApiError::SymbolInvalid(
                request.key.symbol.clone(),
                "unknown to this venue".into(),
            )));
        }

        if self.inner.orders.lock().contains_key(&request.key.cid) {
            return Err(ClientError::Api(ApiError::OrderRejected("duplicate client order id".into())));
        }

        let order: Order<ActiveOrderState> = Order {
            key: request.key.clone(),
            side: request.state.side,
            price: request.state.price,
            quantity: request.state.quantity,
            kind: request.state.kind,
            time_in_force: request.state.time_in_force,
            reduce_only: request.state.reduce_only,
            use_margin: request.state.use_margin,
            state: ActiveOrderState::Open(Open::new(
                OrderId::new(request.key.cid.0.as_str()),
                Utc::now(),
                request.state.price,
                request.state.quantity,
                Decimal::ZERO,
            )),
        };

        self.inner.orders.lock().insert(request.key.cid.clone(), order.clone());
        let _ = self.inner.order_tx.send(Order::from(order.clone()));

        // Acknowledge placement with the resting snapshot; a synchronous
        // match below is reported to callers through the order stream, not
        // by mutating this ack, mirroring a real venue's ack-then-fill-event
        // ordering.
        let market_price = self.inner.last_price.lock().get(&request.key.symbol).copied();
        if let Some(price) = market_price {
            if Self::crosses(order.side, order.price, price) {
                self.fill(&request.key.symbol, &request.key.cid, price);
            }
        }

        Ok(order)
    }

    async fn batch_place_orders(
        &self,
        requests: Vec<OrderRequestOpen>,
    ) -> (Vec<Result<Order<ActiveOrderState>, ClientError>>, bool) {
        let mut margin_failure = false;
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            let result = self.place_order(request).await;
            if matches!(&result, Err(ClientError::Api(ApiError::MarginUnavailable(_) | ApiError::InsufficientCollateral(_)))) {
                margin_failure = true;
            }
            results.push(result);
        }
        (results, margin_failure)
    }

    async fn cancel_order(&self, request: OrderRequestCancel) -> Result<Cancelled, ClientError> {
        let Some(order) = self.inner.orders.lock().remove(&request.key.cid) else {
            return Err(ClientError::Api(ApiError::OrderNotFound));
        };

        let id = match &order.state {
            ActiveOrderState::Open(open) => open.id.clone(),
            ActiveOrderState::CancelInFlight(CancelInFlight { id: Some(id) }) => id.clone(),
            _ => OrderId::new(request.key.cid.0.as_str()),
        };

        let cancelled = Cancelled::new(id, Utc::now());
        let snapshot: Order<OrderState> = Order {
            key: order.key,
            side: order.side,
            price: order.price,
            quantity: order.quantity,
            kind: order.kind,
            time_in_force: order.time_in_force,
            reduce_only: order.reduce_only,
            use_margin: order.use_margin,
            state: OrderState::cancelled(cancelled.clone()),
        };
        self.inner.history.lock().insert(request.key.cid, snapshot.clone());
        let _ = self.inner.order_tx.send(snapshot);

        Ok(cancelled)
    }

    async fn batch_cancel_orders(&self, requests: Vec<OrderRequestCancel>) -> Vec<Result<Cancelled, ClientError>> {
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            results.push(self.cancel_order(request).await);
        }
        results
    }

    async fn cancel_all(&self, symbol: &Symbol) -> Result<(), ClientError> {
        let cids: Vec<ClientOrderId> = self
            .inner
            .orders
            .lock()
            .iter()
            .filter(|(_, order)| &order.key.symbol == symbol)
            .map(|(cid, _)| cid.clone())
            .collect();

        for cid in cids {
            if let Some(order) = self.inner.orders.lock().get(&cid) {
                let key = order.key.clone();
                let _ = self.cancel_order(OrderRequestCancel::new(key, crate::request::RequestCancel::new(None))).await;
            }
        }
        Ok(())
    }

    async fn get_order(&self, symbol: &Symbol, cid: &ClientOrderId) -> Result<Order<OrderState>, ClientError> {
        if let Some(order) = self.inner.orders.lock().get(cid) {
            if &order.key.symbol == symbol {
                return Ok(Order::from(order.clone()));
            }
        }
        if let Some(order) = self.inner.history.lock().get(cid) {
            if &order.key.symbol == symbol {
                return Ok(order.clone());
            }
        }
        Err(ClientError::Api(ApiError::OrderNotFound))
    }

    async fn get_open_orders(&self, symbol: &Symbol) -> Result<Vec<Order<ActiveOrderState>>, ClientError> {
        Ok(self
            .inner
            .orders
            .lock()
            .values()
            .filter(|order| &order.key.symbol == symbol)
            .cloned()
            .collect())
    }

    async fn get_account(&self) -> Result<Account, ClientError> {
        Ok(self.inner.account.lock().clone())
    }

    async fn get_positions(&self, symbol: Option<&Symbol>) -> Result<Vec<Position>, ClientError> {
        let positions = self.inner.positions.lock();
        Ok(match symbol {
            Some(symbol) => positions.get(symbol).cloned().into_iter().collect(),
            None => positions.values().cloned().collect(),
        })
    }

    async fn get_latest_price(&self, symbol: &Symbol) -> Result<PriceUpdate, ClientError> {
        self.inner
            .last_price
            .lock()
            .get(symbol)
            .map(|price| PriceUpdate::new(symbol.clone(), *price, now_ms()))
            .ok_or_else(|| ClientError::Api(ApiError::SymbolInvalid(symbol.clone(), "no price has been set".into())))
    }

    async fn get_historical_klines(&self, symbol: &Symbol, interval_ms: i64, limit: usize) -> Result<Vec<Kline>, ClientError> {
        let price = self.get_latest_price(symbol).await?.price;
        let now = now_ms();
        Ok((0..limit)
            .map(|i| {
                let open_time_ms = now - (limit - i) as i64 * interval_ms;
                Kline::new(symbol.clone(), open_time_ms, price, price, price, price, Decimal::ZERO)
            })
            .collect())
    }

    async fn get_symbol_info(&self, symbol: &Symbol) -> Result<SymbolInfo, ClientError> {
        self.symbol_info(symbol)
            .ok_or_else(|| ClientError::Api(ApiError::SymbolInvalid(symbol.clone(), "unknown to this venue".into())))
    }

    async fn get_tickers(&self) -> Result<Vec<SymbolInfo>, ClientError> {
        Ok(self.inner.config.symbols.clone())
    }

    async fn get_funding_rate(&self, symbol: &Symbol) -> Result<FundingRate, ClientError> {
        Ok(self
            .inner
            .funding
            .lock()
            .get(symbol)
            .cloned()
            .unwrap_or_else(|| FundingRate::spot_sentinel(self.inner.config.exchange_id, symbol.clone(), now_ms())))
    }

    async fn get_funding_rates(&self, symbols: &[Symbol]) -> Result<Vec<FundingRate>, ClientError> {
        let mut rates = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            rates.push(self.get_funding_rate(symbol).await?);
        }
        Ok(rates)
    }

    async fn fetch_trades(&self, symbol: &Symbol, limit: usize) -> Result<Vec<Trade>, ClientError> {
        Ok(self
            .inner
            .trades
            .lock()
            .iter()
            .rev()
            .filter(|trade| &trade.symbol == symbol)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn price(&self, symbols: Vec<Symbol>) -> Result<Self::PriceStream, ClientError> {
        let stream = BroadcastStream::new(self.inner.price_tx.subscribe())
            .map_while(|item| item.ok())
            .filter(move |update| {
                let keep = symbols.is_empty() || symbols.contains(&update.symbol);
                async move { keep }
            });
        Ok(stream.boxed())
    }

    async fn orders(&self) -> Result<Self::OrderStream, ClientError> {
        let stream = BroadcastStream::new(self.inner.order_tx.subscribe()).map_while(|item| item.ok());
        Ok(stream.boxed())
    }

    async fn klines(&self, symbols: Vec<Symbol>, interval_ms: i64) -> Result<Self::KlineStream, ClientError> {
        let stream = BroadcastStream::new(self.inner.price_tx.subscribe())
            .map_while(|item| item.ok())
            .filter(move |update| {
                let keep = symbols.is_empty() || symbols.contains(&update.symbol);
                async move { keep }
            })
            .map(move |update| Kline::new(update.symbol, update.timestamp_ms - interval_ms, update.price, update.price, update.price, update.price, Decimal::ZERO));
        Ok(stream.boxed())
    }

    async fn account(&self) -> Result<Self::AccountStream, ClientError> {
        let stream = BroadcastStream::new(self.inner.account_tx.subscribe()).map_while(|item| item.ok());
        Ok(stream.boxed())
    }

    async fn positions(&self, symbol: Option<Symbol>) -> Result<Self::PositionStream, ClientError> {
        let stream = BroadcastStream::new(self.inner.position_tx.subscribe())
            .map_while(|item| item.ok())
            .filter(move |position| {
                let keep = symbol.as_ref().is_none_or(|symbol| symbol == &position.symbol);
                async move { keep }
            });
        Ok(stream.boxed())
    }

    async fn funding(&self, symbols: Vec<Symbol>) -> Result<Self::FundingStream, ClientError> {
        let stream = BroadcastStream::new(self.inner.funding_tx.subscribe())
            .map_while(|item| item.ok())
            .filter(move |rate| {
                let keep = symbols.is_empty() || symbols.contains(&rate.symbol);
                async move { keep }
            });
        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        exchange::Exchange,
        id::StrategyId,
        request::{OrderKey, RequestOpen},
    };
    use rust_decimal_macros::dec;

    fn config() -> SimulatedConfig {
        SimulatedConfig::single_symbol(
            ExchangeId::Simulated,
            SymbolInfo::new(Symbol::from("BTCUSDT"), "BTC".into(), "USDT".into(), 2, 6, dec!(0.0001), Decimal::ONE),
            AssetBalance::new("USDT".into(), dec!(10000), Decimal::ZERO),
        )
    }

    fn key(cid: &str) -> OrderKey {
        OrderKey::new(ExchangeId::Simulated, Symbol::from("BTCUSDT"), StrategyId::new("t"), ClientOrderId::new(cid))
    }

    #[tokio::test]
    async fn a_resting_order_fills_when_the_price_crosses_it() {
        let exchange = SimulatedExchange::new(config());
        exchange.set_price(Symbol::from("BTCUSDT"), dec!(50000));

        let request = OrderRequestOpen::new(
            key("buy-1"),
            RequestOpen::new(Side::Buy, dec!(50100), dec!(0.01), OrderType::Limit, TimeInForce::GoodUntilCancelled, false, false),
        );
        let placed = exchange.place_order(request).await.unwrap();
        assert!(matches!(placed.state, ActiveOrderState::Open(_)));

        let snapshot = exchange.get_order(&Symbol::from("BTCUSDT"), &ClientOrderId::new("buy-1")).await.unwrap();
        assert_eq!(snapshot.state, OrderState::fully_filled());
    }

    #[tokio::test]
    async fn an_order_that_does_not_cross_rests_until_the_price_moves() {
        let exchange = SimulatedExchange::new(config());
        exchange.set_price(Symbol::from("BTCUSDT"), dec!(50000));

        let request = OrderRequestOpen::new(
            key("buy-2"),
            RequestOpen::new(Side::Buy, dec!(49000), dec!(0.01), OrderType::Limit, TimeInForce::GoodUntilCancelled, false, false),
        );
        exchange.place_order(request).await.unwrap();

        let open = exchange.get_open_orders(&Symbol::from("BTCUSDT")).await.unwrap();
        assert_eq!(open.len(), 1);

        exchange.set_price(Symbol::from("BTCUSDT"), dec!(48900));
        let open = exchange.get_open_orders(&Symbol::from("BTCUSDT")).await.unwrap();
        assert!(open.is_empty());
    }

    #[tokio::test]
    async fn cancelling_an_order_removes_it_from_the_open_set() {
        let exchange = SimulatedExchange::new(config());
        exchange.set_price(Symbol::from("BTCUSDT"), dec!(50000));

        let request = OrderRequestOpen::new(
            key("buy-3"),
            RequestOpen::new(Side::Buy, dec!(49000), dec!(0.01), OrderType::Limit, TimeInForce::GoodUntilCancelled, false, false),
        );
        exchange.place_order(request).await.unwrap();

        let cancel = exchange
            .cancel_order(OrderRequestCancel::new(key("buy-3"), crate::request::RequestCancel::new(None)))
            .await
            .unwrap();
        assert_eq!(cancel.id.0.as_str(), "buy-3");
        assert!(exchange.get_open_orders(&Symbol::from("BTCUSDT")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn check_health_reflects_set_online() {
        let exchange = SimulatedExchange::new(config());
        exchange.check_health().await.unwrap();
        exchange.set_online(false);
        assert!(exchange.check_health().await.is_err());
    }
}
