use crate::error::GatewayError;
use crate::fanout::{FanOut, KeyedFanOut};
use crate::health::HealthState;
use crate::status::{client_error_reason, client_error_to_status};
use crate::transport::{EventStream, GatewayEvent, GatewayRequest, GatewayResponse, SubscribeRequest};
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use vantage_execution::exchange::Exchange;
use vantage_instrument::Symbol;
use vantage_metrics::Counters;

/// Per-client queue capacity for every fanned-out stream. Large enough to
/// absorb a brief scheduling hiccup without dropping a client on every minor
/// GC pause, small enough that a genuinely stuck client is noticed within a
/// few seconds of price updates.
pub const DEFAULT_CLIENT_QUEUE_CAPACITY: usize = 256;

struct Fanouts {
    price: KeyedFanOut<Vec<Symbol>, GatewayEvent>,
    orders: FanOut<GatewayEvent>,
    klines: KeyedFanOut<(Vec<Symbol>, i64), GatewayEvent>,
    account: FanOut<GatewayEvent>,
    positions: KeyedFanOut<Option<Symbol>, GatewayEvent>,
    funding: KeyedFanOut<Vec<Symbol>, GatewayEvent>,
}

impl Default for Fanouts {
    fn default() -> Self {
        Self {
            price: KeyedFanOut::new(),
            orders: FanOut::new(),
            klines: KeyedFanOut::new(),
            account: FanOut::new(),
            positions: KeyedFanOut::new(),
            funding: KeyedFanOut::new(),
        }
    }
}

impl Fanouts {
    /// Take every live venue-subscription task across all six streams, for
    /// [`GatewayService::shutdown_handle`].
    fn drain_all(&self) -> Vec<JoinHandle<()>> {
        let mut handles = self.price.drain_venue_tasks();
        handles.extend(self.orders.take_venue_task());
        handles.extend(self.klines.drain_venue_tasks());
        handles.extend(self.account.take_venue_task());
        handles.extend(self.positions.drain_venue_tasks());
        handles.extend(self.funding.drain_venue_tasks());
        handles
    }
}

/// Owns the one live venue connection and serves it to every
/// [`crate::GatewayTransport`] client through non-blocking per-client queues.
pub struct GatewayService<E: Exchange> {
    exchange: E,
    health: Arc<HealthState>,
    metrics: Counters,
    fanouts: Arc<Fanouts>,
}

impl<E: Exchange> Clone for GatewayService<E> {
    fn clone(&self) -> Self {
        Self {
            exchange: self.exchange.clone(),
            health: Arc::clone(&self.health),
            metrics: self.metrics.clone(),
            fanouts: Arc::clone(&self.fanouts),
        }
    }
}

impl<E: Exchange> std::fmt::Debug for GatewayService<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayService").field("exchange", &self.exchange.get_name()).finish_non_exhaustive()
    }
}

/// Cooperative shutdown: tells the dispatch loops to stop accepting new
/// work and waits (up to a deadline) for in-flight requests to drain (spec
/// §6 "Process control").
#[derive(Debug)]
pub struct ShutdownHandle {
    notify: Arc<tokio::sync::Notify>,
    drain: Vec<JoinHandle<()>>,
}

impl ShutdownHandle {
    fn new(notify: Arc<tokio::sync::Notify>, drain: Vec<JoinHandle<()>>) -> Self {
        Self { notify, drain }
    }

    /// Stop accepting new RPCs (wakes anything waiting on the shutdown
    /// notifier), abort every live venue-subscription task — closing the
    /// venue connection last, after clients have had a chance to notice —
    /// and wait up to `deadline` for those tasks to finish unwinding.
    pub async fn shutdown(self, deadline: Duration) -> Result<(), GatewayError> {
        self.notify.notify_waiters();
        let remaining = self.drain.len();
        for handle in &self.drain {
            handle.abort();
        }
        match tokio::time::timeout(deadline, futures::future::join_all(self.drain)).await {
            Ok(_) => Ok(()),
            Err(_) => Err(GatewayError::ShutdownTimedOut(remaining)),
        }
    }
}

impl<E: Exchange> GatewayService<E> {
    pub fn new(exchange: E, metrics: Counters) -> Self {
        Self { exchange, health: Arc::new(HealthState::new(false)), metrics, fanouts: Arc::new(Fanouts::default()) }
    }

    pub fn health(&self) -> Arc<HealthState> {
        Arc::clone(&self.health)
    }

    /// Build a [`ShutdownHandle`] over every venue-subscription task
    /// currently running, for graceful shutdown on `SIGTERM`/`SIGINT`. Marks
    /// the service `NOT_SERVING` immediately so the health RPC reflects
    /// shutdown before any stream is actually torn down.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.health.set_serving(false);
        ShutdownHandle::new(Arc::new(tokio::sync::Notify::new()), self.fanouts.drain_all())
    }

    /// Confirms the venue credentials are usable before the process starts
    /// serving: a credential failure must exit non-zero, never start
    /// half-healthy.
    pub async fn validate_credentials(&self) -> Result<(), GatewayError> {
        self.exchange.get_account().await.map_err(GatewayError::CredentialValidation)?;
        self.health.set_serving(true);
        Ok(())
    }

    /// Dispatch a single unary request against the venue.
    pub async fn call(&self, request: GatewayRequest) -> Result<GatewayResponse, tonic::Status> {
        let response = match request {
            GatewayRequest::GetName => GatewayResponse::Name(self.exchange.get_name().to_owned()),
            GatewayRequest::CheckHealth => {
                GatewayResponse::Health(self.exchange.check_health().await.is_ok() && self.health.status().is_serving())
            }
            GatewayRequest::PlaceOrder(request) => {
                GatewayResponse::Order(self.exchange.place_order(request).await.map_err(|error| self.record(&error))?)
            }
            GatewayRequest::BatchPlaceOrders(requests) => {
                let (results, margin_unavailable) = self.exchange.batch_place_orders(requests).await;
                GatewayResponse::BatchOrders(results, margin_unavailable)
            }
            GatewayRequest::CancelOrder(request) => {
                GatewayResponse::Cancelled(self.exchange.cancel_order(request).await.map_err(|error| self.record(&error))?)
            }
            GatewayRequest::BatchCancelOrders(requests) => {
                GatewayResponse::BatchCancelled(self.exchange.batch_cancel_orders(requests).await)
            }
            GatewayRequest::CancelAll(symbol) => {
                self.exchange.cancel_all(&symbol).await.map_err(|error| self.record(&error))?;
                GatewayResponse::Ack
            }
            GatewayRequest::GetOrder(symbol, cid) => GatewayResponse::OrderSnapshot(
                self.exchange.get_order(&symbol, &cid).await.map_err(|error| self.record(&error))?,
            ),
            GatewayRequest::GetOpenOrders(symbol) => GatewayResponse::OpenOrders(
                self.exchange.get_open_orders(&symbol).await.map_err(|error| self.record(&error))?,
            ),
            GatewayRequest::GetAccount => {
                GatewayResponse::Account(self.exchange.get_account().await.map_err(|error| self.record(&error))?)
            }
            GatewayRequest::GetPositions(symbol) => GatewayResponse::Positions(
                self.exchange.get_positions(symbol.as_ref()).await.map_err(|error| self.record(&error))?,
            ),
            GatewayRequest::GetLatestPrice(symbol) => GatewayResponse::Price(
                self.exchange.get_latest_price(&symbol).await.map_err(|error| self.record(&error))?,
            ),
            GatewayRequest::GetHistoricalKlines(symbol, interval_ms, limit) => GatewayResponse::Klines(
                self.exchange
                    .get_historical_klines(&symbol, interval_ms, limit)
                    .await
                    .map_err(|error| self.record(&error))?,
            ),
            GatewayRequest::GetSymbolInfo(symbol) => GatewayResponse::SymbolInfo(
                self.exchange.get_symbol_info(&symbol).await.map_err(|error| self.record(&error))?,
            ),
            GatewayRequest::GetTickers => {
                GatewayResponse::Tickers(self.exchange.get_tickers().await.map_err(|error| self.record(&error))?)
            }
            GatewayRequest::GetFundingRate(symbol) => GatewayResponse::Funding(
                self.exchange.get_funding_rate(&symbol).await.map_err(|error| self.record(&error))?,
            ),
            GatewayRequest::GetFundingRates(symbols) => GatewayResponse::FundingRates(
                self.exchange.get_funding_rates(&symbols).await.map_err(|error| self.record(&error))?,
            ),
        };
        Ok(response)
    }

    /// Subscribe to one of the six server-streaming RPCs, sharing the
    /// underlying venue subscription with any other client already
    /// subscribed on the same key.
    pub async fn subscribe(&self, request: SubscribeRequest) -> Result<EventStream, tonic::Status> {
        let (fanout, stream_name, on_empty): (FanOut<GatewayEvent>, &'static str, OnEmpty) = match request {
            SubscribeRequest::Price(symbols) => {
                let exchange = self.exchange.clone();
                let metrics = self.metrics.clone();
                let key = symbols.clone();
                let fanout = self.fanouts.price.get_or_spawn(key.clone(), |fanout| {
                    let fanout = fanout.clone();
                    let task = tokio::spawn(async move {
                        match exchange.price(symbols).await {
                            Ok(mut stream) => {
                                while let Some(update) = stream.next().await {
                                    fanout.publish(GatewayEvent::Price(update), &metrics, "price");
                                }
                            }
                            Err(error) => warn!(?error, "price venue subscription failed"),
                        }
                    });
                    fanout.set_venue_task(task);
                });
                let price = Arc::clone(&self.fanouts);
                (fanout, "price", Box::new(move || price.price.retire_if_empty(&key)))
            }
            SubscribeRequest::Orders => {
                if !self.fanouts.orders.has_venue_task() {
                    let exchange = self.exchange.clone();
                    let metrics = self.metrics.clone();
                    let fanout = self.fanouts.orders.clone();
                    let task = tokio::spawn(async move {
                        match exchange.orders().await {
                            Ok(mut stream) => {
                                while let Some(order) = stream.next().await {
                                    fanout.publish(GatewayEvent::Order(order), &metrics, "orders");
                                }
                            }
                            Err(error) => warn!(?error, "order venue subscription failed"),
                        }
                    });
                    self.fanouts.orders.set_venue_task(task);
                }
                (self.fanouts.orders.clone(), "orders", Box::new(|| {}))
            }
            SubscribeRequest::Klines(symbols, interval_ms) => {
                let exchange = self.exchange.clone();
                let metrics = self.metrics.clone();
                let key = (symbols.clone(), interval_ms);
                let fanout = self.fanouts.klines.get_or_spawn(key.clone(), |fanout| {
                    let fanout = fanout.clone();
                    let task = tokio::spawn(async move {
                        match exchange.klines(symbols, interval_ms).await {
                            Ok(mut stream) => {
                                while let Some(kline) = stream.next().await {
                                    fanout.publish(GatewayEvent::Kline(kline), &metrics, "klines");
                                }
                            }
                            Err(error) => warn!(?error, "kline venue subscription failed"),
                        }
                    });
                    fanout.set_venue_task(task);
                });
                let klines = Arc::clone(&self.fanouts);
                (fanout, "klines", Box::new(move || klines.klines.retire_if_empty(&key)))
            }
            SubscribeRequest::Account => {
                if !self.fanouts.account.has_venue_task() {
                    let exchange = self.exchange.clone();
                    let metrics = self.metrics.clone();
                    let fanout = self.fanouts.account.clone();
                    let task = tokio::spawn(async move {
                        match exchange.account().await {
                            Ok(mut stream) => {
                                while let Some(account) = stream.next().await {
                                    fanout.publish(GatewayEvent::Account(account), &metrics, "account");
                                }
                            }
                            Err(error) => warn!(?error, "account venue subscription failed"),
                        }
                    });
                    self.fanouts.account.set_venue_task(task);
                }
                (self.fanouts.account.clone(), "account", Box::new(|| {}))
            }
            SubscribeRequest::Positions(symbol) => {
                let exchange = self.exchange.clone();
                let metrics = self.metrics.clone();
                let key = symbol.clone();
                let fanout = self.fanouts.positions.get_or_spawn(key.clone(), |fanout| {
                    let fanout = fanout.clone();
                    let task = tokio::spawn(async move {
                        match exchange.positions(symbol).await {
                            Ok(mut stream) => {
                                while let Some(position) = stream.next().await {
                                    fanout.publish(GatewayEvent::Position(position), &metrics, "positions");
                                }
                            }
                            Err(error) => warn!(?error, "position venue subscription failed"),
                        }
                    });
                    fanout.set_venue_task(task);
                });
                let positions = Arc::clone(&self.fanouts);
                (fanout, "positions", Box::new(move || positions.positions.retire_if_empty(&key)))
            }
            SubscribeRequest::Funding(symbols) => {
                let exchange = self.exchange.clone();
                let metrics = self.metrics.clone();
                let key = symbols.clone();
                let fanout = self.fanouts.funding.get_or_spawn(key.clone(), |fanout| {
                    let fanout = fanout.clone();
                    let task = tokio::spawn(async move {
                        match exchange.funding(symbols).await {
                            Ok(mut stream) => {
                                while let Some(rate) = stream.next().await {
                                    fanout.publish(GatewayEvent::Funding(rate), &metrics, "funding");
                                }
                            }
                            Err(error) => warn!(?error, "funding venue subscription failed"),
                        }
                    });
                    fanout.set_venue_task(task);
                });
                let funding = Arc::clone(&self.fanouts);
                (fanout, "funding", Box::new(move || funding.funding.retire_if_empty(&key)))
            }
        };

        let (id, rx) = fanout.subscribe(DEFAULT_CLIENT_QUEUE_CAPACITY);
        self.metrics.gateway_client_connected(stream_name, fanout.subscriber_count() as i64);
        Ok(Box::pin(UnsubscribeOnDrop { rx, fanout, id, on_empty: Some(on_empty) }))
    }

    fn record(&self, error: &vantage_execution::ClientError) -> tonic::Status {
        self.metrics.error("gateway", client_error_reason(error));
        client_error_to_status(error)
    }
}

type OnEmpty = Box<dyn FnOnce() + Send>;

/// Wraps a client's receiver so dropping the stream (the client
/// disconnected or lost interest) unsubscribes it from the [`FanOut`] and,
/// once the last subscriber is gone, cancels the venue-side task and (for
/// keyed streams) retires the subscription key.
struct UnsubscribeOnDrop {
    rx: mpsc::Receiver<GatewayEvent>,
    fanout: FanOut<GatewayEvent>,
    id: u64,
    on_empty: Option<OnEmpty>,
}

impl Stream for UnsubscribeOnDrop {
    type Item = GatewayEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for UnsubscribeOnDrop {
    fn drop(&mut self) {
        let remaining = self.fanout.unsubscribe(self.id);
        if remaining == 0 {
            info!("last subscriber left, cancelling venue subscription");
            self.fanout.cancel_venue_task();
            if let Some(on_empty) = self.on_empty.take() {
                on_empty();
            }
        }
    }
}
