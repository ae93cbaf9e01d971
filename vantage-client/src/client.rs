use crate::connect::{connect_with_backoff, ConnectConfig};
use crate::forward::spawn_forwarder;
use crate::status::{client_error_reason, status_to_client_error};
use futures::stream::BoxStream;
use std::future::Future;
use vantage_execution::exchange::Exchange;
use vantage_execution::id::ClientOrderId;
use vantage_execution::{
    Account, ApiError, ClientError, FundingRate, Kline, Order, OrderRequestCancel, OrderRequestOpen, OrderState,
    Position, PriceUpdate, Trade,
};
use vantage_execution::state::{ActiveOrderState, Cancelled};
use vantage_gateway::{GatewayEvent, GatewayRequest, GatewayResponse, GatewayTransport, SubscribeRequest};
use vantage_instrument::{exchange::ExchangeId, Symbol, SymbolInfo};
use vantage_metrics::Counters;

/// The `Exchange` implementation seen by strategies and the symbol
/// orchestrator: every call crosses a [`GatewayTransport`] to the single
/// process that actually holds venue credentials.
#[derive(Clone)]
pub struct RemoteExchangeClient<T> {
    exchange_id: ExchangeId,
    name: String,
    transport: T,
    metrics: Counters,
}

impl<T: std::fmt::Debug> std::fmt::Debug for RemoteExchangeClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteExchangeClient")
            .field("exchange_id", &self.exchange_id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<T: GatewayTransport> RemoteExchangeClient<T> {
    /// Connect with backoff and, on success, return a client ready to serve
    /// [`Exchange`] calls. Fails fast after `config`'s attempt cap so the
    /// caller can exit non-zero.
    pub async fn connect(
        exchange_id: ExchangeId,
        name: impl Into<String>,
        transport: T,
        config: ConnectConfig,
        metrics: Counters,
    ) -> Result<Self, ClientError> {
        connect_with_backoff(&transport, config, &metrics).await?;
        Ok(Self { exchange_id, name: name.into(), transport, metrics })
    }

    async fn call(&self, request: GatewayRequest) -> Result<GatewayResponse, ClientError> {
        self.transport.call(request).await.map_err(status_to_client_error)
    }

    fn unexpected_response(&self) -> ClientError {
        ClientError::Api(ApiError::OrderRejected("gateway returned a mismatched response variant".into()))
    }

    /// Idempotent-replay path for a duplicate `client_order_id` (spec
    /// §4.2): the caller treats the placement as success iff the previously
    /// placed order is still active under the same id.
    async fn replay_place_order(&self, symbol: &Symbol, cid: &ClientOrderId) -> Result<Order<ActiveOrderState>, ClientError> {
        let snapshot = self.get_order(symbol, cid).await?;
        snapshot
            .to_active()
            .ok_or_else(|| ClientError::Api(ApiError::OrderRejected("duplicate order is no longer active".into())))
    }
}

impl<T: GatewayTransport> Exchange for RemoteExchangeClient<T> {
    type AccountStream = BoxStream<'static, Account>;
    type OrderStream = BoxStream<'static, Order<OrderState>>;
    type PriceStream = BoxStream<'static, PriceUpdate>;
    type KlineStream = BoxStream<'static, Kline>;
    type PositionStream = BoxStream<'static, Position>;
    type FundingStream = BoxStream<'static, FundingRate>;

    fn exchange_id(&self) -> ExchangeId {
        self.exchange_id
    }

    fn get_name(&self) -> &str {
        &self.name
    }

    fn check_health(&self) -> impl Future<Output = Result<(), ClientError>> + Send {
        async move {
            match self.call(GatewayRequest::CheckHealth).await? {
                GatewayResponse::Health(true) => Ok(()),
                GatewayResponse::Health(false) => {
                    Err(ClientError::Connectivity(vantage_execution::ConnectivityError::ExchangeOffline(self.exchange_id)))
                }
                _ => Err(self.unexpected_response()),
            }
        }
    }

    fn place_order(&self, request: OrderRequestOpen) -> impl Future<Output = Result<Order<ActiveOrderState>, ClientError>> + Send {
        async move {
            let symbol = request.key.symbol.clone();
            let cid = request.key.cid.clone();
            match self.transport.call(GatewayRequest::PlaceOrder(request)).await {
                Ok(GatewayResponse::Order(order)) => {
                    self.metrics.order_placed(symbol.as_str());
                    Ok(order)
                }
                Ok(_) => Err(self.unexpected_response()),
                Err(status) if status.code() == tonic::Code::AlreadyExists => self.replay_place_order(&symbol, &cid).await,
                Err(status) => {
                    let error = status_to_client_error(status);
                    self.metrics.order_failed(symbol.as_str(), client_error_reason(&error));
                    Err(error)
                }
            }
        }
    }

    fn batch_place_orders(
        &self,
        requests: Vec<OrderRequestOpen>,
    ) -> impl Future<Output = (Vec<Result<Order<ActiveOrderState>, ClientError>>, bool)> + Send {
        async move {
            match self.call(GatewayRequest::BatchPlaceOrders(requests)).await {
                Ok(GatewayResponse::BatchOrders(results, margin_unavailable)) => (results, margin_unavailable),
                Ok(_) => (vec![Err(self.unexpected_response())], false),
                Err(error) => (vec![Err(error)], false),
            }
        }
    }

    fn cancel_order(&self, request: OrderRequestCancel) -> impl Future<Output = Result<Cancelled, ClientError>> + Send {
        async move {
            let symbol = request.key.symbol.clone();
            match self.call(GatewayRequest::CancelOrder(request)).await? {
                GatewayResponse::Cancelled(cancelled) => {
                    self.metrics.order_cancelled(symbol.as_str());
                    Ok(cancelled)
                }
                _ => Err(self.unexpected_response()),
            }
        }
    }

    fn batch_cancel_orders(
        &self,
        requests: Vec<OrderRequestCancel>,
    ) -> impl Future<Output = Vec<Result<Cancelled, ClientError>>> + Send {
        async move {
            match self.call(GatewayRequest::BatchCancelOrders(requests)).await {
                Ok(GatewayResponse::BatchCancelled(results)) => results,
                Ok(_) => vec![Err(self.unexpected_response())],
                Err(error) => vec![Err(error)],
            }
        }
    }

    /// Preferred bulk-cancel path; falls back to [`Self::batch_cancel_orders`]
    /// at the call site when the gateway reports the venue doesn't support it.
    fn cancel_all(&self, symbol: &Symbol) -> impl Future<Output = Result<(), ClientError>> + Send {
        let symbol = symbol.clone();
        async move {
            match self.call(GatewayRequest::CancelAll(symbol)).await? {
                GatewayResponse::Ack => Ok(()),
                _ => Err(self.unexpected_response()),
            }
        }
    }

    fn get_order(
        &self,
        symbol: &Symbol,
        cid: &ClientOrderId,
    ) -> impl Future<Output = Result<Order<OrderState>, ClientError>> + Send {
        let symbol = symbol.clone();
        let cid = cid.clone();
        async move {
            match self.call(GatewayRequest::GetOrder(symbol, cid)).await? {
                GatewayResponse::OrderSnapshot(order) => Ok(order),
                _ => Err(self.unexpected_response()),
            }
        }
    }

    fn get_open_orders(&self, symbol: &Symbol) -> impl Future<Output = Result<Vec<Order<ActiveOrderState>>, ClientError>> + Send {
        let symbol = symbol.clone();
        async move {
            match self.call(GatewayRequest::GetOpenOrders(symbol)).await? {
                GatewayResponse::OpenOrders(orders) => Ok(orders),
                _ => Err(self.unexpected_response()),
            }
        }
    }

    fn get_account(&self) -> impl Future<Output = Result<Account, ClientError>> + Send {
        async move {
            match self.call(GatewayRequest::GetAccount).await? {
                GatewayResponse::Account(account) => Ok(account),
                _ => Err(self.unexpected_response()),
            }
        }
    }

    fn get_positions(&self, symbol: Option<&Symbol>) -> impl Future<Output = Result<Vec<Position>, ClientError>> + Send {
        let symbol = symbol.cloned();
        async move {
            match self.call(GatewayRequest::GetPositions(symbol)).await? {
                GatewayResponse::Positions(positions) => Ok(positions),
                _ => Err(self.unexpected_response()),
            }
        }
    }

    fn get_latest_price(&self, symbol: &Symbol) -> impl Future<Output = Result<PriceUpdate, ClientError>> + Send {
        let symbol = symbol.clone();
        async move {
            match self.call(GatewayRequest::GetLatestPrice(symbol)).await? {
                GatewayResponse::Price(update) => Ok(update),
                _ => Err(self.unexpected_response()),
            }
        }
    }

    fn get_historical_klines(
        &self,
        symbol: &Symbol,
        interval_ms: i64,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Kline>, ClientError>> + Send {
        let symbol = symbol.clone();
        async move {
            match self.call(GatewayRequest::GetHistoricalKlines(symbol, interval_ms, limit)).await? {
                GatewayResponse::Klines(klines) => Ok(klines),
                _ => Err(self.unexpected_response()),
            }
        }
    }

    fn get_symbol_info(&self, symbol: &Symbol) -> impl Future<Output = Result<SymbolInfo, ClientError>> + Send {
        let symbol = symbol.clone();
        async move {
            match self.call(GatewayRequest::GetSymbolInfo(symbol)).await? {
                GatewayResponse::SymbolInfo(info) => Ok(info),
                _ => Err(self.unexpected_response()),
            }
        }
    }

    fn get_tickers(&self) -> impl Future<Output = Result<Vec<SymbolInfo>, ClientError>> + Send {
        async move {
            match self.call(GatewayRequest::GetTickers).await? {
                GatewayResponse::Tickers(tickers) => Ok(tickers),
                _ => Err(self.unexpected_response()),
            }
        }
    }

    fn get_funding_rate(&self, symbol: &Symbol) -> impl Future<Output = Result<FundingRate, ClientError>> + Send {
        let symbol = symbol.clone();
        async move {
            match self.call(GatewayRequest::GetFundingRate(symbol)).await? {
                GatewayResponse::Funding(rate) => Ok(rate),
                _ => Err(self.unexpected_response()),
            }
        }
    }

    fn get_funding_rates(&self, symbols: &[Symbol]) -> impl Future<Output = Result<Vec<FundingRate>, ClientError>> + Send {
        let symbols = symbols.to_vec();
        async move {
            match self.call(GatewayRequest::GetFundingRates(symbols)).await? {
                GatewayResponse::FundingRates(rates) => Ok(rates),
                _ => Err(self.unexpected_response()),
            }
        }
    }

    /// The gateway keeps no trade-history RPC of its own, and this repo has
    /// no venue adapter wired in that would answer it, so it is
    /// deterministic-unsupported over this transport rather than silently
    /// returning an empty page.
    fn fetch_trades(&self, _symbol: &Symbol, _limit: usize) -> impl Future<Output = Result<Vec<Trade>, ClientError>> + Send {
        async move { Err(ClientError::Api(ApiError::OrderRejected("fetch_trades is not exposed over the gateway transport".into()))) }
    }

    fn price(&self, symbols: Vec<Symbol>) -> impl Future<Output = Result<Self::PriceStream, ClientError>> + Send {
        async move {
            let upstream = self
                .transport
                .subscribe(SubscribeRequest::Price(symbols))
                .await
                .map_err(status_to_client_error)?;
            Ok(spawn_forwarder(upstream, |event| match event {
                GatewayEvent::Price(update) => Some(update),
                _ => None,
            }))
        }
    }

    fn orders(&self) -> impl Future<Output = Result<Self::OrderStream, ClientError>> + Send {
        async move {
            let upstream = self.transport.subscribe(SubscribeRequest::Orders).await.map_err(status_to_client_error)?;
            Ok(spawn_forwarder(upstream, |event| match event {
                GatewayEvent::Order(order) => Some(order),
                _ => None,
            }))
        }
    }

    fn klines(&self, symbols: Vec<Symbol>, interval_ms: i64) -> impl Future<Output = Result<Self::KlineStream, ClientError>> + Send {
        async move {
            let upstream = self
                .transport
                .subscribe(SubscribeRequest::Klines(symbols, interval_ms))
                .await
                .map_err(status_to_client_error)?;
            Ok(spawn_forwarder(upstream, |event| match event {
                GatewayEvent::Kline(kline) => Some(kline),
                _ => None,
            }))
        }
    }

    fn account(&self) -> impl Future<Output = Result<Self::AccountStream, ClientError>> + Send {
        async move {
            let upstream = self.transport.subscribe(SubscribeRequest::Account).await.map_err(status_to_client_error)?;
            Ok(spawn_forwarder(upstream, |event| match event {
                GatewayEvent::Account(account) => Some(account),
                _ => None,
            }))
        }
    }

    fn positions(&self, symbol: Option<Symbol>) -> impl Future<Output = Result<Self::PositionStream, ClientError>> + Send {
        async move {
            let upstream = self
                .transport
                .subscribe(SubscribeRequest::Positions(symbol))
                .await
                .map_err(status_to_client_error)?;
            Ok(spawn_forwarder(upstream, |event| match event {
                GatewayEvent::Position(position) => Some(position),
                _ => None,
            }))
        }
    }

    fn funding(&self, symbols: Vec<Symbol>) -> impl Future<Output = Result<Self::FundingStream, ClientError>> + Send {
        async move {
            let upstream = self
                .transport
                .subscribe(SubscribeRequest::Funding(symbols))
                .await
                .map_err(status_to_client_error)?;
            Ok(spawn_forwarder(upstream, |event| match event {
                GatewayEvent::Funding(rate) => Some(rate),
                _ => None,
            }))
        }
    }
}
