use crate::{
    account::Account,
    error::ClientError,
    funding::FundingRate,
    market::{Kline, PriceUpdate},
    order::Order,
    position::Position,
    request::{OrderRequestCancel, OrderRequestOpen},
    state::{ActiveOrderState, Cancelled, OrderState},
    trade::Trade,
};
use futures::Stream;
use std::future::Future;
use vantage_instrument::{exchange::ExchangeId, Symbol, SymbolInfo};

/// The uniform capability set every venue adapter, and every client of the
/// gateway, satisfies.
///
/// A single process implementing this trait serves exactly one venue (the
/// gateway); a [`crate::exchange::Exchange`] impl on the trading-client side
/// is venue-parametric across however many gateway connections the
/// orchestrator holds, hence `exchange_id` is a runtime accessor rather than
/// an associated constant.
pub trait Exchange: Clone + Send + Sync + 'static {
    type AccountStream: Stream<Item = Account> + Send;
    type OrderStream: Stream<Item = Order<OrderState>> + Send;
    type PriceStream: Stream<Item = PriceUpdate> + Send;
    type KlineStream: Stream<Item = Kline> + Send;
    type PositionStream: Stream<Item = Position> + Send;
    type FundingStream: Stream<Item = FundingRate> + Send;

    fn exchange_id(&self) -> ExchangeId;

    fn get_name(&self) -> &str;

    fn check_health(&self) -> impl Future<Output = Result<(), ClientError>> + Send;

    fn place_order(
        &self,
        request: OrderRequestOpen,
    ) -> impl Future<Output = Result<Order<ActiveOrderState>, ClientError>> + Send;

    /// Returns one result per request plus a flag indicating whether any
    /// request failed due to a margin precondition (used by the engine to
    /// decide whether to fall back to non-margin placement).
    fn batch_place_orders(
        &self,
        requests: Vec<OrderRequestOpen>,
    ) -> impl Future<Output = (Vec<Result<Order<ActiveOrderState>, ClientError>>, bool)> + Send;

    fn cancel_order(
        &self,
        request: OrderRequestCancel,
    ) -> impl Future<Output = Result<Cancelled, ClientError>> + Send;

    fn batch_cancel_orders(
        &self,
        requests: Vec<OrderRequestCancel>,
    ) -> impl Future<Output = Vec<Result<Cancelled, ClientError>>> + Send;

    /// Preferred over [`Self::batch_cancel_orders`] when a risk breaker
    /// trips; falls back to batch-cancel at the call site if the venue
    /// responds `Unavailable`/`NotFound` to this call.
    fn cancel_all(&self, symbol: &Symbol) -> impl Future<Output = Result<(), ClientError>> + Send;

    fn get_order(
        &self,
        symbol: &Symbol,
        cid: &crate::id::ClientOrderId,
    ) -> impl Future<Output = Result<Order<OrderState>, ClientError>> + Send;

    fn get_open_orders(
        &self,
        symbol: &Symbol,
    ) -> impl Future<Output = Result<Vec<Order<ActiveOrderState>>, ClientError>> + Send;

    fn get_account(&self) -> impl Future<Output = Result<Account, ClientError>> + Send;

    fn get_positions(
        &self,
        symbol: Option<&Symbol>,
    ) -> impl Future<Output = Result<Vec<Position>, ClientError>> + Send;

    fn get_latest_price(
        &self,
        symbol: &Symbol,
    ) -> impl Future<Output = Result<PriceUpdate, ClientError>> + Send;

    fn get_historical_klines(
        &self,
        symbol: &Symbol,
        interval_ms: i64,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Kline>, ClientError>> + Send;

    fn get_symbol_info(
        &self,
        symbol: &Symbol,
    ) -> impl Future<Output = Result<SymbolInfo, ClientError>> + Send;

    fn get_tickers(&self) -> impl Future<Output = Result<Vec<SymbolInfo>, ClientError>> + Send;

    fn get_funding_rate(
        &self,
        symbol: &Symbol,
    ) -> impl Future<Output = Result<FundingRate, ClientError>> + Send;

    fn get_funding_rates(
        &self,
        symbols: &[Symbol],
    ) -> impl Future<Output = Result<Vec<FundingRate>, ClientError>> + Send;

    fn fetch_trades(
        &self,
        symbol: &Symbol,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Trade>, ClientError>> + Send;

    fn price(
        &self,
        symbols: Vec<Symbol>,
    ) -> impl Future<Output = Result<Self::PriceStream, ClientError>> + Send;

    fn orders(&self) -> impl Future<Output = Result<Self::OrderStream, ClientError>> + Send;

    fn klines(
        &self,
        symbols: Vec<Symbol>,
        interval_ms: i64,
    ) -> impl Future<Output = Result<Self::KlineStream, ClientError>> + Send;

    fn account(&self) -> impl Future<Output = Result<Self::AccountStream, ClientError>> + Send;

    fn positions(
        &self,
        symbol: Option<Symbol>,
    ) -> impl Future<Output = Result<Self::PositionStream, ClientError>> + Send;

    fn funding(
        &self,
        symbols: Vec<Symbol>,
    ) -> impl Future<Output = Result<Self::FundingStream, ClientError>> + Send;
}
