use futures::Stream;
use std::future::Future;
use std::pin::Pin;
use vantage_execution::{
    Account, ClientError, ClientOrderId, FundingRate, Kline, Order, OrderRequestCancel,
    OrderRequestOpen, OrderState, Position, PriceUpdate,
};
use vantage_execution::state::{ActiveOrderState, Cancelled};
use vantage_instrument::{Symbol, SymbolInfo};

/// Every unary RPC the gateway serves, carried as a request enum rather than
/// one method per RPC so [`GatewayTransport`] stays a two-method trait
/// regardless of how many capability-set operations exist.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayRequest {
    GetName,
    CheckHealth,
    PlaceOrder(OrderRequestOpen),
    BatchPlaceOrders(Vec<OrderRequestOpen>),
    CancelOrder(OrderRequestCancel),
    BatchCancelOrders(Vec<OrderRequestCancel>),
    CancelAll(Symbol),
    GetOrder(Symbol, ClientOrderId),
    GetOpenOrders(Symbol),
    GetAccount,
    GetPositions(Option<Symbol>),
    GetLatestPrice(Symbol),
    GetHistoricalKlines(Symbol, i64, usize),
    GetSymbolInfo(Symbol),
    GetTickers,
    GetFundingRate(Symbol),
    GetFundingRates(Vec<Symbol>),
}

/// Response counterpart of [`GatewayRequest`]. The client maps a mismatched
/// variant (a bug in the transport or service, never a user error) to
/// [`tonic::Code::Internal`].
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayResponse {
    Name(String),
    Health(bool),
    Order(Order<ActiveOrderState>),
    BatchOrders(Vec<Result<Order<ActiveOrderState>, ClientError>>, bool),
    Cancelled(Cancelled),
    BatchCancelled(Vec<Result<Cancelled, ClientError>>),
    Ack,
    OrderSnapshot(Order<OrderState>),
    OpenOrders(Vec<Order<ActiveOrderState>>),
    Account(Account),
    Positions(Vec<Position>),
    Price(PriceUpdate),
    Klines(Vec<Kline>),
    SymbolInfo(SymbolInfo),
    Tickers(Vec<SymbolInfo>),
    Funding(FundingRate),
    FundingRates(Vec<FundingRate>),
}

/// Every server-streaming RPC the gateway serves.
#[derive(Debug, Clone, PartialEq)]
pub enum SubscribeRequest {
    Price(Vec<Symbol>),
    Orders,
    Klines(Vec<Symbol>, i64),
    Account,
    Positions(Option<Symbol>),
    Funding(Vec<Symbol>),
}

/// One item from any subscription, tagged by kind so a single
/// [`GatewayTransport::subscribe`] method can serve all six streams.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayEvent {
    Price(PriceUpdate),
    Order(Order<OrderState>),
    Kline(Kline),
    Account(Account),
    Position(Position),
    Funding(FundingRate),
}

pub type EventStream = Pin<Box<dyn Stream<Item = GatewayEvent> + Send>>;

/// The gateway-to-client transport seam: unary request/response plus
/// server-streaming, both async, with `tonic::Status`-shaped errors so the
/// error-reason mapping holds regardless of which concrete transport is
/// wired in. [`crate::ChannelTransport`] is the one concrete transport this
/// repo ships.
pub trait GatewayTransport: Clone + Send + Sync + 'static {
    fn call(
        &self,
        request: GatewayRequest,
    ) -> impl Future<Output = Result<GatewayResponse, tonic::Status>> + Send;

    fn subscribe(
        &self,
        request: SubscribeRequest,
    ) -> impl Future<Output = Result<EventStream, tonic::Status>> + Send;
}
