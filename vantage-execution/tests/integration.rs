use rust_decimal_macros::dec;
use vantage_execution::{
    ActiveOrderState, ClientOrderId, Order, OrderId, OrderKey, OrderState, RequestOpen,
    StrategyId,
};
use vantage_execution::state::{Cancelled, Open};
use vantage_instrument::{exchange::ExchangeId, OrderStatus, OrderType, Side, Symbol, TimeInForce};

fn key(strategy: &str, price_ticks: i64, side: Side) -> OrderKey {
    let strategy = StrategyId::new(strategy);
    OrderKey {
        exchange: ExchangeId::BinanceSpot,
        symbol: Symbol::from("BTCUSDT"),
        cid: ClientOrderId::deterministic(&strategy, price_ticks, side),
        strategy,
    }
}

#[test]
fn re_placing_the_same_grid_level_yields_the_same_client_order_id() {
    let first = key("grid-btcusdt", 4_000_000, Side::Buy);
    let second = key("grid-btcusdt", 4_000_000, Side::Buy);
    assert_eq!(first.cid, second.cid);
}

#[test]
fn order_lifecycle_from_in_flight_to_fully_filled() {
    let key = key("grid-btcusdt", 4_000_000, Side::Buy);

    let request = RequestOpen::new(
        Side::Buy,
        dec!(40_000),
        dec!(0.01),
        OrderType::Limit,
        TimeInForce::GoodUntilCancelled,
        false,
        false,
    );

    let mut order = Order {
        key: key.clone(),
        side: request.side,
        price: request.price,
        quantity: request.quantity,
        kind: request.kind,
        time_in_force: request.time_in_force,
        reduce_only: request.reduce_only,
        use_margin: request.use_margin,
        state: OrderState::open_in_flight(),
    };
    assert_eq!(order.state.wire_status(), OrderStatus::New);

    order.state = OrderState::open(Open::new(
        OrderId::new("venue-1"),
        chrono::Utc::now(),
        dec!(40_000),
        dec!(0.01),
        dec!(0),
    ));
    assert_eq!(order.state.wire_status(), OrderStatus::New);

    order.state = OrderState::open(Open::new(
        OrderId::new("venue-1"),
        chrono::Utc::now(),
        dec!(40_000),
        dec!(0.01),
        dec!(0.006),
    ));
    assert_eq!(order.state.wire_status(), OrderStatus::PartiallyFilled);

    order.state = OrderState::fully_filled();
    assert_eq!(order.state.wire_status(), OrderStatus::Filled);
}

#[test]
fn cancel_request_carries_the_venue_id_once_open() {
    let key = key("grid-btcusdt", 3_990_000, Side::Sell);

    let active = Order {
        key: key.clone(),
        side: Side::Sell,
        price: dec!(39_900),
        quantity: dec!(0.02),
        kind: OrderType::Limit,
        time_in_force: TimeInForce::GoodUntilCancelled,
        reduce_only: false,
        use_margin: false,
        state: ActiveOrderState::Open(Open::new(
            OrderId::new("venue-2"),
            chrono::Utc::now(),
            dec!(39_900),
            dec!(0.02),
            dec!(0),
        )),
    };

    let cancel = active.to_request_cancel().unwrap();
    assert_eq!(cancel.state.id, Some(OrderId::new("venue-2")));
    assert_eq!(cancel.key, key);
}

#[test]
fn cancelled_state_round_trips_into_the_full_order_state() {
    let cancelled = Cancelled::new(OrderId::new("venue-3"), chrono::Utc::now());
    let state = OrderState::cancelled(cancelled);
    assert_eq!(state.wire_status(), OrderStatus::Canceled);
}
