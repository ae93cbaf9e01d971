use crate::{
    id::{ClientOrderId, StrategyId},
    request::{OrderKey, OrderRequestCancel, OrderRequestOpen, RequestCancel},
    state::{ActiveOrderState, Open, OpenInFlight, OrderState},
};
use derive_more::Constructor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use vantage_instrument::{exchange::ExchangeId, OrderType, Side, Symbol, TimeInForce};

/// An order tracked by the engine, parametrised by its lifecycle `State`
/// (commonly [`OrderState`] for a full snapshot, or [`ActiveOrderState`]
/// once narrowed to the still-live subset).
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Constructor,
)]
pub struct Order<State = OrderState> {
    pub key: OrderKey,
    pub side: Side,
    pub price: Decimal,
    pub quantity: Decimal,
    pub kind: OrderType,
    pub time_in_force: TimeInForce,
    pub reduce_only: bool,
    pub use_margin: bool,
    pub state: State,
}

impl Order<OrderState> {
    pub fn exchange(&self) -> ExchangeId {
        self.key.exchange
    }

    pub fn symbol(&self) -> &Symbol {
        &self.key.symbol
    }

    pub fn strategy(&self) -> &StrategyId {
        &self.key.strategy
    }

    pub fn client_order_id(&self) -> &ClientOrderId {
        &self.key.cid
    }

    pub fn to_active(&self) -> Option<Order<ActiveOrderState>> {
        let OrderState::Active(state) = &self.state else {
            return None;
        };

        Some(Order {
            key: self.key.clone(),
            side: self.side,
            price: self.price,
            quantity: self.quantity,
            kind: self.kind,
            time_in_force: self.time_in_force,
            reduce_only: self.reduce_only,
            use_margin: self.use_margin,
            state: state.clone(),
        })
    }
}

impl Order<ActiveOrderState> {
    pub fn to_request_cancel(&self) -> Option<OrderRequestCancel> {
        let request = match &self.state {
            ActiveOrderState::OpenInFlight(_) => RequestCancel { id: None },
            ActiveOrderState::Open(open) => RequestCancel { id: Some(open.id.clone()) },
            ActiveOrderState::CancelInFlight(_) => return None,
        };

        Some(OrderRequestCancel { key: self.key.clone(), state: request })
    }
}

impl From<&OrderRequestOpen> for Order<ActiveOrderState> {
    fn from(value: &OrderRequestOpen) -> Self {
        let OrderRequestOpen { key, state } = value;

        Self {
            key: key.clone(),
            side: state.side,
            price: state.price,
            quantity: state.quantity,
            kind: state.kind,
            time_in_force: state.time_in_force,
            reduce_only: state.reduce_only,
            use_margin: state.use_margin,
            state: ActiveOrderState::OpenInFlight(OpenInFlight),
        }
    }
}

impl From<Order<Open>> for Order<ActiveOrderState> {
    fn from(value: Order<Open>) -> Self {
        Order {
            key: value.key,
            side: value.side,
            price: value.price,
            quantity: value.quantity,
            kind: value.kind,
            time_in_force: value.time_in_force,
            reduce_only: value.reduce_only,
            use_margin: value.use_margin,
            state: ActiveOrderState::Open(value.state),
        }
    }
}

impl From<Order<Open>> for Order<OrderState> {
    fn from(value: Order<Open>) -> Self {
        Order {
            key: value.key,
            side: value.side,
            price: value.price,
            quantity: value.quantity,
            kind: value.kind,
            time_in_force: value.time_in_force,
            reduce_only: value.reduce_only,
            use_margin: value.use_margin,
            state: OrderState::Active(ActiveOrderState::Open(value.state)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::OrderId;
    use chrono::Utc;
    use vantage_instrument::exchange::ExchangeId;

    fn key() -> OrderKey {
        OrderKey {
            exchange: ExchangeId::BinanceSpot,
            symbol: Symbol::from("BTCUSDT"),
            strategy: StrategyId::new("grid"),
            cid: ClientOrderId::new("abc"),
        }
    }

    #[test]
    fn open_in_flight_order_cancels_without_a_venue_id() {
        let order = Order {
            key: key(),
            side: Side::Buy,
            price: Decimal::ONE,
            quantity: Decimal::ONE,
            kind: OrderType::Limit,
            time_in_force: TimeInForce::GoodUntilCancelled,
            reduce_only: false,
            use_margin: false,
            state: ActiveOrderState::OpenInFlight(OpenInFlight),
        };

        let cancel = order.to_request_cancel().unwrap();
        assert_eq!(cancel.state.id, None);
    }

    #[test]
    fn open_order_cancel_carries_the_venue_id() {
        let order = Order {
            key: key(),
            side: Side::Buy,
            price: Decimal::ONE,
            quantity: Decimal::ONE,
            kind: OrderType::Limit,
            time_in_force: TimeInForce::GoodUntilCancelled,
            reduce_only: false,
            use_margin: false,
            state: ActiveOrderState::Open(Open {
                id: OrderId::new("venue-1"),
                time_exchange: Utc::now(),
                price: Decimal::ONE,
                quantity: Decimal::ONE,
                filled_quantity: Decimal::ZERO,
            }),
        };

        let cancel = order.to_request_cancel().unwrap();
        assert_eq!(cancel.state.id, Some(OrderId::new("venue-1")));
    }
}
