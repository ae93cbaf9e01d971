use crate::{error::ConnectivityError, id::OrderId};
use chrono::{DateTime, Utc};
use derive_more::{Constructor, From};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use vantage_instrument::OrderStatus;

/// Lifecycle state of an [`crate::order::Order`].
///
/// Mirrors the `Active`/`Inactive` split of the wire-level [`OrderStatus`]
/// but carries the extra in-flight states needed to route a racing
/// placement-ack against a stream update by `client_order_id`.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, From)]
pub enum OrderState {
    Active(ActiveOrderState),
    Inactive(InactiveOrderState),
}

impl OrderState {
    pub fn open_in_flight() -> Self {
        Self::Active(ActiveOrderState::OpenInFlight(OpenInFlight))
    }

    pub fn open(state: Open) -> Self {
        Self::Active(ActiveOrderState::Open(state))
    }

    pub fn cancel_in_flight(id: Option<OrderId>) -> Self {
        Self::Active(ActiveOrderState::CancelInFlight(CancelInFlight { id }))
    }

    pub fn cancelled(state: Cancelled) -> Self {
        Self::Inactive(InactiveOrderState::Cancelled(state))
    }

    pub fn fully_filled() -> Self {
        Self::Inactive(InactiveOrderState::FullyFilled)
    }

    pub fn failed(state: Failed) -> Self {
        Self::Inactive(InactiveOrderState::Failed(state))
    }

    pub fn expired() -> Self {
        Self::Inactive(InactiveOrderState::Expired)
    }

    /// Map to the wire-level [`OrderStatus`] reported to strategies and over
    /// the gateway RPC surface.
    pub fn wire_status(&self) -> OrderStatus {
        match self {
            Self::Active(ActiveOrderState::OpenInFlight(_)) => OrderStatus::New,
            Self::Active(ActiveOrderState::Open(open)) if open.filled_quantity.is_zero() => {
                OrderStatus::New
            }
            Self::Active(ActiveOrderState::Open(_)) => OrderStatus::PartiallyFilled,
            Self::Active(ActiveOrderState::CancelInFlight(_)) => OrderStatus::PartiallyFilled,
            Self::Inactive(InactiveOrderState::Cancelled(_)) => OrderStatus::Canceled,
            Self::Inactive(InactiveOrderState::FullyFilled) => OrderStatus::Filled,
            Self::Inactive(InactiveOrderState::Failed(Failed::Rejected(_))) => {
                OrderStatus::Rejected
            }
            Self::Inactive(InactiveOrderState::Failed(Failed::Connectivity(_))) => {
                OrderStatus::Rejected
            }
            Self::Inactive(InactiveOrderState::Expired) => OrderStatus::Expired,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, From)]
pub enum ActiveOrderState {
    OpenInFlight(OpenInFlight),
    Open(Open),
    CancelInFlight(CancelInFlight),
}

impl ActiveOrderState {
    pub fn order_id(&self) -> Option<OrderId> {
        match self {
            ActiveOrderState::OpenInFlight(_) => None,
            ActiveOrderState::Open(state) => Some(state.id.clone()),
            ActiveOrderState::CancelInFlight(state) => state.id.clone(),
        }
    }

    pub fn is_open_or_in_flight(&self) -> bool {
        matches!(
            self,
            ActiveOrderState::OpenInFlight(_) | ActiveOrderState::Open(_)
        )
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub struct OpenInFlight;

#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Constructor,
)]
pub struct Open {
    pub id: OrderId,
    pub time_exchange: DateTime<Utc>,
    pub price: Decimal,
    pub quantity: Decimal,
    pub filled_quantity: Decimal,
}

impl Open {
    pub fn quantity_remaining(&self) -> Decimal {
        self.quantity - self.filled_quantity
    }
}

#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Constructor,
)]
pub struct CancelInFlight {
    pub id: Option<OrderId>,
}

#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, From)]
pub enum InactiveOrderState {
    Cancelled(Cancelled),
    FullyFilled,
    Failed(Failed),
    Expired,
}

#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Constructor,
)]
pub struct Cancelled {
    pub id: OrderId,
    pub time_exchange: DateTime<Utc>,
}

#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, From)]
pub enum Failed {
    Rejected(Option<String>),
    Connectivity(ConnectivityError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_status_reflects_partial_fill() {
        let state = OrderState::open(Open {
            id: OrderId::new("1"),
            time_exchange: Utc::now(),
            price: Decimal::ONE,
            quantity: Decimal::TEN,
            filled_quantity: Decimal::ONE,
        });
        assert_eq!(state.wire_status(), OrderStatus::PartiallyFilled);
    }

    #[test]
    fn wire_status_reflects_untouched_open_order() {
        let state = OrderState::open(Open {
            id: OrderId::new("1"),
            time_exchange: Utc::now(),
            price: Decimal::ONE,
            quantity: Decimal::TEN,
            filled_quantity: Decimal::ZERO,
        });
        assert_eq!(state.wire_status(), OrderStatus::New);
    }
}
