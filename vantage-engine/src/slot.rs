use crate::store::{checksum, verify_checksum, Store, StoreError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use vantage_execution::{ClientOrderId, OrderId};
use vantage_instrument::{OrderStatus, Side, Symbol};

/// Lifecycle state of a grid [`Slot`].
///
/// ```text
/// FREE --place--> LOCKED
/// LOCKED --partial fill--> LOCKED (accumulate executed_qty)
/// LOCKED --full fill--> FILLED --settle--> FREE
/// LOCKED --cancel/reject/expire--> FREE
/// ```
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum SlotState {
    Free,
    Locked,
    Filled,
    Canceled,
}

impl SlotState {
    fn as_str(self) -> &'static str {
        match self {
            SlotState::Free => "FREE",
            SlotState::Locked => "LOCKED",
            SlotState::Filled => "FILLED",
            SlotState::Canceled => "CANCELED",
        }
    }

    fn from_str(s: &str) -> Self {
        match s {
            "LOCKED" => SlotState::Locked,
            "FILLED" => SlotState::Filled,
            "CANCELED" => SlotState::Canceled,
            _ => SlotState::Free,
        }
    }
}

/// A grid cell that owns at most one live order at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub slot_id: i64,
    pub side: Side,
    pub price: Decimal,
    pub qty: Decimal,
    pub executed_qty: Decimal,
    pub state: SlotState,
    pub order_id: Option<OrderId>,
    pub client_order_id: Option<ClientOrderId>,
    pub updated_at: i64,
}

impl Slot {
    pub fn new_free(slot_id: i64, side: Side, price: Decimal, qty: Decimal, now_ms: i64) -> Self {
        Self {
            slot_id,
            side,
            price,
            qty,
            executed_qty: Decimal::ZERO,
            state: SlotState::Free,
            order_id: None,
            client_order_id: None,
            updated_at: now_ms,
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self.state, SlotState::Locked)
    }

    /// Apply a wire order status to this slot, advancing it through the
    /// state machine. Returns `true` if the slot's state actually changed
    /// (used by the caller to decide whether a trade/metric event fires).
    pub fn apply_status(&mut self, status: OrderStatus, executed_qty: Decimal, now_ms: i64) -> bool {
        let before = self.state;
        match status {
            OrderStatus::New => self.state = SlotState::Locked,
            OrderStatus::PartiallyFilled => {
                self.state = SlotState::Locked;
                self.executed_qty = executed_qty;
            }
            OrderStatus::Filled => {
                self.executed_qty = executed_qty;
                self.state = SlotState::Filled;
            }
            OrderStatus::Canceled | OrderStatus::Rejected | OrderStatus::Expired => {
                self.state = SlotState::Canceled;
            }
        }
        self.updated_at = now_ms;
        before != self.state
    }

    /// Settle a `FILLED` slot back to `FREE`, clearing the order pointers so
    /// the next placement at this level gets a clean slate.
    pub fn settle(&mut self, now_ms: i64) {
        self.state = SlotState::Free;
        self.order_id = None;
        self.client_order_id = None;
        self.executed_qty = Decimal::ZERO;
        self.updated_at = now_ms;
    }

    /// Reset a slot that claims to be `LOCKED` but has no live order behind
    /// it (used during `sync_orders` recovery).
    pub fn reset_to_free(&mut self, now_ms: i64) {
        self.state = SlotState::Free;
        self.order_id = None;
        self.client_order_id = None;
        self.executed_qty = Decimal::ZERO;
        self.updated_at = now_ms;
    }

    fn checksum_fields(&self, symbol: &str) -> [String; 9] {
        [
            symbol.to_string(),
            self.slot_id.to_string(),
            format!("{:?}", self.side),
            self.price.to_string(),
            self.qty.to_string(),
            self.state.as_str().to_string(),
            self.order_id.as_ref().map(|i| i.0.to_string()).unwrap_or_default(),
            self.client_order_id.as_ref().map(|i| i.0.to_string()).unwrap_or_default(),
            self.executed_qty.to_string(),
        ]
    }
}

/// In-memory view of one symbol's grid slots, persisted through [`Store`].
///
/// Owned exclusively by that symbol's `SymbolManager`/engine task; never
/// shared across symbols.
#[derive(Debug, Clone, Default)]
pub struct SlotTable {
    slots: HashMap<i64, Slot>,
}

impl SlotTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slot_id: i64) -> Option<&Slot> {
        self.slots.get(&slot_id)
    }

    pub fn get_mut(&mut self, slot_id: i64) -> Option<&mut Slot> {
        self.slots.get_mut(&slot_id)
    }

    pub fn insert(&mut self, slot: Slot) {
        self.slots.insert(slot.slot_id, slot);
    }

    pub fn all(&self) -> impl Iterator<Item = &Slot> {
        self.slots.values()
    }

    pub fn free_slots(&self) -> impl Iterator<Item = &Slot> {
        self.slots.values().filter(|s| matches!(s.state, SlotState::Free))
    }

    pub fn locked_slots(&self) -> impl Iterator<Item = &Slot> {
        self.slots.values().filter(|s| s.is_locked())
    }

    pub fn find_by_client_order_id(&self, cid: &ClientOrderId) -> Option<&Slot> {
        self.slots.values().find(|s| s.client_order_id.as_ref() == Some(cid))
    }

    pub fn find_by_client_order_id_mut(&mut self, cid: &ClientOrderId) -> Option<&mut Slot> {
        self.slots.values_mut().find(|s| s.client_order_id.as_ref() == Some(cid))
    }

    pub fn find_by_order_id(&self, id: &OrderId) -> Option<&Slot> {
        self.slots.values().find(|s| s.order_id.as_ref() == Some(id))
    }

    pub fn find_by_order_id_mut(&mut self, id: &OrderId) -> Option<&mut Slot> {
        self.slots.values_mut().find(|s| s.order_id.as_ref() == Some(id))
    }

    /// Persist one slot's current state. Call before acknowledging any
    /// action that mutated it (spec 4.5e: "persist before acknowledging").
    pub fn persist(&self, store: &Store, symbol: &Symbol) -> Result<(), StoreError> {
        for slot in self.slots.values() {
            persist_slot(store, symbol, slot)?;
        }
        Ok(())
    }

    pub fn persist_one(&self, store: &Store, symbol: &Symbol, slot_id: i64) -> Result<(), StoreError> {
        if let Some(slot) = self.slots.get(&slot_id) {
            persist_slot(store, symbol, slot)?;
        }
        Ok(())
    }

    /// Load every slot persisted for `symbol`, replacing the in-memory view.
    pub fn load(store: &Store, symbol: &Symbol) -> Result<Self, StoreError> {
        let symbol_str = symbol.as_str().to_string();
        store.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT slot_id, side, price, qty, state, order_id, client_order_id, executed_qty, updated_at, checksum
                 FROM slots WHERE symbol = ?1",
            )?;
            let mut slots = HashMap::new();
            let rows = stmt.query_map([&symbol_str], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, Option<String>>(6)?,
                    row.get::<_, String>(7)?,
                    row.get::<_, i64>(8)?,
                    row.get::<_, String>(9)?,
                ))
            })?;

            for row in rows {
                let (slot_id, side, price, qty, state, order_id, client_order_id, executed_qty, updated_at, stored_checksum) = row?;
                let slot = Slot {
                    slot_id,
                    side: if side == "BUY" { Side::Buy } else { Side::Sell },
                    price: price.parse().unwrap_or_default(),
                    qty: qty.parse().unwrap_or_default(),
                    executed_qty: executed_qty.parse().unwrap_or_default(),
                    state: SlotState::from_str(&state),
                    order_id: order_id.map(OrderId::new),
                    client_order_id: client_order_id.map(ClientOrderId::new),
                    updated_at,
                };
                let fields = slot.checksum_fields(&symbol_str);
                let field_refs: Vec<&str> = fields.iter().map(String::as_str).collect();
                verify_checksum("slots", &slot_id.to_string(), &field_refs, &stored_checksum)?;
                slots.insert(slot_id, slot);
            }

            Ok(Self { slots })
        })
    }
}

fn persist_slot(store: &Store, symbol: &Symbol, slot: &Slot) -> Result<(), StoreError> {
    let symbol_str = symbol.as_str().to_string();
    let fields = slot.checksum_fields(&symbol_str);
    let field_refs: Vec<&str> = fields.iter().map(String::as_str).collect();
    let sum = checksum(&field_refs);

    store.with_conn(|conn| {
        conn.execute(
            "INSERT INTO slots (symbol, slot_id, side, price, qty, state, order_id, client_order_id, executed_qty, updated_at, checksum)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(symbol, slot_id) DO UPDATE SET
                side = excluded.side, price = excluded.price, qty = excluded.qty,
                state = excluded.state, order_id = excluded.order_id,
                client_order_id = excluded.client_order_id, executed_qty = excluded.executed_qty,
                updated_at = excluded.updated_at, checksum = excluded.checksum",
            rusqlite::params![
                symbol_str,
                slot.slot_id,
                format!("{:?}", slot.side).to_uppercase(),
                slot.price.to_string(),
                slot.qty.to_string(),
                slot.state.as_str(),
                slot.order_id.as_ref().map(|i| i.0.to_string()),
                slot.client_order_id.as_ref().map(|i| i.0.to_string()),
                slot.executed_qty.to_string(),
                slot.updated_at,
                sum,
            ],
        )?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn slot_round_trips_through_the_store() {
        let store = Store::open_in_memory().unwrap();
        let symbol = Symbol::from("BTCUSDT");
        let mut table = SlotTable::new();
        table.insert(Slot::new_free(0, Side::Buy, dec!(39_900), dec!(0.01), 1_000));
        table.persist(&store, &symbol).unwrap();

        let reloaded = SlotTable::load(&store, &symbol).unwrap();
        assert_eq!(reloaded.get(0).unwrap().price, dec!(39_900));
        assert_eq!(reloaded.get(0).unwrap().state, SlotState::Free);
    }

    #[test]
    fn full_fill_transitions_to_filled_then_settles_to_free() {
        let mut slot = Slot::new_free(0, Side::Buy, dec!(39_900), dec!(0.01), 0);
        slot.apply_status(OrderStatus::New, Decimal::ZERO, 1);
        assert_eq!(slot.state, SlotState::Locked);
        slot.apply_status(OrderStatus::PartiallyFilled, dec!(0.005), 2);
        assert_eq!(slot.state, SlotState::Locked);
        assert_eq!(slot.executed_qty, dec!(0.005));
        slot.apply_status(OrderStatus::Filled, dec!(0.01), 3);
        assert_eq!(slot.state, SlotState::Filled);
        slot.settle(4);
        assert_eq!(slot.state, SlotState::Free);
        assert!(slot.client_order_id.is_none());
    }

    #[test]
    fn cancel_reject_expire_all_free_the_slot() {
        for status in [OrderStatus::Canceled, OrderStatus::Rejected, OrderStatus::Expired] {
            let mut slot = Slot::new_free(0, Side::Sell, dec!(1), dec!(1), 0);
            slot.apply_status(OrderStatus::New, Decimal::ZERO, 1);
            slot.apply_status(status, Decimal::ZERO, 2);
            assert_eq!(slot.state, SlotState::Canceled);
        }
    }
}
