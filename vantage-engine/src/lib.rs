#![forbid(unsafe_code)]
#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    unused_qualifications
)]

//! Durable grid engine, symbol orchestrator, and funding-arbitrage workflow.
//!
//! [`store`] is the WAL-journaled SQLite substrate everything else is built
//! on; [`workflow`] layers exactly-once replay semantics on top of it;
//! [`slot`] and [`action`] implement the grid's FREE/LOCKED/FILLED/CANCELED
//! order-slot state machine and the diff against a freshly computed
//! `TargetState`; [`engine`] drives one symbol's grid tick-by-tick;
//! [`registry`] durably tracks which trading pairs should be running;
//! [`position`] holds the process-local view of a symbol's inventory;
//! [`manager`] and [`orchestrator`] wire one `SymbolManager` task per symbol
//! and fan a venue's streams out to them; [`arb`] runs the funding-arbitrage
//! entry/exit workflow as a pair of durable, hedge-sized IOC legs.

pub mod action;
pub mod arb;
pub mod engine;
pub mod manager;
pub mod orchestrator;
pub mod position;
pub mod registry;
pub mod slot;
pub mod store;
pub mod workflow;

pub use action::{ActionPlanner, SlotAction};
pub use arb::{ArbError, ArbFillOutcome, ArbWorkflow};
pub use engine::{EngineError, GhostFill, GridEngine};
pub use manager::{SymbolChannels, SymbolManager, SymbolReceivers};
pub use orchestrator::{Orchestrator, OrchestratorError};
pub use position::{PositionManager, PositionSnapshot};
pub use registry::{SymbolConfig, SymbolRegistry, SymbolStatus};
pub use slot::{Slot, SlotState, SlotTable};
pub use store::{Store, StoreError};
pub use workflow::{WorkflowId, WorkflowStatus, WorkflowStepRecord, WorkflowStore};
