#![forbid(unsafe_code)]
#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    unused_qualifications
)]

//! Grid and funding-arbitrage strategy computations for Vantage.
//!
//! Strategies here are pure computations over a snapshot of inputs (price
//! history, position, regime, funding-rate readings) rather than owners of
//! order/slot state — that lifecycle belongs to `vantage-engine`, which
//! calls into this crate once per tick and diffs the result against its own
//! `Slot` table.

pub mod funding;
pub mod grid;
pub mod regime;
pub mod strategy;
pub mod target;
pub mod trend;

pub use funding::{ArbCandidate, ArbOpportunity, FundingArbSelector, ScoreWeights, SelectorConfig};
pub use grid::{GridConfig, GridStrategy, SkewMode};
pub use regime::{Regime, TimeOfDayOffWindow};
pub use strategy::{RecordingStrategy, Strategy, StrategyConfig};
pub use target::{TargetOrder, TargetState};
pub use trend::{TrendClassifier, TrendConfig};
