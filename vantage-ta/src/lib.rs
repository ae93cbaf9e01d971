#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms,
    rust_2024_compatibility
)]

//! Technical analysis utilities for Vantage.
//!
//! This crate provides simple indicators (SMA, EMA, ATR), pattern detection
//! and signal generation helpers reused across strategies — most notably the
//! ATR feed into the grid strategy's volatility-scaled effective interval.

pub mod indicators;
pub mod patterns;
pub mod signals;
