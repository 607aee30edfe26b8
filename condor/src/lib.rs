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
#![allow(clippy::type_complexity, clippy::too_many_arguments)]

//! # Condor
//! Automated options-trading engine. Condor ingests market data for a
//! watch list of equity/ETF/index assets, maintains per-asset analytic
//! measures and a directional forecast, evaluates registered trading
//! algorithms into multi-leg option strategies, sizes and prices them
//! against account risk limits, submits them as bracketed order groups
//! through a [`BrokerPort`](condor_execution::port::BrokerPort), and tracks
//! the resulting positions until they are filled or closed.
//!
//! The [`engine`] module owns the single-threaded cooperative loop:
//! refresh, reconcile, recompute, run algorithms, sleep.

/// Registered trading-algorithm interface.
pub mod algo;

/// Pure analytic functions over column-oriented price/IV series.
///
/// eg/ `beta`, `correlation`, `rsi`, `sma`, `iv_rank`, directional forecast.
pub mod analytics;

/// Engine configuration.
pub mod config;

/// Sizing, pricing and submission of new strategies; order-status handling.
pub mod coordinator;

/// The trading engine loop and its clock.
pub mod engine;

/// Top-level engine error.
pub mod error;

/// Logging initialisation utilities.
pub mod logging;

/// Durable storage of strategies.
pub mod repository;

/// Account risk limits.
pub mod risk;

/// In-memory authoritative state: assets, account, strategies.
pub mod state;

/// Strategy, Leg and the templated multi-leg builders.
pub mod strategy;

pub type FnvIndexMap<K, V> = indexmap::IndexMap<K, V, fnv::FnvBuildHasher>;
pub type FnvIndexSet<T> = indexmap::IndexSet<T, fnv::FnvBuildHasher>;
