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

//! # Condor-Execution
//! Normalised broker interface consumed by the Condor trading engine.
//! Defines the narrow [`BrokerPort`](port::BrokerPort) capability set, the
//! account/position/order/trade models it exchanges, and the translation of
//! broker wire codes into engine entities. A scripted [`MockBroker`](mock::MockBroker)
//! supports engine and coordinator tests without a live connection.

/// Broker account snapshot and tag application.
pub mod account;

/// In-loop delivery channel for broker callbacks.
pub mod channel;

/// All errors a broker adapter can surface to the engine.
pub mod error;

/// Scripted [`port::BrokerPort`] implementation for tests and dry runs.
pub mod mock;

/// Order templates, roles, statuses and the order-reference codec.
pub mod order;

/// The abstract capability set the engine consumes.
pub mod port;

/// Broker-reported position snapshots.
pub mod position;

/// Order-status callbacks.
pub mod trade;

/// Wire-code translation tables.
pub mod translator;

pub type FnvIndexMap<K, V> = indexmap::IndexMap<K, V, fnv::FnvBuildHasher>;
pub type FnvIndexSet<T> = indexmap::IndexSet<T, fnv::FnvBuildHasher>;
