use crate::{state::DataStore, strategy::Strategy};
use condor_instrument::asset::AssetCode;
use thiserror::Error;

/// Failure raised by a registered algorithm.
///
/// Logged per-algorithm by the engine; never aborts the loop or the other
/// algorithms.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("algorithm {name} failed: {reason}")]
pub struct AlgoError {
    pub name: String,
    pub reason: String,
}

impl AlgoError {
    pub fn new<N, R>(name: N, reason: R) -> Self
    where
        N: Into<String>,
        R: Into<String>,
    {
        Self {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// A user-supplied trading algorithm.
///
/// Invoked once per loop iteration, in registration order, with a read-only
/// view of the [`DataStore`]. Returned strategies are sized, priced,
/// risk-checked and submitted by the engine.
pub trait TradeAlgo {
    fn name(&self) -> &str;

    /// Codes whose option chains the engine should discover before
    /// [`evaluate`](TradeAlgo::evaluate) runs this iteration.
    ///
    /// Discovered chains appear on the corresponding
    /// [`AssetState`](crate::state::asset::AssetState).
    fn chain_requests(&mut self, _store: &DataStore) -> Vec<AssetCode> {
        Vec::new()
    }

    fn evaluate(&mut self, store: &DataStore) -> Result<Vec<Strategy>, AlgoError>;
}
