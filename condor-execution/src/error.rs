use condor_instrument::asset::AssetCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by a [`BrokerPort`](crate::port::BrokerPort) implementation.
///
/// The engine treats [`BrokerError::ConnectionLost`] as fatal for the loop,
/// [`BrokerError::AmbiguousAsset`] as fatal at startup, and everything else
/// as recoverable on the next iteration.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Error)]
pub enum BrokerError {
    #[error("broker connection lost: {0}")]
    ConnectionLost(String),

    #[error("asset {0} did not resolve to exactly one contract")]
    AmbiguousAsset(AssetCode),

    #[error("contract no longer qualifies: {0}")]
    StaleContract(String),

    #[error("transient RPC failure: {0}")]
    TransientRpc(String),

    #[error("broker rejected request: {0}")]
    Rejected(String),
}

impl BrokerError {
    /// Whether the engine must transition to `Stopping` on this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BrokerError::ConnectionLost(_))
    }
}
