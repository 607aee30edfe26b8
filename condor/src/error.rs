use crate::{repository::RepoError, risk::RiskRefused, strategy::StrategyError};
use condor_execution::error::BrokerError;
use thiserror::Error;

/// Top-level engine error.
///
/// Startup propagates these (fail-fast); the steady-state loop logs them
/// and continues, except for fatal broker errors which drive the engine to
/// `Stopping`.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("broker: {0}")]
    Broker(#[from] BrokerError),

    #[error("repository: {0}")]
    Repository(#[from] RepoError),

    #[error("strategy: {0}")]
    Strategy(#[from] StrategyError),

    #[error(transparent)]
    Risk(#[from] RiskRefused),
}

impl EngineError {
    /// Whether this error must stop the loop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::Broker(error) if error.is_fatal())
    }
}
