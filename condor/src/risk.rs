use crate::{config::Config, strategy::Strategy};
use condor_execution::account::Account;
use thiserror::Error;

/// A strategy the risk check declined to emit.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("risk refused: {reason}")]
pub struct RiskRefused {
    pub reason: String,
}

impl RiskRefused {
    pub fn new<R>(reason: R) -> Self
    where
        R: Into<String>,
    {
        Self {
            reason: reason.into(),
        }
    }
}

/// Largest loss a single trade may risk.
///
/// `min(net_liquidation * maximum_risk_factor,
///      cash - net_liquidation * preserved_cash_factor)`
///
/// Absent until the broker has reported both net liquidation and cash.
pub fn maximum_risk_per_trade(account: &Account, config: &Config) -> Option<f64> {
    let net_liquidation = account.net_liquidation?;
    let cash = account.cash?;

    let maximum_risk = net_liquidation * config.maximum_risk_factor;
    let available_cash = cash - net_liquidation * config.preserved_cash_factor;
    Some(maximum_risk.min(available_cash))
}

/// Refuse any strategy whose total worst case exceeds the per-trade limit.
pub fn check_strategy(strategy: &Strategy, maximum_risk: f64) -> Result<(), RiskRefused> {
    let per_lot = strategy
        .per_lot_max_loss()
        .map_err(|err| RiskRefused::new(err.to_string()))?;
    let exposure = per_lot * strategy.quantity as f64;

    if !exposure.is_finite() {
        return Err(RiskRefused::new(format!(
            "{} has non-finite maximum loss",
            strategy.id()
        )));
    }
    if exposure > maximum_risk {
        return Err(RiskRefused::new(format!(
            "{} risks {exposure:.2} against a limit of {maximum_risk:.2}",
            strategy.id()
        )));
    }
    Ok(())
}
