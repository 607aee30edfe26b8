use condor_instrument::{
    Ownership,
    asset::{AssetCode, AssetKind},
    option::{OptionRight, contract_tag},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Immutable position snapshot reported by the broker.
///
/// Option positions carry expiration/strike/right; underlying positions
/// leave them absent.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Position {
    pub code: AssetCode,
    pub kind: AssetKind,
    pub ownership: Ownership,
    pub expiration: Option<NaiveDate>,
    pub strike: Option<Decimal>,
    pub right: Option<OptionRight>,
    pub quantity: u32,
    pub average_cost: f64,
}

impl Position {
    /// Identifier matching the leg-id format, so strategy legs and broker
    /// positions can be joined during reconciliation.
    ///
    /// Non-option positions fall back to the bare code.
    pub fn position_id(&self) -> SmolStr {
        match (self.right, self.strike, self.expiration) {
            (Some(right), Some(strike), Some(expiration)) => {
                contract_tag(&self.code, self.ownership, right, strike, expiration)
            }
            _ => SmolStr::new(self.code.as_str()),
        }
    }
}
