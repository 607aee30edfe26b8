use condor_instrument::{
    Currency, Ownership,
    asset::AssetCode,
    option::{OptionQuote, contract_tag},
};
use chrono::{DateTime, Utc};
use derive_more::{Display, From};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use thiserror::Error;

/// Templated multi-leg builders.
///
/// eg/ `ShortPutVerticalSpread`, `ShortCallVerticalSpread`, `ShortPut`.
pub mod spread;

/// Unique strategy identifier: `{code} {created dd-mm-YYYY HH:MM:SS}`.
///
/// Contains no `_` so it can be embedded in order references.
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display, From,
)]
pub struct StrategyId(SmolStr);

impl StrategyId {
    pub fn new(code: &AssetCode, created: DateTime<Utc>) -> Self {
        Self(SmolStr::from(format!(
            "{} {}",
            code,
            created.format("%d-%m-%Y %H:%M:%S")
        )))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for StrategyId {
    fn from(value: &str) -> Self {
        Self(SmolStr::new(value))
    }
}

/// Deterministic leg identifier, equal to the broker position id of the
/// same contract.
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display, From,
)]
pub struct LegId(SmolStr);

impl LegId {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
pub enum StrategyType {
    ShortPut,
    ShortPutVerticalSpread,
    ShortCallVerticalSpread,
}

impl StrategyType {
    pub fn code(&self) -> &'static str {
        match self {
            StrategyType::ShortPut => "SP",
            StrategyType::ShortPutVerticalSpread => "SPVS",
            StrategyType::ShortCallVerticalSpread => "SCVS",
        }
    }
}

/// One buy-or-sell component of a multi-leg strategy.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Leg {
    pub option: OptionQuote,
    pub ownership: Ownership,
    pub ratio: u32,
}

impl Leg {
    pub fn new(option: OptionQuote, ownership: Ownership, ratio: u32) -> Self {
        Self {
            option,
            ownership,
            ratio,
        }
    }

    pub fn id(&self) -> LegId {
        LegId(contract_tag(
            &self.option.contract.underlying,
            self.ownership,
            self.option.contract.right,
            self.option.contract.strike,
            self.option.contract.expiration,
        ))
    }

    /// Leg price: the option midpoint.
    pub fn price(&self) -> f64 {
        self.option.midpoint()
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Error)]
pub enum StrategyError {
    #[error("strategy requires at least one leg")]
    NoLegs,

    #[error("leg underlying {leg} does not match strategy code {strategy}")]
    MixedUnderlyings { strategy: AssetCode, leg: AssetCode },

    #[error("leg ratio must be at least 1")]
    ZeroRatio,

    #[error("leg multipliers must match")]
    MixedMultipliers,

    #[error("wrong option right for {0}")]
    WrongRight(StrategyType),

    #[error("invalid strike ordering for {0}")]
    StrikeOrder(StrategyType),

    #[error("entry price is not set")]
    Unpriced,
}

/// A defined combination of legs with an entry, take-profit and stop-loss
/// plan.
///
/// Lifecycle: `created` at construction, `opened` when the broker confirms
/// all parent legs filled, `closed` when all legs have zero remaining
/// positions.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Strategy {
    pub code: AssetCode,
    pub kind: StrategyType,
    pub ownership: Ownership,
    pub currency: Currency,
    pub take_profit_factor: f64,
    pub multiplier: u32,
    pub legs: Vec<Leg>,
    pub quantity: u32,
    pub entry_price: Option<f64>,
    pub underlying_entry_price: Option<f64>,
    pub opened: Option<DateTime<Utc>>,
    pub closed: Option<DateTime<Utc>>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl Strategy {
    pub fn new(
        code: AssetCode,
        kind: StrategyType,
        ownership: Ownership,
        currency: Currency,
        take_profit_factor: f64,
        multiplier: u32,
        legs: Vec<Leg>,
        created: DateTime<Utc>,
    ) -> Result<Self, StrategyError> {
        if legs.is_empty() {
            return Err(StrategyError::NoLegs);
        }
        for leg in &legs {
            if leg.option.contract.underlying != code {
                return Err(StrategyError::MixedUnderlyings {
                    strategy: code,
                    leg: leg.option.contract.underlying.clone(),
                });
            }
            if leg.ratio == 0 {
                return Err(StrategyError::ZeroRatio);
            }
            if leg.option.contract.multiplier != multiplier {
                return Err(StrategyError::MixedMultipliers);
            }
        }

        Ok(Self {
            code,
            kind,
            ownership,
            currency,
            take_profit_factor,
            multiplier,
            legs,
            quantity: 1,
            entry_price: None,
            underlying_entry_price: None,
            opened: None,
            closed: None,
            created,
            updated: created,
        })
    }

    pub fn id(&self) -> StrategyId {
        StrategyId::new(&self.code, self.created)
    }

    /// Signed per-lot entry price: `sum(ownership sign * ratio * leg price)`,
    /// rounded to cents.
    pub fn compute_entry_price(&self) -> f64 {
        let sum: f64 = self
            .legs
            .iter()
            .map(|leg| leg.ownership.factor() * leg.ratio as f64 * leg.price())
            .sum();
        round_cents(sum)
    }

    /// Total position quantity the broker should report once every parent
    /// leg is filled.
    pub fn expected_position_quantity(&self) -> u32 {
        self.legs.iter().map(|leg| leg.ratio * self.quantity).sum()
    }

    /// Worst-case loss of a single lot, in currency units.
    ///
    /// Requires a priced strategy (`entry_price` set).
    pub fn per_lot_max_loss(&self) -> Result<f64, StrategyError> {
        let entry = self.entry_price.ok_or(StrategyError::Unpriced)?;
        let multiplier = self.multiplier as f64;

        let strike = |ownership: Ownership| {
            self.legs
                .iter()
                .find(|leg| leg.ownership == ownership)
                .map(|leg| leg.option.contract.strike.to_f64().unwrap_or(f64::NAN))
        };

        let loss = match self.kind {
            StrategyType::ShortPut => {
                let short = strike(Ownership::Seller).ok_or(StrategyError::NoLegs)?;
                (short + entry) * multiplier
            }
            StrategyType::ShortPutVerticalSpread | StrategyType::ShortCallVerticalSpread => {
                let short = strike(Ownership::Seller).ok_or(StrategyError::NoLegs)?;
                let long = strike(Ownership::Buyer).ok_or(StrategyError::NoLegs)?;
                ((short - long).abs() + entry) * multiplier
            }
        };
        Ok(loss)
    }
}

pub(crate) fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
