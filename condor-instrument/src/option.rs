use crate::{
    Ownership,
    asset::{AssetCode, ContractId},
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt::{Display, Formatter};

/// Deterministic tag identifying one owned option contract.
///
/// Shared by strategy legs and broker position snapshots so the two can be
/// matched during reconciliation.
///
/// eg/ `"SPY -1 P 100.0 21-09-2018"`
pub fn contract_tag(
    underlying: &AssetCode,
    ownership: Ownership,
    right: OptionRight,
    strike: Decimal,
    expiration: NaiveDate,
) -> SmolStr {
    SmolStr::from(format!(
        "{} {} {} {:.1} {}",
        underlying,
        ownership.sign(),
        right,
        strike.to_f64().unwrap_or(f64::NAN),
        expiration.format("%d-%m-%Y"),
    ))
}

/// [`OptionContract`] right - Call or Put.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionRight {
    #[serde(alias = "C", alias = "CALL", alias = "Call")]
    Call,
    #[serde(alias = "P", alias = "PUT", alias = "Put")]
    Put,
}

impl OptionRight {
    /// Broker wire code ("C" / "P").
    pub fn code(&self) -> &'static str {
        match self {
            OptionRight::Call => "C",
            OptionRight::Put => "P",
        }
    }
}

impl Display for OptionRight {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Identity of a single option contract.
///
/// The `contract` handle is absent until the broker qualifies the contract;
/// a restart may find the previous handle stale and re-qualify.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct OptionContract {
    pub underlying: AssetCode,
    pub expiration: NaiveDate,
    pub strike: Decimal,
    pub right: OptionRight,
    pub multiplier: u32,
    pub contract: Option<ContractId>,
}

impl OptionContract {
    pub fn new(
        underlying: AssetCode,
        expiration: NaiveDate,
        strike: Decimal,
        right: OptionRight,
        multiplier: u32,
    ) -> Self {
        Self {
            underlying,
            expiration,
            strike,
            right,
            multiplier,
            contract: None,
        }
    }

    pub fn with_contract(self, contract: ContractId) -> Self {
        Self {
            contract: Some(contract),
            ..self
        }
    }

    /// Days to expiration relative to the provided calendar day.
    pub fn dte(&self, today: NaiveDate) -> i64 {
        (self.expiration - today).num_days()
    }

    /// Chain key in `{strike}{right}` form, eg/ "100P".
    pub fn chain_key(&self) -> String {
        format!("{}{}", self.strike.normalize(), self.right)
    }
}

/// Broker-computed greeks for an option contract.
///
/// Values default to NaN when the broker model has not produced them yet.
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd, Deserialize, Serialize)]
pub struct Greeks {
    #[serde(with = "crate::serde_util::nan")]
    pub delta: f64,
    #[serde(with = "crate::serde_util::nan")]
    pub gamma: f64,
    #[serde(with = "crate::serde_util::nan")]
    pub theta: f64,
    #[serde(with = "crate::serde_util::nan")]
    pub vega: f64,
    #[serde(with = "crate::serde_util::nan")]
    pub iv: f64,
}

impl Default for Greeks {
    fn default() -> Self {
        Self {
            delta: f64::NAN,
            gamma: f64::NAN,
            theta: f64::NAN,
            vega: f64::NAN,
            iv: f64::NAN,
        }
    }
}

/// Latest quoted snapshot of an option contract.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OptionQuote {
    pub contract: OptionContract,
    #[serde(with = "crate::serde_util::nan")]
    pub high: f64,
    #[serde(with = "crate::serde_util::nan")]
    pub low: f64,
    #[serde(with = "crate::serde_util::nan")]
    pub close: f64,
    #[serde(with = "crate::serde_util::nan")]
    pub bid: f64,
    #[serde(with = "crate::serde_util::nan")]
    pub bid_size: f64,
    #[serde(with = "crate::serde_util::nan")]
    pub ask: f64,
    #[serde(with = "crate::serde_util::nan")]
    pub ask_size: f64,
    #[serde(with = "crate::serde_util::nan")]
    pub last: f64,
    #[serde(with = "crate::serde_util::nan")]
    pub last_size: f64,
    #[serde(with = "crate::serde_util::nan")]
    pub volume: f64,
    #[serde(with = "crate::serde_util::nan")]
    pub option_price: f64,
    #[serde(with = "crate::serde_util::nan")]
    pub underlying_price: f64,
    #[serde(with = "crate::serde_util::nan")]
    pub underlying_dividends: f64,
    pub greeks: Greeks,
    pub time: DateTime<Utc>,
}

impl OptionQuote {
    pub fn midpoint(&self) -> f64 {
        (self.bid + self.ask) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn contract(strike: Decimal, right: OptionRight) -> OptionContract {
        OptionContract::new(
            AssetCode::from("SPY"),
            NaiveDate::from_ymd_opt(2018, 9, 21).unwrap(),
            strike,
            right,
            100,
        )
    }

    #[test]
    fn test_dte() {
        let contract = contract(dec!(100), OptionRight::Put);
        let today = NaiveDate::from_ymd_opt(2018, 9, 1).unwrap();
        assert_eq!(contract.dte(today), 20);

        let after = NaiveDate::from_ymd_opt(2018, 9, 22).unwrap();
        assert_eq!(contract.dte(after), -1);
    }

    #[test]
    fn test_chain_key() {
        assert_eq!(contract(dec!(100), OptionRight::Put).chain_key(), "100P");
        assert_eq!(contract(dec!(97.5), OptionRight::Call).chain_key(), "97.5C");
    }

    #[test]
    fn test_quote_serde_round_trip_with_nan_fields() {
        let quote = OptionQuote {
            contract: contract(dec!(100), OptionRight::Put),
            high: f64::NAN,
            low: f64::NAN,
            close: 6.2,
            bid: 6.0,
            bid_size: 10.0,
            ask: 7.0,
            ask_size: 12.0,
            last: f64::NAN,
            last_size: f64::NAN,
            volume: 1500.0,
            option_price: 6.5,
            underlying_price: 102.0,
            underlying_dividends: 0.0,
            greeks: Greeks::default(),
            time: DateTime::<Utc>::MIN_UTC,
        };

        let json = serde_json::to_string(&quote).unwrap();
        let decoded: OptionQuote = serde_json::from_str(&json).unwrap();

        // NaN fields travel as null and come back as NaN.
        assert!(decoded.high.is_nan());
        assert!(decoded.last.is_nan());
        assert!(decoded.greeks.delta.is_nan());
        assert_eq!(decoded.close, 6.2);
        assert_eq!(decoded.contract, quote.contract);
    }

    #[test]
    fn test_contract_tag() {
        let tag = contract_tag(
            &AssetCode::from("SPY"),
            Ownership::Seller,
            OptionRight::Put,
            dec!(100),
            NaiveDate::from_ymd_opt(2018, 9, 21).unwrap(),
        );
        assert_eq!(tag, "SPY -1 P 100.0 21-09-2018");

        let tag = contract_tag(
            &AssetCode::from("EEM"),
            Ownership::Buyer,
            OptionRight::Call,
            dec!(42.5),
            NaiveDate::from_ymd_opt(2018, 12, 21).unwrap(),
        );
        assert_eq!(tag, "EEM 1 C 42.5 21-12-2018");
    }

    #[test]
    fn test_quote_midpoint() {
        let quote = OptionQuote {
            contract: contract(dec!(100), OptionRight::Put),
            high: f64::NAN,
            low: f64::NAN,
            close: f64::NAN,
            bid: 6.0,
            bid_size: 10.0,
            ask: 7.0,
            ask_size: 12.0,
            last: 6.4,
            last_size: 1.0,
            volume: 1500.0,
            option_price: 6.5,
            underlying_price: 102.0,
            underlying_dividends: 0.0,
            greeks: Greeks::default(),
            time: DateTime::<Utc>::MIN_UTC,
        };
        assert_eq!(quote.midpoint(), 6.5);
    }
}
