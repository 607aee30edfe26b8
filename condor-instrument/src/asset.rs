use crate::Currency;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Ticker symbol identifying an underlying on the broker.
///
/// eg/ `AssetCode::from("SPY")`
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
pub struct AssetCode(SmolStr);

impl AssetCode {
    pub fn new<S>(code: S) -> Self
    where
        S: Into<SmolStr>,
    {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for AssetCode {
    fn from(value: &str) -> Self {
        Self(SmolStr::new(value))
    }
}

/// Opaque broker contract handle obtained by qualifying an asset or option.
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
pub struct ContractId(SmolStr);

impl ContractId {
    pub fn new<S>(id: S) -> Self
    where
        S: Into<SmolStr>,
    {
        Self(id.into())
    }
}

impl From<&str> for ContractId {
    fn from(value: &str) -> Self {
        Self(SmolStr::new(value))
    }
}

/// Security type of a tradable asset.
///
/// Covers the broker's full universe; the engine's watch list only uses
/// `Stock`, `Etf` and `Index`.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Stock,
    Etf,
    Index,
    Option,
    Future,
    Forex,
    Cfd,
    Bond,
    Commodity,
    FuturesOption,
    MutualFund,
    Warrant,
}

/// Watch-list entry: the minimal data needed to qualify an asset.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub struct AssetDefinition {
    pub code: AssetCode,
    pub kind: AssetKind,
}

impl AssetDefinition {
    pub fn new<C>(code: C, kind: AssetKind) -> Self
    where
        C: Into<AssetCode>,
    {
        Self {
            code: code.into(),
            kind,
        }
    }
}

/// Immutable identity of a watch-list asset.
///
/// The `contract` handle is absent until the broker qualifies the
/// definition at engine start.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub struct AssetId {
    pub code: AssetCode,
    pub kind: AssetKind,
    pub currency: Currency,
    pub contract: Option<ContractId>,
}

impl AssetId {
    pub fn new(code: AssetCode, kind: AssetKind, currency: Currency) -> Self {
        Self {
            code,
            kind,
            currency,
            contract: None,
        }
    }

    /// Identity with the broker contract handle attached.
    pub fn with_contract(self, contract: ContractId) -> Self {
        Self {
            contract: Some(contract),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_id_qualification() {
        let id = AssetId::new(AssetCode::from("SPY"), AssetKind::Stock, Currency::Usd);
        assert!(id.contract.is_none());

        let id = id.with_contract(ContractId::from("756733"));
        assert_eq!(id.contract, Some(ContractId::from("756733")));
        assert_eq!(id.code.as_str(), "SPY");
    }
}
