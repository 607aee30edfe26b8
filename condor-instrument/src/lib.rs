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
#![allow(clippy::type_complexity)]

//! # Condor-Instrument
//! Condor-Instrument contains the core Asset, OptionContract and market-data
//! value objects shared by the Condor trading engine and its broker adapters.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// [`Asset`](asset::AssetId) related data structures.
///
/// eg/ `AssetKind`, `AssetCode`, `AssetDefinition`, etc.
pub mod asset;

/// Option contract identity and quote snapshots.
///
/// eg/ `OptionContract`, `OptionRight`, `OptionQuote`, etc.
pub mod option;

/// Immutable market-data snapshots for an underlying.
///
/// eg/ `Current`, `Bar`, `History`.
pub mod market_data;

/// Serde helpers for NaN-sentinel quote fields.
pub mod serde_util;

/// Ownership of a leg, order or position - Buyer or Seller.
///
/// Multiplies signed cash flow: a Buyer pays (+1), a Seller receives (-1).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Ownership {
    #[serde(alias = "BUYER", alias = "Buyer")]
    Buyer,
    #[serde(alias = "SELLER", alias = "Seller")]
    Seller,
}

impl Ownership {
    /// Signed unit multiplier (+1 Buyer, -1 Seller).
    pub fn sign(&self) -> i8 {
        match self {
            Ownership::Buyer => 1,
            Ownership::Seller => -1,
        }
    }

    /// Signed unit multiplier as an `f64`, for price arithmetic.
    pub fn factor(&self) -> f64 {
        f64::from(self.sign())
    }

    pub fn reverse(&self) -> Self {
        match self {
            Ownership::Buyer => Ownership::Seller,
            Ownership::Seller => Ownership::Buyer,
        }
    }
}

impl Display for Ownership {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Ownership::Buyer => "buyer",
                Ownership::Seller => "seller",
            }
        )
    }
}

/// Account and quote currency.
#[derive(
    Debug, Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize,
)]
pub enum Currency {
    #[default]
    #[serde(alias = "usd")]
    Usd,
    #[serde(alias = "eur")]
    Eur,
}

impl Currency {
    /// Broker wire code for the currency.
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
        }
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ownership_sign_and_reverse() {
        assert_eq!(Ownership::Buyer.sign(), 1);
        assert_eq!(Ownership::Seller.sign(), -1);
        assert_eq!(Ownership::Buyer.reverse(), Ownership::Seller);
        assert_eq!(Ownership::Seller.reverse(), Ownership::Buyer);
    }

    #[test]
    fn test_currency_code() {
        assert_eq!(Currency::Usd.code(), "USD");
        assert_eq!(Currency::default(), Currency::Usd);
    }
}
