use crate::{
    account::{AccountItem, AccountTag, AccountValue},
    order::OrderStatus,
};
use condor_instrument::{Currency, Ownership, asset::AssetKind, option::OptionRight};
use chrono::NaiveDate;
use smol_str::SmolStr;

/// Broker security-type code to engine [`AssetKind`].
///
/// ETFs trade under the broker's `STK` code; the engine-side distinction is
/// carried by the watch list, so `STK` maps to `Stock`.
pub fn asset_kind(code: &str) -> Option<AssetKind> {
    match code {
        "STK" => Some(AssetKind::Stock),
        "OPT" => Some(AssetKind::Option),
        "FUT" => Some(AssetKind::Future),
        "CASH" => Some(AssetKind::Forex),
        "IND" => Some(AssetKind::Index),
        "CFD" => Some(AssetKind::Cfd),
        "BOND" => Some(AssetKind::Bond),
        "CMDTY" => Some(AssetKind::Commodity),
        "FOP" => Some(AssetKind::FuturesOption),
        "FUND" => Some(AssetKind::MutualFund),
        "IOPT" => Some(AssetKind::Warrant),
        _ => None,
    }
}

/// Engine [`AssetKind`] to broker security-type code.
pub fn asset_kind_code(kind: AssetKind) -> &'static str {
    match kind {
        AssetKind::Stock | AssetKind::Etf => "STK",
        AssetKind::Option => "OPT",
        AssetKind::Future => "FUT",
        AssetKind::Forex => "CASH",
        AssetKind::Index => "IND",
        AssetKind::Cfd => "CFD",
        AssetKind::Bond => "BOND",
        AssetKind::Commodity => "CMDTY",
        AssetKind::FuturesOption => "FOP",
        AssetKind::MutualFund => "FUND",
        AssetKind::Warrant => "IOPT",
    }
}

pub fn option_right(code: &str) -> Option<OptionRight> {
    match code {
        "C" => Some(OptionRight::Call),
        "P" => Some(OptionRight::Put),
        _ => None,
    }
}

pub fn ownership(action: &str) -> Option<Ownership> {
    match action {
        "BUY" => Some(Ownership::Buyer),
        "SELL" => Some(Ownership::Seller),
        _ => None,
    }
}

pub fn ownership_action(ownership: Ownership) -> &'static str {
    match ownership {
        Ownership::Buyer => "BUY",
        Ownership::Seller => "SELL",
    }
}

pub fn order_status(status: &str) -> Option<OrderStatus> {
    match status {
        "ApiPending" => Some(OrderStatus::ApiPending),
        "PendingSubmit" => Some(OrderStatus::PendingSubmit),
        "PendingCancel" => Some(OrderStatus::PendingCancel),
        "PreSubmitted" => Some(OrderStatus::PreSubmitted),
        "Submitted" => Some(OrderStatus::Submitted),
        "ApiCancelled" => Some(OrderStatus::ApiCancelled),
        "Cancelled" => Some(OrderStatus::Cancelled),
        "Filled" => Some(OrderStatus::Filled),
        "Inactive" => Some(OrderStatus::Inactive),
        _ => None,
    }
}

/// Translate a raw broker account value.
///
/// Items in the broker's `"BASE"` cross-currency aggregate, items in a
/// currency other than the configured one, and unknown tags all drop
/// silently (`None`).
pub fn account_item(
    tag: &str,
    value: &str,
    currency: &str,
    configured: Currency,
) -> Option<AccountItem> {
    if tag == "AccountCode" {
        return Some(AccountItem {
            tag: AccountTag::Id,
            value: AccountValue::Text(SmolStr::new(value)),
        });
    }

    if currency == "BASE" || currency != configured.code() {
        return None;
    }

    let tag = match tag {
        "NetLiquidation" => AccountTag::NetLiquidation,
        "BuyingPower" => AccountTag::BuyingPower,
        "TotalCashValue" => AccountTag::Cash,
        "AvailableFunds" => AccountTag::Funds,
        "DayTradesRemaining" => AccountTag::MaxDayTrades,
        "InitMarginReq" => AccountTag::InitialMargin,
        "MaintMarginReq" => AccountTag::MaintenanceMargin,
        "ExcessLiquidity" => AccountTag::ExcessLiquidity,
        "Cushion" => AccountTag::Cushion,
        "GrossPositionValue" => AccountTag::GrossPositionValue,
        "EquityWithLoanValue" => AccountTag::EquityWithLoan,
        "SMA" => AccountTag::Sma,
        _ => return None,
    };

    let amount = value.parse::<f64>().ok()?;
    Some(AccountItem {
        tag,
        value: AccountValue::Amount(amount),
    })
}

/// Parse a broker `YYYYmmdd` date.
pub fn parse_wire_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y%m%d").ok()
}

/// Format a date in the broker's `YYYYmmdd` form.
pub fn format_wire_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_kind_round_trip() {
        for code in [
            "STK", "OPT", "FUT", "CASH", "IND", "CFD", "BOND", "CMDTY", "FOP", "FUND", "IOPT",
        ] {
            let kind = asset_kind(code).unwrap();
            assert_eq!(asset_kind_code(kind), code);
        }
        assert_eq!(asset_kind("WARP"), None);
        // ETF qualifies under the stock code.
        assert_eq!(asset_kind_code(AssetKind::Etf), "STK");
    }

    #[test]
    fn test_order_status_table() {
        assert_eq!(order_status("ApiPending"), Some(OrderStatus::ApiPending));
        assert_eq!(order_status("Filled"), Some(OrderStatus::Filled));
        assert_eq!(order_status("Inactive"), Some(OrderStatus::Inactive));
        assert_eq!(order_status("Unknown"), None);
    }

    #[test]
    fn test_account_item_currency_gate() {
        // Matching currency translates.
        let item = account_item("NetLiquidation", "10000.0", "USD", Currency::Usd).unwrap();
        assert_eq!(item.tag, AccountTag::NetLiquidation);
        assert_eq!(item.value, AccountValue::Amount(10_000.0));

        // BASE aggregate and foreign currencies drop.
        assert_eq!(
            account_item("NetLiquidation", "10000.0", "BASE", Currency::Usd),
            None
        );
        assert_eq!(
            account_item("NetLiquidation", "10000.0", "EUR", Currency::Usd),
            None
        );

        // Unknown tags drop silently.
        assert_eq!(account_item("WhatIfPMEnabled", "true", "USD", Currency::Usd), None);

        // Account id is currency-independent.
        let item = account_item("AccountCode", "DU123", "", Currency::Usd).unwrap();
        assert_eq!(item.tag, AccountTag::Id);
    }

    #[test]
    fn test_wire_dates() {
        let date = parse_wire_date("20180921").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2018, 9, 21).unwrap());
        assert_eq!(format_wire_date(date), "20180921");
        assert_eq!(parse_wire_date("2018-09-21"), None);
    }
}
