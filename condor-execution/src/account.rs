use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Account value tags the engine consumes.
///
/// The broker pushes many more; anything outside this whitelist is dropped
/// by the translator.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum AccountTag {
    Id,
    NetLiquidation,
    BuyingPower,
    Cash,
    Funds,
    MaxDayTrades,
    InitialMargin,
    MaintenanceMargin,
    ExcessLiquidity,
    Cushion,
    GrossPositionValue,
    EquityWithLoan,
    Sma,
}

/// One translated account value.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AccountItem {
    pub tag: AccountTag,
    pub value: AccountValue,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum AccountValue {
    Text(SmolStr),
    Amount(f64),
}

/// Broker account snapshot.
///
/// Fields arrive incrementally as tagged items; absent values stay `None`
/// until the broker reports them.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Account {
    pub id: Option<SmolStr>,
    /// Total cash value + stock value + options value + bond value.
    pub net_liquidation: Option<f64>,
    pub buying_power: Option<f64>,
    /// Cash recognised at the time of trade + futures PNL.
    pub cash: Option<f64>,
    /// Value available for trading.
    pub funds: Option<f64>,
    /// Open/Close trades allowed before pattern-day-trading detection;
    /// -1 means unlimited.
    pub max_day_trades: Option<f64>,
    pub initial_margin: Option<f64>,
    pub maintenance_margin: Option<f64>,
    /// Margin cushion before liquidation.
    pub excess_liquidity: Option<f64>,
    /// Excess liquidity as a fraction of net liquidation value.
    pub cushion: Option<f64>,
    /// Sum of the absolute value of all stock and equity option positions.
    pub gross_position_value: Option<f64>,
    pub equity_with_loan: Option<f64>,
    /// Special Memorandum Account balance.
    pub sma: Option<f64>,
}

impl Account {
    /// Apply a translated item to the snapshot.
    pub fn apply(&mut self, item: AccountItem) {
        match (item.tag, item.value) {
            (AccountTag::Id, AccountValue::Text(id)) => {
                // The account id is assigned once and never overwritten.
                if self.id.is_none() {
                    self.id = Some(id);
                }
            }
            (tag, AccountValue::Amount(amount)) => {
                let slot = match tag {
                    AccountTag::NetLiquidation => &mut self.net_liquidation,
                    AccountTag::BuyingPower => &mut self.buying_power,
                    AccountTag::Cash => &mut self.cash,
                    AccountTag::Funds => &mut self.funds,
                    AccountTag::MaxDayTrades => &mut self.max_day_trades,
                    AccountTag::InitialMargin => &mut self.initial_margin,
                    AccountTag::MaintenanceMargin => &mut self.maintenance_margin,
                    AccountTag::ExcessLiquidity => &mut self.excess_liquidity,
                    AccountTag::Cushion => &mut self.cushion,
                    AccountTag::GrossPositionValue => &mut self.gross_position_value,
                    AccountTag::EquityWithLoan => &mut self.equity_with_loan,
                    AccountTag::Sma => &mut self.sma,
                    AccountTag::Id => return,
                };
                *slot = Some(amount);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_apply() {
        let mut account = Account::default();
        account.apply(AccountItem {
            tag: AccountTag::NetLiquidation,
            value: AccountValue::Amount(10_000.0),
        });
        account.apply(AccountItem {
            tag: AccountTag::Id,
            value: AccountValue::Text(SmolStr::new("DU123")),
        });
        assert_eq!(account.net_liquidation, Some(10_000.0));
        assert_eq!(account.id.as_deref(), Some("DU123"));

        // Id is write-once.
        account.apply(AccountItem {
            tag: AccountTag::Id,
            value: AccountValue::Text(SmolStr::new("DU999")),
        });
        assert_eq!(account.id.as_deref(), Some("DU123"));
    }
}
