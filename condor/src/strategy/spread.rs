use crate::strategy::{Leg, Strategy, StrategyError, StrategyType, round_cents};
use condor_instrument::{Currency, Ownership, option::{OptionQuote, OptionRight}};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;

fn strike(quote: &OptionQuote) -> f64 {
    quote.contract.strike.to_f64().unwrap_or(f64::NAN)
}

/// Short put vertical spread: buy a put below a sold put, collecting a net
/// credit. All derived figures are per lot; prices signed, money figures in
/// contract-multiplier units.
#[derive(Debug, Clone, PartialEq)]
pub struct ShortPutVerticalSpread {
    buy_put: OptionQuote,
    sell_put: OptionQuote,
    profit_factor: f64,
}

impl ShortPutVerticalSpread {
    pub fn new(
        buy_put: OptionQuote,
        sell_put: OptionQuote,
        profit_factor: f64,
    ) -> Result<Self, StrategyError> {
        if buy_put.contract.right != OptionRight::Put || sell_put.contract.right != OptionRight::Put
        {
            return Err(StrategyError::WrongRight(
                StrategyType::ShortPutVerticalSpread,
            ));
        }
        if buy_put.contract.strike >= sell_put.contract.strike {
            return Err(StrategyError::StrikeOrder(
                StrategyType::ShortPutVerticalSpread,
            ));
        }
        Ok(Self {
            buy_put,
            sell_put,
            profit_factor,
        })
    }

    /// Net signed entry price; negative for a credit received.
    pub fn entry_price(&self) -> f64 {
        round_cents(self.buy_put.midpoint() - self.sell_put.midpoint())
    }

    pub fn profit_price(&self) -> f64 {
        round_cents(self.entry_price() * self.profit_factor)
    }

    pub fn breakeven_price(&self) -> f64 {
        strike(&self.sell_put) + self.entry_price()
    }

    pub fn maximum_profit(&self) -> f64 {
        self.entry_price() * self.sell_put.contract.multiplier as f64
    }

    pub fn maximum_loss(&self) -> f64 {
        (strike(&self.sell_put) - strike(&self.buy_put) + self.entry_price())
            * self.sell_put.contract.multiplier as f64
    }

    pub fn roi(&self) -> f64 {
        (self.maximum_profit() / self.maximum_loss()).abs()
    }

    /// Probability-of-profit approximation: `(1 - credit / width) * 100`.
    pub fn probability_of_profit(&self) -> f64 {
        let width = strike(&self.sell_put) - strike(&self.buy_put);
        (1.0 - self.entry_price().abs() / width) * 100.0
    }

    /// Materialise the spread into a priced [`Strategy`].
    pub fn into_strategy(
        self,
        currency: Currency,
        created: DateTime<Utc>,
    ) -> Result<Strategy, StrategyError> {
        let entry_price = self.entry_price();
        let code = self.sell_put.contract.underlying.clone();
        let multiplier = self.sell_put.contract.multiplier;
        let underlying_price = self.sell_put.underlying_price;

        let mut strategy = Strategy::new(
            code,
            StrategyType::ShortPutVerticalSpread,
            Ownership::Buyer,
            currency,
            self.profit_factor,
            multiplier,
            vec![
                Leg::new(self.buy_put, Ownership::Buyer, 1),
                Leg::new(self.sell_put, Ownership::Seller, 1),
            ],
            created,
        )?;
        strategy.entry_price = Some(entry_price);
        strategy.underlying_entry_price =
            (!underlying_price.is_nan()).then_some(underlying_price);
        Ok(strategy)
    }
}

/// Short call vertical spread: sell a call below a bought call.
#[derive(Debug, Clone, PartialEq)]
pub struct ShortCallVerticalSpread {
    buy_call: OptionQuote,
    sell_call: OptionQuote,
    profit_factor: f64,
}

impl ShortCallVerticalSpread {
    pub fn new(
        buy_call: OptionQuote,
        sell_call: OptionQuote,
        profit_factor: f64,
    ) -> Result<Self, StrategyError> {
        if buy_call.contract.right != OptionRight::Call
            || sell_call.contract.right != OptionRight::Call
        {
            return Err(StrategyError::WrongRight(
                StrategyType::ShortCallVerticalSpread,
            ));
        }
        if sell_call.contract.strike >= buy_call.contract.strike {
            return Err(StrategyError::StrikeOrder(
                StrategyType::ShortCallVerticalSpread,
            ));
        }
        Ok(Self {
            buy_call,
            sell_call,
            profit_factor,
        })
    }

    pub fn entry_price(&self) -> f64 {
        round_cents(self.buy_call.midpoint() - self.sell_call.midpoint())
    }

    pub fn profit_price(&self) -> f64 {
        round_cents(self.entry_price() * self.profit_factor)
    }

    pub fn breakeven_price(&self) -> f64 {
        strike(&self.sell_call) - self.entry_price()
    }

    pub fn maximum_profit(&self) -> f64 {
        self.entry_price() * self.sell_call.contract.multiplier as f64
    }

    pub fn maximum_loss(&self) -> f64 {
        (strike(&self.buy_call) - strike(&self.sell_call) + self.entry_price())
            * self.sell_call.contract.multiplier as f64
    }

    pub fn roi(&self) -> f64 {
        (self.maximum_profit() / self.maximum_loss()).abs()
    }

    pub fn probability_of_profit(&self) -> f64 {
        let width = strike(&self.buy_call) - strike(&self.sell_call);
        (1.0 - self.entry_price().abs() / width) * 100.0
    }

    pub fn into_strategy(
        self,
        currency: Currency,
        created: DateTime<Utc>,
    ) -> Result<Strategy, StrategyError> {
        let entry_price = self.entry_price();
        let code = self.sell_call.contract.underlying.clone();
        let multiplier = self.sell_call.contract.multiplier;
        let underlying_price = self.sell_call.underlying_price;

        let mut strategy = Strategy::new(
            code,
            StrategyType::ShortCallVerticalSpread,
            Ownership::Buyer,
            currency,
            self.profit_factor,
            multiplier,
            vec![
                Leg::new(self.buy_call, Ownership::Buyer, 1),
                Leg::new(self.sell_call, Ownership::Seller, 1),
            ],
            created,
        )?;
        strategy.entry_price = Some(entry_price);
        strategy.underlying_entry_price =
            (!underlying_price.is_nan()).then_some(underlying_price);
        Ok(strategy)
    }
}

/// Naked short put.
#[derive(Debug, Clone, PartialEq)]
pub struct ShortPut {
    sell_put: OptionQuote,
    profit_factor: f64,
}

impl ShortPut {
    pub fn new(sell_put: OptionQuote, profit_factor: f64) -> Result<Self, StrategyError> {
        if sell_put.contract.right != OptionRight::Put {
            return Err(StrategyError::WrongRight(StrategyType::ShortPut));
        }
        Ok(Self {
            sell_put,
            profit_factor,
        })
    }

    pub fn entry_price(&self) -> f64 {
        round_cents(-self.sell_put.midpoint())
    }

    pub fn profit_price(&self) -> f64 {
        round_cents(self.entry_price() * self.profit_factor)
    }

    pub fn breakeven_price(&self) -> f64 {
        strike(&self.sell_put) + self.entry_price()
    }

    pub fn maximum_profit(&self) -> f64 {
        self.entry_price() * self.sell_put.contract.multiplier as f64
    }

    /// Assignment at a worthless underlying: the full strike less the
    /// credit received.
    pub fn maximum_loss(&self) -> f64 {
        (strike(&self.sell_put) + self.entry_price()) * self.sell_put.contract.multiplier as f64
    }

    pub fn roi(&self) -> f64 {
        (self.maximum_profit() / self.maximum_loss()).abs()
    }

    pub fn into_strategy(
        self,
        currency: Currency,
        created: DateTime<Utc>,
    ) -> Result<Strategy, StrategyError> {
        let entry_price = self.entry_price();
        let code = self.sell_put.contract.underlying.clone();
        let multiplier = self.sell_put.contract.multiplier;
        let underlying_price = self.sell_put.underlying_price;

        let mut strategy = Strategy::new(
            code,
            StrategyType::ShortPut,
            Ownership::Buyer,
            currency,
            self.profit_factor,
            multiplier,
            vec![Leg::new(self.sell_put, Ownership::Seller, 1)],
            created,
        )?;
        strategy.entry_price = Some(entry_price);
        strategy.underlying_entry_price =
            (!underlying_price.is_nan()).then_some(underlying_price);
        Ok(strategy)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use condor_instrument::{
        asset::AssetCode,
        option::{Greeks, OptionContract},
    };
    use chrono::{NaiveDate, TimeZone};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    pub(crate) fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    pub(crate) fn option_quote(
        code: &str,
        strike: Decimal,
        right: OptionRight,
        bid: f64,
        ask: f64,
    ) -> OptionQuote {
        OptionQuote {
            contract: OptionContract::new(
                AssetCode::from(code),
                NaiveDate::from_ymd_opt(2018, 9, 21).unwrap(),
                strike,
                right,
                100,
            ),
            high: f64::NAN,
            low: f64::NAN,
            close: f64::NAN,
            bid,
            bid_size: 10.0,
            ask,
            ask_size: 10.0,
            last: (bid + ask) / 2.0,
            last_size: 1.0,
            volume: 1200.0,
            option_price: (bid + ask) / 2.0,
            underlying_price: 102.0,
            underlying_dividends: 0.0,
            greeks: Greeks::default(),
            time: DateTime::<Utc>::MIN_UTC,
        }
    }

    pub(crate) fn put_quote(code: &str, strike: Decimal, bid: f64, ask: f64) -> OptionQuote {
        option_quote(code, strike, OptionRight::Put, bid, ask)
    }

    pub(crate) fn call_quote(code: &str, strike: Decimal, bid: f64, ask: f64) -> OptionQuote {
        option_quote(code, strike, OptionRight::Call, bid, ask)
    }

    #[test]
    fn test_short_put_vertical_figures() {
        let spread = ShortPutVerticalSpread::new(
            put_quote("SPY", dec!(95), 5.0, 6.0),
            put_quote("SPY", dec!(100), 6.0, 7.0),
            0.5,
        )
        .unwrap();

        assert_eq!(spread.entry_price(), -1.0);
        assert_eq!(spread.profit_price(), -0.5);
        assert_eq!(spread.breakeven_price(), 99.0);
        assert_eq!(spread.maximum_profit(), -100.0);
        assert_eq!(spread.maximum_loss(), 400.0);
        assert_eq!(spread.roi(), 0.25);
        assert_eq!(spread.probability_of_profit(), 80.0);
    }

    #[test]
    fn test_short_put_vertical_validation() {
        let wrong_right = ShortPutVerticalSpread::new(
            call_quote("SPY", dec!(95), 5.0, 6.0),
            put_quote("SPY", dec!(100), 6.0, 7.0),
            0.5,
        );
        assert_eq!(
            wrong_right.unwrap_err(),
            StrategyError::WrongRight(StrategyType::ShortPutVerticalSpread)
        );

        let inverted = ShortPutVerticalSpread::new(
            put_quote("SPY", dec!(100), 6.0, 7.0),
            put_quote("SPY", dec!(95), 5.0, 6.0),
            0.5,
        );
        assert_eq!(
            inverted.unwrap_err(),
            StrategyError::StrikeOrder(StrategyType::ShortPutVerticalSpread)
        );
    }

    #[test]
    fn test_short_put_vertical_into_strategy() {
        let strategy = ShortPutVerticalSpread::new(
            put_quote("SPY", dec!(95), 5.0, 6.0),
            put_quote("SPY", dec!(100), 6.0, 7.0),
            0.5,
        )
        .unwrap()
        .into_strategy(Currency::Usd, utc(2018, 9, 21, 10, 30, 5))
        .unwrap();

        assert_eq!(strategy.kind, StrategyType::ShortPutVerticalSpread);
        assert_eq!(strategy.legs.len(), 2);
        assert_eq!(strategy.legs[0].ownership, Ownership::Buyer);
        assert_eq!(strategy.legs[1].ownership, Ownership::Seller);
        assert_eq!(strategy.entry_price, Some(-1.0));
        assert_eq!(strategy.underlying_entry_price, Some(102.0));
        // Stored entry price agrees with the leg identity.
        assert_eq!(strategy.compute_entry_price(), -1.0);
        // Per-lot worst case equals the builder's maximum loss.
        assert_eq!(strategy.per_lot_max_loss().unwrap(), 400.0);
    }

    #[test]
    fn test_short_call_vertical_figures() {
        let spread = ShortCallVerticalSpread::new(
            call_quote("SPY", dec!(105), 5.0, 6.0),
            call_quote("SPY", dec!(100), 6.0, 7.0),
            0.5,
        )
        .unwrap();

        assert_eq!(spread.entry_price(), -1.0);
        assert_eq!(spread.breakeven_price(), 101.0);
        assert_eq!(spread.maximum_profit(), -100.0);
        assert_eq!(spread.maximum_loss(), 400.0);
        assert_eq!(spread.roi(), 0.25);
    }

    #[test]
    fn test_short_put_figures() {
        let short_put = ShortPut::new(put_quote("SPY", dec!(100), 6.0, 7.0), 0.5).unwrap();

        assert_eq!(short_put.entry_price(), -6.5);
        assert_eq!(short_put.breakeven_price(), 93.5);
        assert_eq!(short_put.maximum_profit(), -650.0);
        assert_eq!(short_put.maximum_loss(), 9350.0);

        let strategy = short_put
            .into_strategy(Currency::Usd, utc(2018, 9, 21, 10, 30, 5))
            .unwrap();
        assert_eq!(strategy.legs.len(), 1);
        assert_eq!(strategy.per_lot_max_loss().unwrap(), 9350.0);
    }
}
