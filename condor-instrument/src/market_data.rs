use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Latest quoted snapshot for an underlying.
///
/// Brokers report absent quote fields as NaN or `-1`; the
/// [`market_price`](Current::market_price) resolution rules absorb both.
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd, Deserialize, Serialize)]
pub struct Current {
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
    pub time: DateTime<Utc>,
}

impl Current {
    pub fn midpoint(&self) -> f64 {
        (self.bid + self.ask) / 2.0
    }

    /// Best available price estimate.
    ///
    /// `last` when it sits inside the bid/ask band (or no band exists),
    /// otherwise the midpoint; when the result is still absent or the
    /// broker's `-1` sentinel, the previous close.
    pub fn market_price(&self) -> f64 {
        let mut price = if self.midpoint().is_nan() || (self.bid <= self.last && self.last <= self.ask)
        {
            self.last
        } else {
            f64::NAN
        };

        if price.is_nan() {
            price = self.midpoint();
        }
        if price.is_nan() || price == -1.0 {
            price = self.close;
        }
        price
    }
}

/// One OHLC observation.
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd, Deserialize, Serialize)]
pub struct Bar {
    #[serde(with = "crate::serde_util::nan")]
    pub count: f64,
    #[serde(with = "crate::serde_util::nan")]
    pub open: f64,
    #[serde(with = "crate::serde_util::nan")]
    pub high: f64,
    #[serde(with = "crate::serde_util::nan")]
    pub low: f64,
    #[serde(with = "crate::serde_util::nan")]
    pub close: f64,
    #[serde(with = "crate::serde_util::nan")]
    pub average: f64,
    #[serde(with = "crate::serde_util::nan")]
    pub volume: f64,
    pub time: NaiveDate,
}

/// Ordered daily bars with a creation timestamp.
///
/// A refresh replaces the whole `History` atomically; partial histories are
/// never observable.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct History {
    pub bars: Vec<Bar>,
    pub created: DateTime<Utc>,
}

impl History {
    pub fn new(bars: Vec<Bar>, created: DateTime<Utc>) -> Self {
        Self { bars, created }
    }

    /// A history is stale once its creation day differs from `now` by at
    /// least one calendar day.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        (now.date_naive() - self.created.date_naive()).num_days() >= 1
    }

    /// Close column of the bars.
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|bar| bar.close).collect()
    }

    /// Low column of the bars.
    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|bar| bar.low).collect()
    }

    /// High column of the bars.
    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|bar| bar.high).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn current(bid: f64, ask: f64, last: f64, close: f64) -> Current {
        Current {
            high: 100.0,
            low: 50.0,
            close,
            bid,
            bid_size: 10.0,
            ask,
            ask_size: 20.0,
            last,
            last_size: 5.0,
            volume: 1000.0,
            time: DateTime::<Utc>::MIN_UTC,
        }
    }

    #[test]
    fn test_market_price_resolution() {
        struct TestCase {
            name: &'static str,
            input: Current,
            expected: f64,
        }

        let cases = vec![
            TestCase {
                name: "last inside bid/ask band",
                input: current(2.0, 3.0, 2.75, 75.0),
                expected: 2.75,
            },
            TestCase {
                name: "last outside band falls back to midpoint",
                input: current(2.0, 3.0, 4.0, 75.0),
                expected: 2.5,
            },
            TestCase {
                name: "sentinel quotes and absent last fall back to close",
                input: current(-1.0, -1.0, f64::NAN, 75.0),
                expected: 75.0,
            },
            TestCase {
                name: "absent band uses last",
                input: current(f64::NAN, f64::NAN, 2.5, 75.0),
                expected: 2.5,
            },
        ];

        for (index, test) in cases.iter().enumerate() {
            assert_eq!(
                test.input.market_price(),
                test.expected,
                "TC{} ({}) failed",
                index,
                test.name
            );
        }
    }

    #[test]
    fn test_history_staleness() {
        let created = Utc.with_ymd_and_hms(2018, 9, 3, 22, 0, 0).unwrap();
        let history = History::new(Vec::new(), created);

        assert!(!history.is_stale(Utc.with_ymd_and_hms(2018, 9, 3, 23, 59, 0).unwrap()));
        // Two hours later but the next calendar day.
        assert!(history.is_stale(Utc.with_ymd_and_hms(2018, 9, 4, 0, 1, 0).unwrap()));
    }
}
