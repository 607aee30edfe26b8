use crate::{FnvIndexMap, analytics::Direction};
use condor_instrument::{
    asset::AssetId,
    market_data::{Current, History},
    option::OptionQuote,
};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Immutable analytic snapshot for one asset.
///
/// Rolling-window fields are aligned element-wise with the asset's price
/// history; leading elements are undefined until their windows fill.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Measures {
    pub iv: f64,
    pub iv_rank: f64,
    pub iv_percentile: f64,
    pub iv_pct: f64,
    pub price_percentile: f64,
    pub price_pct: f64,
    pub stdev: f64,
    pub beta: f64,
    pub correlation: f64,
    pub rsi: Vec<Option<f64>>,
    pub fast_sma: Vec<Option<f64>>,
    pub slow_sma: Vec<Option<f64>>,
    pub very_slow_sma: Vec<Option<f64>>,
    pub fast_sma_speed: Vec<Option<f64>>,
    pub fast_sma_speed_diff: Vec<Option<f64>>,
}

/// Directional assumption sequence aligned with the price history.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Forecast {
    pub direction: Vec<Option<Direction>>,
}

/// A watch-list asset and everything the engine knows about it.
///
/// Created once at engine start; every snapshot field is replaced whole by
/// the refresh phase, never mutated in place.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AssetState {
    pub id: AssetId,
    pub current: Option<Current>,
    pub price_history: Option<History>,
    pub iv_history: Option<History>,
    pub measures: Option<Measures>,
    pub forecast: Option<Forecast>,
    /// Latest discovered option chain, keyed by `{strike}{right}`.
    pub option_chain: Option<FnvIndexMap<SmolStr, OptionQuote>>,
}

impl AssetState {
    pub fn new(id: AssetId) -> Self {
        Self {
            id,
            current: None,
            price_history: None,
            iv_history: None,
            measures: None,
            forecast: None,
            option_chain: None,
        }
    }

    /// Resolved market price of the latest quote, when one exists.
    pub fn market_price(&self) -> Option<f64> {
        self.current.as_ref().map(Current::market_price)
    }

    /// Close column of the price history.
    pub fn price_closes(&self) -> Vec<f64> {
        self.price_history
            .as_ref()
            .map(History::closes)
            .unwrap_or_default()
    }

    /// Close column of the IV history.
    pub fn iv_closes(&self) -> Vec<f64> {
        self.iv_history
            .as_ref()
            .map(History::closes)
            .unwrap_or_default()
    }
}
