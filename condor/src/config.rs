use condor_instrument::{
    Currency,
    asset::{AssetCode, AssetDefinition, AssetKind},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Engine configuration.
///
/// Defaults reproduce the production watch list and window lengths; tests
/// shrink the windows to keep fixtures small.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Account/value currency filter.
    pub currency: Currency,
    /// Depth of price/IV history, in years (~252 trading days each).
    pub historical_years: u32,
    /// Column used as "market" in beta/correlation.
    pub market_benchmark: AssetCode,

    pub stdev_window: usize,
    pub beta_window: usize,
    pub correlation_window: usize,
    pub price_window: usize,
    pub iv_window: usize,
    pub rsi_window: usize,
    pub fast_sma_window: usize,
    pub slow_sma_window: usize,
    pub very_slow_sma_window: usize,

    pub dte_min: i64,
    pub dte_max: i64,
    /// Explicit expiration allow-list for chain discovery.
    pub expirations: Vec<NaiveDate>,
    /// Strike band around the underlying price, as a fraction of it.
    pub chain_width_factor: f64,

    pub preserved_cash_factor: f64,
    pub maximum_risk_factor: f64,
    /// Stop-loss children are priced at `entry_price * stop_loss_factor`.
    pub stop_loss_factor: f64,

    /// Seconds slept at the end of each loop iteration.
    pub sleep_loop_secs: u64,

    pub data_dir: PathBuf,
    pub strategy_dir: PathBuf,

    pub watch_list: Vec<AssetDefinition>,
}

impl Config {
    /// Approximate number of daily bars in the configured history depth.
    pub fn historical_days(&self) -> usize {
        self.historical_years as usize * 252
    }

    pub fn loop_interval(&self) -> Duration {
        Duration::from_secs(self.sleep_loop_secs)
    }

    pub fn strategy_path(&self) -> PathBuf {
        self.data_dir.join(&self.strategy_dir)
    }

    pub fn execution_log_path(&self) -> PathBuf {
        self.data_dir.join("execution.log")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            currency: Currency::Usd,
            historical_years: 1,
            market_benchmark: AssetCode::from("SPY"),
            stdev_window: 22,
            beta_window: 252,
            correlation_window: 252,
            price_window: 22,
            iv_window: 22,
            rsi_window: 14,
            fast_sma_window: 20,
            slow_sma_window: 50,
            very_slow_sma_window: 200,
            dte_min: 0,
            dte_max: 50,
            expirations: Vec::new(),
            chain_width_factor: 0.1,
            preserved_cash_factor: 0.4,
            maximum_risk_factor: 0.05,
            stop_loss_factor: 2.5,
            sleep_loop_secs: 20,
            data_dir: PathBuf::from("data"),
            strategy_dir: PathBuf::from("strategy"),
            watch_list: default_watch_list(),
        }
    }
}

/// Liquid ETF universe traded by default.
pub fn default_watch_list() -> Vec<AssetDefinition> {
    [
        "DIA", "EEM", "EFA", "EWZ", "FXI", "GDX", "GDXJ", "GLD", "IWM", "KRE", "OIH", "SLV",
        "SPY", "TLT", "XBI", "XLB", "XLE", "XLF", "XLI", "XLK", "XLP", "XLU", "XME", "XOP", "XRT",
    ]
    .into_iter()
    .map(|code| AssetDefinition::new(code, AssetKind::Stock))
    .collect()
}
