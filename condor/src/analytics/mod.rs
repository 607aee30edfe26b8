use crate::FnvIndexMap;
use condor_instrument::{asset::AssetCode, market_data::History};
use itertools::izip;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Column-oriented numeric series: asset code to ordered values.
pub type SeriesMatrix = FnvIndexMap<AssetCode, Vec<f64>>;

/// Directional assumption for an asset.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub enum Direction {
    Bullish,
    Neutral,
    Bearish,
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Direction::Bullish => "Bullish",
                Direction::Neutral => "Neutral",
                Direction::Bearish => "Bearish",
            }
        )
    }
}

/// Daily percentage returns; the first (empty) row is dropped.
pub fn returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .map(|pair| pair[1] / pair[0] - 1.0)
        .collect()
}

fn tail(values: &[f64], n: usize) -> &[f64] {
    &values[values.len().saturating_sub(n)..]
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population covariance of two equal-length slices.
fn covariance(xs: &[f64], ys: &[f64]) -> f64 {
    if xs.is_empty() || xs.len() != ys.len() {
        return f64::NAN;
    }
    let mean_x = mean(xs);
    let mean_y = mean(ys);
    xs.iter()
        .zip(ys)
        .map(|(x, y)| (x - mean_x) * (y - mean_y))
        .sum::<f64>()
        / xs.len() as f64
}

/// Align the tails of two return columns to their common length.
fn aligned_tails<'a>(market: &'a [f64], column: &'a [f64], window: usize) -> (&'a [f64], &'a [f64]) {
    let market = tail(market, window);
    let column = tail(column, window);
    let n = market.len().min(column.len());
    (tail(market, n), tail(column, n))
}

/// Beta of every column against the market column, over the most recent
/// `window` daily returns.
pub fn beta(series: &SeriesMatrix, benchmark: &AssetCode, window: usize) -> FnvIndexMap<AssetCode, f64> {
    let Some(market) = series.get(benchmark) else {
        return FnvIndexMap::default();
    };
    let market_returns = returns(market);

    series
        .iter()
        .map(|(code, column)| {
            let column_returns = returns(column);
            let (m, x) = aligned_tails(&market_returns, &column_returns, window);
            (code.clone(), covariance(m, x) / covariance(m, m))
        })
        .collect()
}

/// Pearson correlation of every column with the market column, over the
/// most recent `window` daily returns.
pub fn correlation(
    series: &SeriesMatrix,
    benchmark: &AssetCode,
    window: usize,
) -> FnvIndexMap<AssetCode, f64> {
    let Some(market) = series.get(benchmark) else {
        return FnvIndexMap::default();
    };
    let market_returns = returns(market);

    series
        .iter()
        .map(|(code, column)| {
            let column_returns = returns(column);
            let (m, x) = aligned_tails(&market_returns, &column_returns, window);
            let denominator = (covariance(m, m) * covariance(x, x)).sqrt();
            (code.clone(), covariance(m, x) / denominator)
        })
        .collect()
}

/// Population standard deviation of daily returns, over the most recent
/// `window` rows of every column.
pub fn stdev(series: &SeriesMatrix, window: usize) -> FnvIndexMap<AssetCode, f64> {
    series
        .iter()
        .map(|(code, column)| {
            let column_returns = returns(column);
            let windowed = tail(&column_returns, window);
            (code.clone(), covariance(windowed, windowed).sqrt())
        })
        .collect()
}

/// Rolling arithmetic mean; the leading `window - 1` elements are undefined.
pub fn sma(values: &[f64], window: usize) -> Vec<Option<f64>> {
    values
        .iter()
        .enumerate()
        .map(|(index, _)| {
            (window > 0 && index + 1 >= window)
                .then(|| mean(&values[index + 1 - window..=index]))
        })
        .collect()
}

/// `x[t] / x[t - window] - 1`; the leading `window` elements are undefined.
pub fn pct_change(values: &[f64], window: usize) -> Vec<Option<f64>> {
    values
        .iter()
        .enumerate()
        .map(|(index, value)| {
            (window > 0 && index >= window).then(|| value / values[index - window] - 1.0)
        })
        .collect()
}

/// Wilder-style RSI using separate up/down rolling means.
///
/// The first element has no return and the rolling means need `window`
/// returns, so the leading `window` elements are undefined.
pub fn rsi(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut ups = vec![0.0; values.len()];
    let mut downs = vec![0.0; values.len()];
    for index in 1..values.len() {
        let change = values[index] - values[index - 1];
        ups[index] = change.max(0.0);
        downs[index] = (-change).max(0.0);
    }

    values
        .iter()
        .enumerate()
        .map(|(index, _)| {
            if window == 0 || index < window {
                return None;
            }
            let up_mean = mean(&ups[index + 1 - window..=index]);
            let down_mean = mean(&downs[index + 1 - window..=index]);
            if down_mean == 0.0 {
                Some(100.0)
            } else {
                Some(100.0 - 100.0 / (1.0 + up_mean / down_mean))
            }
        })
        .collect()
}

/// Single-step percentage change of a rolling series.
pub fn series_speed(values: &[Option<f64>]) -> Vec<Option<f64>> {
    values
        .iter()
        .enumerate()
        .map(|(index, value)| match (index.checked_sub(1).and_then(|i| values[i]), value) {
            (Some(previous), Some(current)) => Some(current / previous - 1.0),
            _ => None,
        })
        .collect()
}

/// First difference of a rolling series.
pub fn series_diff(values: &[Option<f64>]) -> Vec<Option<f64>> {
    values
        .iter()
        .enumerate()
        .map(|(index, value)| match (index.checked_sub(1).and_then(|i| values[i]), value) {
            (Some(previous), Some(current)) => Some(current - previous),
            _ => None,
        })
        .collect()
}

/// Position of `iv` within the historical low/high IV range.
pub fn iv_rank(iv_history: &History, iv: f64) -> f64 {
    let min_low = iv_history.lows().into_iter().fold(f64::INFINITY, f64::min);
    let max_high = iv_history
        .highs()
        .into_iter()
        .fold(f64::NEG_INFINITY, f64::max);
    (iv - min_low) / (max_high - min_low)
}

/// Share of history days whose low IV sat below `iv`.
///
/// The denominator is the nominal history depth, not the observed bar
/// count.
pub fn iv_percentile(iv_history: &History, iv: f64, historical_days: usize) -> f64 {
    let below = iv_history.lows().into_iter().filter(|low| *low < iv).count();
    below as f64 / historical_days as f64
}

/// Share of history days whose low price sat below `price`.
pub fn price_percentile(price_history: &History, price: f64, historical_days: usize) -> f64 {
    let below = price_history
        .lows()
        .into_iter()
        .filter(|low| *low < price)
        .count();
    below as f64 / historical_days as f64
}

/// Element-wise SMA-crossover directional assumption.
///
/// Undefined wherever either input window is not yet filled; Bullish when
/// the fast average sits on or above the slow one, Bearish otherwise.
pub fn directional_forecast(
    fast_sma: &[Option<f64>],
    slow_sma: &[Option<f64>],
) -> Vec<Option<Direction>> {
    izip!(fast_sma, slow_sma)
        .map(|(fast, slow)| match (fast, slow) {
            (Some(fast), Some(slow)) => Some(if fast >= slow {
                Direction::Bullish
            } else {
                Direction::Bearish
            }),
            _ => None,
        })
        .collect()
}
