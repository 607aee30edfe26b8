use crate::{
    FnvIndexMap,
    analytics::SeriesMatrix,
    strategy::{Strategy, StrategyId},
};
use condor_execution::account::Account;
use condor_instrument::{
    Currency,
    asset::{AssetCode, AssetDefinition, AssetId, ContractId},
    market_data::{Current, History},
    option::OptionQuote,
};
use smol_str::SmolStr;
use tracing::debug;

/// Per-asset entity state.
pub mod asset;

use asset::{AssetState, Forecast, Measures};

/// Process-wide authoritative state.
///
/// Mutated exclusively by the engine; algorithms and external readers see
/// it through shared references. Strategies are mirrored in the
/// [`StrategyRepo`](crate::repository::StrategyRepo) for crash recovery,
/// but the in-memory copy is authoritative for the running session.
#[derive(Debug, Default)]
pub struct DataStore {
    assets: FnvIndexMap<AssetCode, AssetState>,
    account: Account,
    strategies: FnvIndexMap<StrategyId, Strategy>,
}

impl DataStore {
    /// Initialise the store with one empty [`AssetState`] per watch-list
    /// entry.
    pub fn new(watch_list: &[AssetDefinition], currency: Currency) -> Self {
        let assets = watch_list
            .iter()
            .map(|definition| {
                (
                    definition.code.clone(),
                    AssetState::new(AssetId::new(
                        definition.code.clone(),
                        definition.kind,
                        currency,
                    )),
                )
            })
            .collect();

        Self {
            assets,
            account: Account::default(),
            strategies: FnvIndexMap::default(),
        }
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn set_account(&mut self, account: Account) {
        self.account = account;
    }

    pub fn asset(&self, code: &AssetCode) -> Option<&AssetState> {
        self.assets.get(code)
    }

    pub fn assets(&self) -> impl Iterator<Item = &AssetState> {
        self.assets.values()
    }

    pub fn asset_codes(&self) -> impl Iterator<Item = &AssetCode> {
        self.assets.keys()
    }

    /// Attach the broker contract handle resolved for an asset.
    pub(crate) fn set_asset_contract(&mut self, code: &AssetCode, contract: ContractId) {
        if let Some(asset) = self.assets.get_mut(code) {
            asset.id = asset.id.clone().with_contract(contract);
        }
    }

    /// Replace the latest quote snapshot of every asset present in `quotes`.
    pub(crate) fn update_assets(&mut self, quotes: FnvIndexMap<AssetCode, Current>) {
        for (code, current) in quotes {
            if let Some(asset) = self.assets.get_mut(&code) {
                asset.current = Some(current);
            }
        }
    }

    /// Replace an asset's price history whole.
    pub(crate) fn update_price_history(&mut self, code: &AssetCode, history: History) {
        if let Some(asset) = self.assets.get_mut(code) {
            asset.price_history = Some(history);
        }
    }

    /// Replace an asset's IV history whole.
    pub(crate) fn update_iv_history(&mut self, code: &AssetCode, history: History) {
        if let Some(asset) = self.assets.get_mut(code) {
            asset.iv_history = Some(history);
        }
    }

    /// Replace an asset's analytic snapshot and forecast.
    pub(crate) fn apply_measures(
        &mut self,
        code: &AssetCode,
        measures: Measures,
        forecast: Forecast,
    ) {
        if let Some(asset) = self.assets.get_mut(code) {
            asset.measures = Some(measures);
            asset.forecast = Some(forecast);
        }
    }

    /// Replace an asset's discovered option chain.
    pub(crate) fn set_option_chain(
        &mut self,
        code: &AssetCode,
        chain: FnvIndexMap<SmolStr, OptionQuote>,
    ) {
        if let Some(asset) = self.assets.get_mut(code) {
            asset.option_chain = Some(chain);
        }
    }

    /// Pivot the price histories into a close-price column matrix for the
    /// vector computations.
    pub fn close_matrix(&self) -> SeriesMatrix {
        self.assets
            .iter()
            .map(|(code, state)| (code.clone(), state.price_closes()))
            .collect()
    }

    pub fn strategy(&self, id: &StrategyId) -> Option<&Strategy> {
        self.strategies.get(id)
    }

    pub fn strategies(&self) -> impl Iterator<Item = &Strategy> {
        self.strategies.values()
    }

    pub fn strategy_ids(&self) -> Vec<StrategyId> {
        self.strategies.keys().cloned().collect()
    }

    pub(crate) fn strategy_mut(&mut self, id: &StrategyId) -> Option<&mut Strategy> {
        self.strategies.get_mut(id)
    }

    pub(crate) fn strategies_mut(&mut self) -> impl Iterator<Item = &mut Strategy> {
        self.strategies.values_mut()
    }

    pub fn add_strategy(&mut self, strategy: Strategy) {
        debug!(id = %strategy.id(), "DataStore adding strategy");
        self.strategies.insert(strategy.id(), strategy);
    }

    pub fn update_strategy(&mut self, strategy: Strategy) {
        self.strategies.insert(strategy.id(), strategy);
    }

    /// Drop a strategy from the in-memory set, eg/ once it has closed.
    pub fn delete_strategy(&mut self, id: &StrategyId) -> Option<Strategy> {
        debug!(%id, "DataStore deleting strategy");
        self.strategies.shift_remove(id)
    }

    /// Replace the strategy set, eg/ with the repository contents at init.
    pub fn load_strategies(&mut self, strategies: FnvIndexMap<StrategyId, Strategy>) {
        self.strategies = strategies;
    }

    /// Portfolio aggregates over the open strategies.
    ///
    /// Beta-weighted delta expresses every leg's delta in benchmark-move
    /// units: `(underlying / benchmark) * beta * delta * quantity * sign`.
    /// Absent until the benchmark has a resolvable price.
    pub fn portfolio(&self, benchmark: &AssetCode) -> Option<Portfolio> {
        let benchmark_price = self.asset(benchmark)?.market_price()?;

        let mut beta_weighted_delta = 0.0;
        for strategy in self.strategies() {
            let Some(asset) = self.asset(&strategy.code) else {
                continue;
            };
            let Some(underlying_price) = asset.market_price() else {
                continue;
            };
            let beta = asset
                .measures
                .as_ref()
                .map(|measures| measures.beta)
                .unwrap_or(f64::NAN);

            for leg in &strategy.legs {
                beta_weighted_delta += (underlying_price / benchmark_price)
                    * beta
                    * leg.option.greeks.delta
                    * (strategy.quantity * leg.ratio) as f64
                    * leg.ownership.factor();
            }
        }

        Some(Portfolio {
            beta_weighted_delta,
        })
    }
}

/// Aggregated view of the open strategies.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Portfolio {
    pub beta_weighted_delta: f64,
}
