use crate::{
    algo::TradeAlgo,
    analytics,
    config::Config,
    coordinator::OrderCoordinator,
    engine::{
        clock::EngineClock,
        reconcile::{ReconcileOutcome, reconcile_positions},
    },
    error::EngineError,
    repository::StrategyRepo,
    risk,
    state::{
        DataStore,
        asset::{Forecast, Measures},
    },
    strategy::{Strategy, StrategyId},
};
use condor_execution::{
    channel::UnboundedRx,
    error::BrokerError,
    port::{BrokerPort, ChainRequest},
    trade::TradeUpdate,
};
use condor_instrument::{
    asset::{AssetCode, ContractId},
    option::OptionContract,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tracing::{debug, error, info, warn};

/// Defines the [`EngineClock`] interface used to determine the current
/// engine time, with a deterministic test clock.
pub mod clock;

/// Position-vs-strategy reconciliation.
pub mod reconcile;

/// Engine lifecycle state.
#[derive(
    Debug, Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize,
)]
pub enum EngineStatus {
    #[default]
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl Display for EngineStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                EngineStatus::Stopped => "stopped",
                EngineStatus::Starting => "starting",
                EngineStatus::Running => "running",
                EngineStatus::Stopping => "stopping",
            }
        )
    }
}

/// Cooperative stop signal; checked by the loop before it sleeps.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Read-API selector for per-asset series.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SeriesKind {
    Time,
    Value,
    Iv,
    Rsi,
    FastSma,
    SlowSma,
    VerySlowSma,
    FastSmaSpeed,
    FastSmaSpeedDiff,
    Direction,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SeriesData {
    Dates(Vec<NaiveDate>),
    Values(Vec<f64>),
    Rolling(Vec<Option<f64>>),
    Directions(Vec<Option<analytics::Direction>>),
}

/// The trading engine.
///
/// Owns the single-threaded cooperative loop: refresh market data,
/// reconcile broker positions against in-flight strategies, recompute
/// analytics, run the registered algorithms, sleep. All state mutation
/// happens on this loop; broker callbacks arrive through a queue drained at
/// the top of each iteration.
pub struct Engine<Broker, Clock> {
    config: Config,
    clock: Clock,
    broker: Broker,
    repo: StrategyRepo,
    store: DataStore,
    coordinator: OrderCoordinator<Broker>,
    algorithms: Vec<Box<dyn TradeAlgo + Send>>,
    updates: Option<UnboundedRx<TradeUpdate>>,
    status: EngineStatus,
    stop: StopHandle,
}

impl<Broker, Clock> std::fmt::Debug for Engine<Broker, Clock> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("status", &self.status)
            .field("algorithms", &self.algorithms.len())
            .finish()
    }
}

impl<Broker, Clock> Engine<Broker, Clock>
where
    Broker: BrokerPort,
    Clock: EngineClock,
{
    pub fn new(config: Config, clock: Clock, broker: Broker) -> Result<Self, EngineError> {
        let repo = StrategyRepo::new(config.strategy_path())?;
        let store = DataStore::new(&config.watch_list, config.currency);
        let coordinator = OrderCoordinator::new(broker.clone(), config.execution_log_path());

        Ok(Self {
            config,
            clock,
            broker,
            repo,
            store,
            coordinator,
            algorithms: Vec::new(),
            updates: None,
            status: EngineStatus::Stopped,
            stop: StopHandle::default(),
        })
    }

    /// Register a trading algorithm; invocation order is registration order.
    pub fn register_algorithm(&mut self, algorithm: Box<dyn TradeAlgo + Send>) {
        self.algorithms.push(algorithm);
    }

    pub fn status(&self) -> EngineStatus {
        self.status
    }

    pub fn store(&self) -> &DataStore {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn coordinator(&self) -> &OrderCoordinator<Broker> {
        &self.coordinator
    }

    /// Handle for requesting a cooperative stop from outside the loop.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn stop(&mut self) {
        self.status = EngineStatus::Stopping;
    }

    /// Largest loss a single new trade may risk right now.
    pub fn maximum_risk_per_trade(&self) -> Option<f64> {
        risk::maximum_risk_per_trade(self.store.account(), &self.config)
    }

    /// Portfolio aggregates, beta-weighted against the market benchmark.
    pub fn portfolio(&self) -> Option<crate::state::Portfolio> {
        self.store.portfolio(&self.config.market_benchmark)
    }

    /// First allow-listed expiration between 30 and 60 days out.
    pub fn expiration_target(&self) -> Option<NaiveDate> {
        let today = self.clock.time().date_naive();
        self.config
            .expirations
            .iter()
            .copied()
            .find(|expiration| (30..=60).contains(&(*expiration - today).num_days()))
    }

    /// Per-asset series accessor for interactive inspection.
    pub fn series(&self, code: &AssetCode, kind: SeriesKind) -> Option<SeriesData> {
        let asset = self.store.asset(code)?;
        match kind {
            SeriesKind::Time => asset
                .price_history
                .as_ref()
                .map(|history| SeriesData::Dates(history.bars.iter().map(|bar| bar.time).collect())),
            SeriesKind::Value => asset
                .price_history
                .as_ref()
                .map(|history| SeriesData::Values(history.closes())),
            SeriesKind::Iv => asset
                .iv_history
                .as_ref()
                .map(|history| SeriesData::Values(history.closes())),
            SeriesKind::Rsi => asset
                .measures
                .as_ref()
                .map(|measures| SeriesData::Rolling(measures.rsi.clone())),
            SeriesKind::FastSma => asset
                .measures
                .as_ref()
                .map(|measures| SeriesData::Rolling(measures.fast_sma.clone())),
            SeriesKind::SlowSma => asset
                .measures
                .as_ref()
                .map(|measures| SeriesData::Rolling(measures.slow_sma.clone())),
            SeriesKind::VerySlowSma => asset
                .measures
                .as_ref()
                .map(|measures| SeriesData::Rolling(measures.very_slow_sma.clone())),
            SeriesKind::FastSmaSpeed => asset
                .measures
                .as_ref()
                .map(|measures| SeriesData::Rolling(measures.fast_sma_speed.clone())),
            SeriesKind::FastSmaSpeedDiff => asset
                .measures
                .as_ref()
                .map(|measures| SeriesData::Rolling(measures.fast_sma_speed_diff.clone())),
            SeriesKind::Direction => asset
                .forecast
                .as_ref()
                .map(|forecast| SeriesData::Directions(forecast.direction.clone())),
        }
    }

    /// Start sequence; each step fails fast if the prior one failed.
    pub async fn start(&mut self) -> Result<(), EngineError> {
        self.status = EngineStatus::Starting;
        info!("Engine starting");

        // 1. Durable strategies into the store.
        let strategies = self.repo.all_items()?;
        self.store.load_strategies(strategies);

        // 2. Connect, then block for the initial account push.
        self.broker.connect().await?;
        self.broker.sleep(Duration::from_secs(1)).await;

        // 3. Account snapshot.
        let account = self.broker.account_values().await?;
        self.store.set_account(account);

        // 4. Qualify the watch list.
        let contracts = self.broker.qualify_assets(&self.config.watch_list).await?;
        for (code, contract) in contracts {
            self.store.set_asset_contract(&code, contract);
        }

        // 5. Current quotes plus price/IV histories for every asset.
        self.refresh_quotes().await?;
        self.refresh_histories().await?;

        // 6. First analytic pass.
        self.recompute();

        // 7. A restart may find stale leg contract handles.
        self.requalify_strategy_legs().await?;

        // 8. Reconcile positions against the recovered strategies.
        self.reconcile().await?;

        self.updates = Some(self.broker.trade_updates().await?);
        self.status = EngineStatus::Running;
        info!("Engine started");
        Ok(())
    }

    /// Run the loop until stopped, then disconnect.
    pub async fn run(&mut self) {
        info!("Engine running");
        while self.status == EngineStatus::Running {
            self.run_once().await;
        }
        self.shutdown().await;
    }

    /// One loop iteration.
    pub async fn run_once(&mut self) {
        debug!("initiating loop iteration");

        // Drain broker callbacks queued since the last iteration.
        let drained = match &mut self.updates {
            Some(updates) => updates.drain(),
            None => Vec::new(),
        };
        let now = self.clock.time();
        for update in &drained {
            self.coordinator.on_trade_update(update, now);
        }

        if let Err(error) = self.refresh_quotes().await {
            self.handle_loop_error("refresh quotes", error);
        }
        if self.status == EngineStatus::Stopping {
            return;
        }
        if let Err(error) = self.refresh_histories().await {
            self.handle_loop_error("refresh histories", error);
        }
        if let Err(error) = self.refresh_strategy_quotes().await {
            self.handle_loop_error("refresh strategy quotes", error);
        }
        if self.status == EngineStatus::Stopping {
            return;
        }

        match self.reconcile().await {
            Ok(outcome) => log_reconcile_outcome(&outcome),
            Err(error) => self.handle_loop_error("reconcile positions", error),
        }

        self.recompute();
        self.run_algorithms().await;

        if self.stop.is_stopped() {
            self.status = EngineStatus::Stopping;
        }
        if self.status == EngineStatus::Running {
            self.clock.sleep(self.config.loop_interval()).await;
        }
    }

    pub async fn shutdown(&mut self) {
        info!("Engine shutting down");
        if let Err(error) = self.broker.disconnect().await {
            warn!(%error, "broker disconnect failed");
        }
        self.status = EngineStatus::Stopped;
    }

    /// Size, price, risk-check, persist and submit a new strategy.
    pub async fn new_strategy(&mut self, mut strategy: Strategy) -> Result<StrategyId, EngineError> {
        self.coordinator
            .size_and_price(&mut strategy, self.store.account(), &self.config)?;
        strategy.updated = self.clock.time();

        let id = strategy.id();
        if let Err(error) = self.repo.add(&strategy) {
            error!(%id, %error, "failed to persist new strategy");
        }
        self.store.add_strategy(strategy.clone());

        if let Err(error) = self.coordinator.place(&strategy, &self.config).await {
            self.store.delete_strategy(&id);
            if let Err(retire) = self.repo.delete(&id) {
                warn!(%id, %retire, "failed to retire unplaced strategy file");
            }
            return Err(error);
        }
        Ok(id)
    }

    /// Discover and store the option chain for one asset, around its
    /// current price and the target expiration.
    pub async fn update_option_chain(&mut self, code: &AssetCode) -> Result<(), EngineError> {
        let Some(asset) = self.store.asset(code) else {
            warn!(%code, "option chain requested for unknown asset");
            return Ok(());
        };
        let Some(contract) = asset.id.contract.clone() else {
            warn!(%code, "option chain requested before qualification");
            return Ok(());
        };
        let Some(price) = asset.market_price() else {
            warn!(%code, "option chain requested without a current quote");
            return Ok(());
        };
        let Some(expiration) = self.expiration_target() else {
            warn!("no allow-listed expiration inside the target window");
            return Ok(());
        };
        let dte = (expiration - self.clock.time().date_naive()).num_days();
        if !(self.config.dte_min..=self.config.dte_max).contains(&dte) {
            warn!(%code, dte, "target expiration outside the DTE window");
            return Ok(());
        }

        let chain = self
            .broker
            .option_chain(ChainRequest {
                underlying: code.clone(),
                contract,
                expiration,
                underlying_price: price,
                band_width: price * self.config.chain_width_factor,
            })
            .await?;

        self.store.set_option_chain(code, chain);
        Ok(())
    }

    async fn refresh_quotes(&mut self) -> Result<(), EngineError> {
        let contracts: Vec<ContractId> = self
            .store
            .assets()
            .filter_map(|asset| asset.id.contract.clone())
            .collect();

        let quotes = self.broker.snapshot_quotes(&contracts).await?;
        self.store.update_assets(quotes);
        Ok(())
    }

    /// Replace any price/IV history older than a calendar day.
    async fn refresh_histories(&mut self) -> Result<(), EngineError> {
        let now = self.clock.time();
        let years = self.config.historical_years;
        let codes: Vec<AssetCode> = self.store.asset_codes().cloned().collect();

        for code in codes {
            let Some(contract) = self
                .store
                .asset(&code)
                .and_then(|asset| asset.id.contract.clone())
            else {
                warn!(%code, "asset has no qualified contract");
                continue;
            };

            let price_stale = self
                .store
                .asset(&code)
                .is_some_and(|asset| {
                    asset
                        .price_history
                        .as_ref()
                        .is_none_or(|history| history.is_stale(now))
                });
            if price_stale {
                let history = self.broker.price_history(&contract, years).await?;
                self.store.update_price_history(&code, history);
            }

            let iv_stale = self.store.asset(&code).is_some_and(|asset| {
                asset
                    .iv_history
                    .as_ref()
                    .is_none_or(|history| history.is_stale(now))
            });
            if iv_stale {
                let history = self.broker.iv_history(&contract, years).await?;
                self.store.update_iv_history(&code, history);
            }
        }
        Ok(())
    }

    /// Refresh the option quotes behind every strategy leg.
    ///
    /// A strategy with a stale contract is logged and skipped for this
    /// iteration; the loop continues.
    async fn refresh_strategy_quotes(&mut self) -> Result<(), EngineError> {
        for id in self.store.strategy_ids() {
            let Some(contracts) = self.store.strategy(&id).map(|strategy| {
                strategy
                    .legs
                    .iter()
                    .map(|leg| leg.option.contract.clone())
                    .collect::<Vec<OptionContract>>()
            }) else {
                continue;
            };

            match self.broker.option_quotes(&contracts).await {
                Ok(quotes) => {
                    if let Some(strategy) = self.store.strategy_mut(&id) {
                        for leg in &mut strategy.legs {
                            let contract = &leg.option.contract;
                            if let Some(quote) = quotes.iter().find(|quote| {
                                quote.contract.underlying == contract.underlying
                                    && quote.contract.expiration == contract.expiration
                                    && quote.contract.strike == contract.strike
                                    && quote.contract.right == contract.right
                            }) {
                                leg.option = quote.clone();
                            }
                        }
                    }
                }
                Err(BrokerError::StaleContract(reason)) => {
                    warn!(%id, reason, "skipping strategy with stale contract");
                }
                Err(error) => return Err(error.into()),
            }
        }
        Ok(())
    }

    /// Re-qualify leg contracts for every recovered strategy.
    async fn requalify_strategy_legs(&mut self) -> Result<(), EngineError> {
        for id in self.store.strategy_ids() {
            let Some(contracts) = self.store.strategy(&id).map(|strategy| {
                strategy
                    .legs
                    .iter()
                    .map(|leg| leg.option.contract.clone())
                    .collect::<Vec<OptionContract>>()
            }) else {
                continue;
            };

            match self.broker.qualify_options(&contracts).await {
                Ok(qualified) => {
                    if let Some(strategy) = self.store.strategy_mut(&id) {
                        for (leg, contract) in strategy.legs.iter_mut().zip(qualified) {
                            leg.option.contract = contract;
                        }
                    }
                }
                Err(BrokerError::StaleContract(reason)) => {
                    warn!(%id, reason, "skipping strategy with stale contract");
                }
                Err(error) => return Err(error.into()),
            }
        }
        Ok(())
    }

    async fn reconcile(&mut self) -> Result<ReconcileOutcome, EngineError> {
        let positions = self.broker.positions().await?;
        let now = self.clock.time();
        Ok(reconcile_positions(
            &mut self.store,
            &self.repo,
            positions,
            now,
        ))
    }

    /// Recompute every asset's measures and forecast from its histories.
    ///
    /// Restartable: called on every loop iteration with no hidden state.
    fn recompute(&mut self) {
        let matrix = self.store.close_matrix();
        let benchmark = &self.config.market_benchmark;
        let betas = analytics::beta(&matrix, benchmark, self.config.beta_window);
        let correlations = analytics::correlation(&matrix, benchmark, self.config.correlation_window);
        let stdevs = analytics::stdev(&matrix, self.config.stdev_window);
        let historical_days = self.config.historical_days();

        let config = &self.config;
        let mut computed = Vec::new();
        for asset in self.store.assets() {
            let closes = asset.price_closes();
            if closes.is_empty() {
                continue;
            }
            let iv_closes = asset.iv_closes();
            let iv = iv_closes.last().copied().unwrap_or(f64::NAN);

            let (iv_rank, iv_percentile) = match asset.iv_history.as_ref() {
                Some(history) => (
                    analytics::iv_rank(history, iv),
                    analytics::iv_percentile(history, iv, historical_days),
                ),
                None => (f64::NAN, f64::NAN),
            };

            let price = asset
                .market_price()
                .unwrap_or_else(|| closes.last().copied().unwrap_or(f64::NAN));
            let price_percentile = asset
                .price_history
                .as_ref()
                .map(|history| analytics::price_percentile(history, price, historical_days))
                .unwrap_or(f64::NAN);

            let iv_pct = analytics::pct_change(&iv_closes, config.iv_window)
                .last()
                .copied()
                .flatten()
                .unwrap_or(f64::NAN);
            let price_pct = analytics::pct_change(&closes, config.price_window)
                .last()
                .copied()
                .flatten()
                .unwrap_or(f64::NAN);

            let rsi = analytics::rsi(&closes, config.rsi_window);
            let fast_sma = analytics::sma(&closes, config.fast_sma_window);
            let slow_sma = analytics::sma(&closes, config.slow_sma_window);
            let very_slow_sma = analytics::sma(&closes, config.very_slow_sma_window);
            let fast_sma_speed = analytics::series_speed(&fast_sma);
            let fast_sma_speed_diff = analytics::series_diff(&fast_sma_speed);
            let direction = analytics::directional_forecast(&fast_sma, &slow_sma);

            let code = &asset.id.code;
            let measures = Measures {
                iv,
                iv_rank,
                iv_percentile,
                iv_pct,
                price_percentile,
                price_pct,
                stdev: stdevs.get(code).copied().unwrap_or(f64::NAN),
                beta: betas.get(code).copied().unwrap_or(f64::NAN),
                correlation: correlations.get(code).copied().unwrap_or(f64::NAN),
                rsi,
                fast_sma,
                slow_sma,
                very_slow_sma,
                fast_sma_speed,
                fast_sma_speed_diff,
            };
            computed.push((code.clone(), measures, Forecast { direction }));
        }

        for (code, measures, forecast) in computed {
            self.store.apply_measures(&code, measures, forecast);
        }
    }

    /// Invoke every registered algorithm and submit the strategies they
    /// propose. Algorithm failures never abort the loop.
    async fn run_algorithms(&mut self) {
        let mut chain_requests = Vec::new();
        for algorithm in &mut self.algorithms {
            chain_requests.extend(algorithm.chain_requests(&self.store));
        }
        for code in chain_requests {
            if let Err(error) = self.update_option_chain(&code).await {
                self.handle_loop_error("update option chain", error);
                if self.status == EngineStatus::Stopping {
                    return;
                }
            }
        }

        let mut proposals = Vec::new();
        for algorithm in &mut self.algorithms {
            match algorithm.evaluate(&self.store) {
                Ok(strategies) => proposals.extend(strategies),
                Err(error) => error!(%error, "algorithm failed"),
            }
        }

        for strategy in proposals {
            let code = strategy.code.clone();
            match self.new_strategy(strategy).await {
                Ok(id) => info!(%id, "new strategy submitted"),
                Err(error) if error.is_fatal() => {
                    error!(%code, %error, "fatal error submitting strategy");
                    self.status = EngineStatus::Stopping;
                    return;
                }
                Err(error) => warn!(%code, %error, "strategy not submitted"),
            }
        }
    }

    fn handle_loop_error(&mut self, context: &str, error: EngineError) {
        if error.is_fatal() {
            error!(context, %error, "fatal broker error");
            self.status = EngineStatus::Stopping;
        } else {
            warn!(context, %error, "transient error, retried next iteration");
        }
    }
}

fn log_reconcile_outcome(outcome: &ReconcileOutcome) {
    for id in &outcome.opened {
        info!(%id, "strategy opened");
    }
    for id in &outcome.closed {
        info!(%id, "strategy closed");
    }
}
