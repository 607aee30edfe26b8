use condor::{
    algo::{AlgoError, TradeAlgo},
    config::Config,
    engine::{Engine, EngineStatus, SeriesData, SeriesKind, clock::StepClock},
    state::DataStore,
    strategy::{Strategy, spread::ShortPutVerticalSpread},
};
use condor_execution::{
    account::Account,
    error::BrokerError,
    mock::MockBroker,
    order::{OrderRef, OrderRole, OrderStatus},
    position::Position,
    trade::TradeUpdate,
};
use condor_instrument::{
    Currency, Ownership,
    asset::{AssetCode, AssetDefinition, AssetKind, ContractId},
    market_data::{Bar, Current, History},
    option::{Greeks, OptionContract, OptionQuote, OptionRight},
};
use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicUsize, Ordering};

static SCRATCH: AtomicUsize = AtomicUsize::new(0);

fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2018, 9, 3, 10, 0, 0).unwrap()
}

fn test_config() -> Config {
    let suffix = SCRATCH.fetch_add(1, Ordering::Relaxed);
    Config {
        watch_list: vec![
            AssetDefinition::new("SPY", AssetKind::Stock),
            AssetDefinition::new("EEM", AssetKind::Stock),
        ],
        expirations: vec![NaiveDate::from_ymd_opt(2018, 10, 19).unwrap()],
        stdev_window: 5,
        beta_window: 5,
        correlation_window: 5,
        price_window: 3,
        iv_window: 3,
        rsi_window: 3,
        fast_sma_window: 2,
        slow_sma_window: 3,
        very_slow_sma_window: 5,
        data_dir: std::env::temp_dir().join(format!(
            "condor-engine-{}-{}",
            std::process::id(),
            suffix
        )),
        ..Config::default()
    }
}

fn current(last: f64) -> Current {
    Current {
        high: last + 1.0,
        low: last - 1.0,
        close: last - 0.5,
        bid: last - 0.1,
        bid_size: 10.0,
        ask: last + 0.1,
        ask_size: 10.0,
        last,
        last_size: 5.0,
        volume: 10_000.0,
        time: start_time(),
    }
}

fn history(closes: &[f64], created: DateTime<Utc>) -> History {
    let bars = closes
        .iter()
        .enumerate()
        .map(|(index, close)| Bar {
            count: 100.0,
            open: close - 0.5,
            high: close + 1.0,
            low: close - 1.0,
            close: *close,
            average: *close,
            volume: 5_000.0,
            time: NaiveDate::from_ymd_opt(2018, 8, 1).unwrap() + Days::new(index as u64),
        })
        .collect();
    History::new(bars, created)
}

fn put_quote(code: &str, strike: Decimal, bid: f64, ask: f64, contract: &str) -> OptionQuote {
    OptionQuote {
        contract: OptionContract::new(
            AssetCode::from(code),
            NaiveDate::from_ymd_opt(2018, 10, 19).unwrap(),
            strike,
            OptionRight::Put,
            100,
        )
        .with_contract(ContractId::from(contract)),
        high: f64::NAN,
        low: f64::NAN,
        close: f64::NAN,
        bid,
        bid_size: 10.0,
        ask,
        ask_size: 10.0,
        last: (bid + ask) / 2.0,
        last_size: 1.0,
        volume: 1_500.0,
        option_price: (bid + ask) / 2.0,
        underlying_price: 280.0,
        underlying_dividends: 0.0,
        greeks: Greeks::default(),
        time: start_time(),
    }
}

fn scripted_broker() -> MockBroker {
    let broker = MockBroker::new();
    broker.set_account(Account {
        net_liquidation: Some(100_000.0),
        cash: Some(100_000.0),
        funds: Some(90_000.0),
        ..Account::default()
    });
    broker.set_quote(AssetCode::from("SPY"), current(280.0));
    broker.set_quote(AssetCode::from("EEM"), current(42.0));

    let spy_closes: Vec<f64> = (0..10).map(|i| 270.0 + i as f64).collect();
    let eem_closes: Vec<f64> = (0..10).map(|i| 44.0 - 0.2 * i as f64).collect();
    broker.set_price_history(ContractId::from("SPY"), history(&spy_closes, start_time()));
    broker.set_price_history(ContractId::from("EEM"), history(&eem_closes, start_time()));

    let iv_closes: Vec<f64> = (0..10).map(|i| 0.15 + 0.01 * i as f64).collect();
    broker.set_iv_history(ContractId::from("SPY"), history(&iv_closes, start_time()));
    broker.set_iv_history(ContractId::from("EEM"), history(&iv_closes, start_time()));

    broker
}

fn spread_strategy(created: DateTime<Utc>) -> Strategy {
    ShortPutVerticalSpread::new(
        put_quote("SPY", dec!(270), 5.0, 6.0, "1001"),
        put_quote("SPY", dec!(275), 6.0, 7.0, "1002"),
        0.5,
    )
    .unwrap()
    .into_strategy(Currency::Usd, created)
    .unwrap()
}

fn position(code: &str, ownership: Ownership, strike: Decimal, quantity: u32) -> Position {
    Position {
        code: AssetCode::from(code),
        kind: AssetKind::Option,
        ownership,
        expiration: NaiveDate::from_ymd_opt(2018, 10, 19),
        strike: Some(strike),
        right: Some(OptionRight::Put),
        quantity,
        average_cost: 100.0,
    }
}

/// One-shot algorithm proposing a short put vertical spread.
struct SpreadOnce {
    created: DateTime<Utc>,
    emitted: bool,
}

impl TradeAlgo for SpreadOnce {
    fn name(&self) -> &str {
        "spread-once"
    }

    fn evaluate(&mut self, store: &DataStore) -> Result<Vec<Strategy>, AlgoError> {
        if self.emitted || store.asset(&AssetCode::from("SPY")).is_none() {
            return Ok(Vec::new());
        }
        self.emitted = true;
        Ok(vec![spread_strategy(self.created)])
    }
}

/// Algorithm that only watches the benchmark's option chain.
struct ChainWatcher;

impl TradeAlgo for ChainWatcher {
    fn name(&self) -> &str {
        "chain-watcher"
    }

    fn chain_requests(&mut self, _store: &DataStore) -> Vec<AssetCode> {
        vec![AssetCode::from("SPY")]
    }

    fn evaluate(&mut self, _store: &DataStore) -> Result<Vec<Strategy>, AlgoError> {
        Ok(Vec::new())
    }
}

/// Algorithm that always fails; the loop must survive it.
struct Faulty;

impl TradeAlgo for Faulty {
    fn name(&self) -> &str {
        "faulty"
    }

    fn evaluate(&mut self, _store: &DataStore) -> Result<Vec<Strategy>, AlgoError> {
        Err(AlgoError::new("faulty", "boom"))
    }
}

#[tokio::test]
async fn test_start_populates_state() {
    let broker = scripted_broker();
    let clock = StepClock::new(start_time());
    let mut engine = Engine::new(test_config(), clock, broker.clone()).unwrap();

    engine.start().await.unwrap();
    assert_eq!(engine.status(), EngineStatus::Running);
    assert!(broker.is_connected());

    let store = engine.store();
    assert_eq!(store.account().net_liquidation, Some(100_000.0));

    let spy = store.asset(&AssetCode::from("SPY")).unwrap();
    assert!(spy.id.contract.is_some());
    assert!(spy.current.is_some());
    assert_eq!(spy.market_price(), Some(280.0));
    assert_eq!(spy.price_history.as_ref().unwrap().bars.len(), 10);

    let measures = spy.measures.as_ref().unwrap();
    // The benchmark's beta and correlation with itself.
    assert!((measures.beta - 1.0).abs() < 1e-9);
    assert!((measures.correlation - 1.0).abs() < 1e-9);
    assert!(measures.iv > 0.0);

    // Rolling series align with the price history.
    let forecast = spy.forecast.as_ref().unwrap();
    assert_eq!(forecast.direction.len(), 10);
    // Steadily rising closes: defined entries are all Bullish.
    assert!(forecast
        .direction
        .iter()
        .flatten()
        .all(|direction| *direction == condor::analytics::Direction::Bullish));

    // Series read API serves the same data.
    match engine.series(&AssetCode::from("SPY"), SeriesKind::Value) {
        Some(SeriesData::Values(values)) => assert_eq!(values.len(), 10),
        other => panic!("unexpected series: {other:?}"),
    }

    // 2018-10-19 is 46 days out from the step clock.
    assert_eq!(
        engine.expiration_target(),
        NaiveDate::from_ymd_opt(2018, 10, 19)
    );

    assert_eq!(engine.maximum_risk_per_trade(), Some(5_000.0));
}

#[tokio::test]
async fn test_strategy_lifecycle_open_then_close() {
    let broker = scripted_broker();
    let clock = StepClock::new(start_time());
    let config = test_config();
    let strategy_dir = config.strategy_path();
    let mut engine = Engine::new(config, clock.clone(), broker.clone()).unwrap();
    engine.register_algorithm(Box::new(Faulty));
    engine.register_algorithm(Box::new(SpreadOnce {
        created: start_time(),
        emitted: false,
    }));

    engine.start().await.unwrap();

    // Iteration 1: the algorithm proposes, the engine submits the bracket.
    engine.run_once().await;
    assert_eq!(engine.status(), EngineStatus::Running);
    assert_eq!(broker.placed_groups().len(), 1);
    assert_eq!(engine.store().strategies().count(), 1);

    let strategy = engine.store().strategies().next().unwrap().clone();
    assert!(strategy.opened.is_none());
    assert_eq!(strategy.quantity, 1);
    assert_eq!(strategy.entry_price, Some(-1.0));
    assert!(strategy_dir
        .join(format!("{}.json", strategy.id()))
        .exists());

    // Broker confirms the parent fill and reports both leg positions.
    broker.push_trade_update(TradeUpdate::new(
        OrderRef::encode(
            strategy.id().as_str(),
            strategy.legs[0].id().as_str(),
            OrderRole::NewLeg,
        ),
        OrderStatus::Filled,
        0,
        Some(1.4),
    ));
    broker.set_positions(vec![
        position("SPY", Ownership::Buyer, dec!(270), 1),
        position("SPY", Ownership::Seller, dec!(275), 1),
    ]);

    // Iteration 2: reconciliation opens the strategy.
    engine.run_once().await;
    let strategy = engine.store().strategies().next().unwrap().clone();
    assert!(strategy.opened.is_some());
    assert!(strategy.closed.is_none());
    assert!(strategy.opened.unwrap() >= strategy.created);

    let parent_ref = OrderRef::encode(
        strategy.id().as_str(),
        strategy.legs[0].id().as_str(),
        OrderRole::NewLeg,
    );
    let record = engine.coordinator().order(&parent_ref).unwrap();
    assert_eq!(record.status, Some(OrderStatus::Filled));

    // Broker reports the positions gone.
    broker.set_positions(Vec::new());

    // Iteration 3: reconciliation closes and retires the strategy.
    engine.run_once().await;
    assert_eq!(engine.store().strategies().count(), 0);
    assert!(!strategy_dir
        .join(format!("{}.json", strategy.id()))
        .exists());
    assert!(strategy_dir
        .join(format!("{}.json_closed", strategy.id()))
        .exists());
}

#[tokio::test]
async fn test_chain_discovery_filters_strikes_to_the_price_band() {
    let broker = scripted_broker();
    let mut chain: condor_execution::FnvIndexMap<smol_str::SmolStr, _> = Default::default();
    // SPY trades at 280 with a 10% band: only 275 survives the filter.
    for (strike, contract) in [(dec!(250), "2001"), (dec!(275), "2002"), (dec!(320), "2003")] {
        let quote = put_quote("SPY", strike, 5.0, 6.0, contract);
        chain.insert(smol_str::SmolStr::from(quote.contract.chain_key()), quote);
    }
    broker.set_chain(AssetCode::from("SPY"), chain);

    let clock = StepClock::new(start_time());
    let mut engine = Engine::new(test_config(), clock, broker).unwrap();
    engine.register_algorithm(Box::new(ChainWatcher));

    engine.start().await.unwrap();
    engine.run_once().await;

    let discovered = engine
        .store()
        .asset(&AssetCode::from("SPY"))
        .unwrap()
        .option_chain
        .as_ref()
        .unwrap();
    assert_eq!(discovered.len(), 1);
    assert!(discovered.contains_key("275P"));
}

#[tokio::test]
async fn test_partial_fill_leaves_strategy_unopened() {
    let broker = scripted_broker();
    let clock = StepClock::new(start_time());
    let mut engine = Engine::new(test_config(), clock, broker.clone()).unwrap();

    engine.start().await.unwrap();
    engine.new_strategy(spread_strategy(start_time())).await.unwrap();

    // Only the buy leg has a position; the sell leg is missing.
    broker.set_positions(vec![position("SPY", Ownership::Buyer, dec!(270), 1)]);

    engine.run_once().await;
    let strategy = engine.store().strategies().next().unwrap();
    assert!(strategy.opened.is_none());
}

#[tokio::test]
async fn test_mismatched_ownership_counts_as_absent() {
    let broker = scripted_broker();
    let clock = StepClock::new(start_time());
    let mut engine = Engine::new(test_config(), clock, broker.clone()).unwrap();

    engine.start().await.unwrap();
    engine.new_strategy(spread_strategy(start_time())).await.unwrap();

    broker.set_positions(vec![
        // Ownership flipped on both legs: broker noise, not our fills.
        position("SPY", Ownership::Seller, dec!(270), 1),
        position("SPY", Ownership::Buyer, dec!(275), 1),
    ]);

    engine.run_once().await;
    let strategy = engine.store().strategies().next().unwrap();
    assert!(strategy.opened.is_none());
}

#[tokio::test]
async fn test_fatal_broker_error_stops_the_loop() {
    let broker = scripted_broker();
    let clock = StepClock::new(start_time());
    let mut engine = Engine::new(test_config(), clock, broker.clone()).unwrap();

    engine.start().await.unwrap();

    broker.fail_next(BrokerError::ConnectionLost("socket closed".to_string()));
    engine.run_once().await;
    assert_eq!(engine.status(), EngineStatus::Stopping);
}

#[tokio::test]
async fn test_transient_rpc_error_is_retried_next_iteration() {
    let broker = scripted_broker();
    let clock = StepClock::new(start_time());
    let mut engine = Engine::new(test_config(), clock, broker.clone()).unwrap();

    engine.start().await.unwrap();

    broker.fail_next(BrokerError::TransientRpc("quote farm busy".to_string()));
    engine.run_once().await;
    assert_eq!(engine.status(), EngineStatus::Running);

    engine.run_once().await;
    assert_eq!(engine.status(), EngineStatus::Running);
    assert!(engine.store().asset(&AssetCode::from("SPY")).unwrap().current.is_some());
}

#[tokio::test]
async fn test_loop_is_idempotent_with_unchanged_broker_state() {
    let broker = scripted_broker();
    let clock = StepClock::new(start_time());
    let mut engine = Engine::new(test_config(), clock, broker.clone()).unwrap();

    engine.start().await.unwrap();

    engine.run_once().await;
    let first = engine
        .store()
        .asset(&AssetCode::from("SPY"))
        .unwrap()
        .clone();

    engine.run_once().await;
    let second = engine
        .store()
        .asset(&AssetCode::from("SPY"))
        .unwrap()
        .clone();

    assert_eq!(first.current, second.current);
    assert_eq!(first.measures, second.measures);
    assert_eq!(first.forecast, second.forecast);
}

#[tokio::test]
async fn test_stop_handle_ends_the_run() {
    let broker = scripted_broker();
    let clock = StepClock::new(start_time());
    let mut engine = Engine::new(test_config(), clock, broker.clone()).unwrap();

    engine.start().await.unwrap();

    let handle = engine.stop_handle();
    handle.stop();
    engine.run().await;

    assert_eq!(engine.status(), EngineStatus::Stopped);
    assert!(!broker.is_connected());
}

#[tokio::test]
async fn test_ambiguous_watch_list_fails_startup() {
    let broker = scripted_broker();
    broker.set_ambiguous(AssetCode::from("EEM"));
    let clock = StepClock::new(start_time());
    let mut engine = Engine::new(test_config(), clock, broker).unwrap();

    let error = engine.start().await.unwrap_err();
    assert!(error.to_string().contains("EEM"));
    assert_ne!(engine.status(), EngineStatus::Running);
}

#[tokio::test]
async fn test_restart_recovers_strategies_from_repository() {
    let broker = scripted_broker();
    let clock = StepClock::new(start_time());
    let config = test_config();

    let strategy_id = {
        let mut engine = Engine::new(config.clone(), clock.clone(), broker.clone()).unwrap();
        engine.start().await.unwrap();
        engine.new_strategy(spread_strategy(start_time())).await.unwrap()
    };

    // A fresh engine over the same strategy directory sees the strategy.
    let broker = scripted_broker();
    let mut engine = Engine::new(config, clock, broker).unwrap();
    engine.start().await.unwrap();

    let recovered = engine.store().strategy(&strategy_id).unwrap();
    assert_eq!(recovered.id(), strategy_id);
    assert_eq!(recovered.legs.len(), 2);
}
