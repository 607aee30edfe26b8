use condor::{
    algo::{AlgoError, TradeAlgo},
    config::Config,
    engine::{Engine, clock::StepClock},
    logging::init_logging,
    state::DataStore,
    strategy::{Strategy, spread::ShortPutVerticalSpread},
};
use condor_execution::{account::Account, mock::MockBroker};
use condor_instrument::{
    Currency,
    asset::{AssetCode, AssetDefinition, AssetKind, ContractId},
    market_data::{Bar, Current, History},
    option::{Greeks, OptionContract, OptionQuote, OptionRight},
};
use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2018, 9, 3, 10, 0, 0).unwrap()
}

fn put_quote(strike: Decimal, bid: f64, ask: f64, contract: &str) -> OptionQuote {
    OptionQuote {
        contract: OptionContract::new(
            AssetCode::from("SPY"),
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
        time: now(),
    }
}

/// Sells a put vertical on the benchmark whenever no strategy is open.
struct BenchmarkPutSeller;

impl TradeAlgo for BenchmarkPutSeller {
    fn name(&self) -> &str {
        "benchmark-put-seller"
    }

    fn evaluate(&mut self, store: &DataStore) -> Result<Vec<Strategy>, AlgoError> {
        if store.strategies().count() > 0 {
            return Ok(Vec::new());
        }
        let Some(measures) = store
            .asset(&AssetCode::from("SPY"))
            .and_then(|asset| asset.measures.as_ref())
        else {
            return Ok(Vec::new());
        };
        if measures.iv_rank < 0.5 {
            return Ok(Vec::new());
        }

        let spread = ShortPutVerticalSpread::new(
            put_quote(Decimal::from(270), 5.0, 6.0, "1001"),
            put_quote(Decimal::from(275), 6.0, 7.0, "1002"),
            0.5,
        )
        .map_err(|err| AlgoError::new("benchmark-put-seller", err.to_string()))?;

        let strategy = spread
            .into_strategy(Currency::Usd, now())
            .map_err(|err| AlgoError::new("benchmark-put-seller", err.to_string()))?;
        Ok(vec![strategy])
    }
}

#[tokio::main]
async fn main() {
    init_logging();

    let broker = MockBroker::new();
    broker.set_account(Account {
        net_liquidation: Some(100_000.0),
        cash: Some(100_000.0),
        ..Account::default()
    });
    broker.set_quote(
        AssetCode::from("SPY"),
        Current {
            high: 281.0,
            low: 279.0,
            close: 279.5,
            bid: 279.9,
            bid_size: 10.0,
            ask: 280.1,
            ask_size: 10.0,
            last: 280.0,
            last_size: 5.0,
            volume: 10_000.0,
            time: now(),
        },
    );

    let closes: Vec<f64> = (0..252).map(|i| 250.0 + 0.12 * i as f64).collect();
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
            time: NaiveDate::from_ymd_opt(2017, 9, 4).unwrap() + Days::new(index as u64),
        })
        .collect::<Vec<_>>();
    broker.set_price_history(ContractId::from("SPY"), History::new(bars.clone(), now()));

    let iv_bars = bars
        .iter()
        .enumerate()
        .map(|(index, bar)| Bar {
            close: 0.10 + 0.001 * index as f64,
            low: 0.09 + 0.001 * index as f64,
            high: 0.12 + 0.001 * index as f64,
            ..*bar
        })
        .collect();
    broker.set_iv_history(ContractId::from("SPY"), History::new(iv_bars, now()));

    let config = Config {
        watch_list: vec![AssetDefinition::new("SPY", AssetKind::Stock)],
        expirations: vec![NaiveDate::from_ymd_opt(2018, 10, 19).unwrap()],
        data_dir: std::env::temp_dir().join("condor-example"),
        ..Config::default()
    };

    let mut engine = Engine::new(config, StepClock::new(now()), broker.clone())
        .expect("failed to initialise engine");
    engine.register_algorithm(Box::new(BenchmarkPutSeller));

    engine.start().await.expect("engine failed to start");
    for _ in 0..3 {
        engine.run_once().await;
    }

    println!("placed {} bracket group(s)", broker.placed_groups().len());
    for strategy in engine.store().strategies() {
        println!(
            "strategy {} entry {:?} opened {:?}",
            strategy.id(),
            strategy.entry_price,
            strategy.opened
        );
    }
    engine.shutdown().await;
}
