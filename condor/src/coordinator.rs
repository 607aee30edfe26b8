use crate::{
    FnvIndexMap,
    config::Config,
    error::EngineError,
    risk::{check_strategy, maximum_risk_per_trade, RiskRefused},
    strategy::{Strategy, StrategyError, round_cents},
};
use condor_execution::{
    account::Account,
    error::BrokerError,
    order::{BracketGroup, ComboLeg, OrderKind, OrderRef, OrderRole, OrderStatus, OrderTemplate},
    port::BrokerPort,
    trade::TradeUpdate,
};
use chrono::{DateTime, Utc};
use smol_str::SmolStr;
use std::{fs::OpenOptions, io::Write, path::PathBuf};
use tracing::{debug, info, warn};

/// In-memory record of one submitted order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRecord {
    pub template: OrderTemplate,
    pub status: Option<OrderStatus>,
    pub remaining: Option<u32>,
    pub commission: Option<f64>,
}

/// Sizes and prices new strategies against account limits, emits them as
/// bracketed order groups, and applies broker order-status callbacks to the
/// in-memory order book.
///
/// Never retries from the callback handler; retries belong to the loop.
pub struct OrderCoordinator<Broker> {
    broker: Broker,
    receipts: ReceiptLog,
    orders: FnvIndexMap<OrderRef, OrderRecord>,
}

impl<Broker> std::fmt::Debug for OrderCoordinator<Broker> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderCoordinator")
            .field("orders", &self.orders.len())
            .finish()
    }
}

impl<Broker> OrderCoordinator<Broker>
where
    Broker: BrokerPort,
{
    pub fn new(broker: Broker, receipt_path: PathBuf) -> Self {
        Self {
            broker,
            receipts: ReceiptLog::new(receipt_path),
            orders: FnvIndexMap::default(),
        }
    }

    /// Size and price a new strategy, refusing it when its worst case
    /// exceeds the per-trade risk limit.
    ///
    /// Sizing policy: one lot. Whatever replaces it must never emit a
    /// strategy whose `quantity * per-lot maximum loss` exceeds
    /// [`maximum_risk_per_trade`].
    pub fn size_and_price(
        &self,
        strategy: &mut Strategy,
        account: &Account,
        config: &Config,
    ) -> Result<(), EngineError> {
        strategy.quantity = 1;
        strategy.entry_price = Some(strategy.compute_entry_price());

        let maximum_risk = maximum_risk_per_trade(account, config)
            .ok_or_else(|| RiskRefused::new("account values not yet reported"))?;
        check_strategy(strategy, maximum_risk)?;
        Ok(())
    }

    /// Build and submit the bracketed order group for a priced strategy.
    pub async fn place(&mut self, strategy: &Strategy, config: &Config) -> Result<(), EngineError> {
        let entry_price = strategy.entry_price.ok_or(StrategyError::Unpriced)?;
        let strategy_id = strategy.id();
        let anchor = strategy.legs.first().ok_or(StrategyError::NoLegs)?;
        let anchor_id = anchor.id();

        let legs = strategy
            .legs
            .iter()
            .map(|leg| {
                let contract = leg.option.contract.contract.clone().ok_or_else(|| {
                    BrokerError::StaleContract(leg.id().as_str().to_string())
                })?;
                Ok(ComboLeg::new(contract, leg.ratio, leg.ownership))
            })
            .collect::<Result<Vec<_>, BrokerError>>()?;

        let order = |role: OrderRole, ownership, price, kind| {
            OrderTemplate::new(
                SmolStr::new(anchor_id.as_str()),
                role,
                ownership,
                strategy.quantity,
                price,
                kind,
                OrderRef::encode(strategy_id.as_str(), anchor_id.as_str(), role),
            )
        };

        let parent = order(
            OrderRole::NewLeg,
            strategy.ownership,
            entry_price,
            OrderKind::Limit,
        );
        let take_profit = order(
            OrderRole::TakeProfit,
            strategy.ownership.reverse(),
            round_cents(entry_price * strategy.take_profit_factor),
            OrderKind::Limit,
        );
        let stop_loss = order(
            OrderRole::StopLoss,
            strategy.ownership.reverse(),
            round_cents(entry_price * config.stop_loss_factor),
            OrderKind::Stop,
        );

        for template in [&parent, &take_profit, &stop_loss] {
            self.orders.insert(
                template.reference.clone(),
                OrderRecord {
                    template: template.clone(),
                    status: None,
                    remaining: None,
                    commission: None,
                },
            );
        }

        let group = BracketGroup {
            code: strategy.code.clone(),
            legs,
            parent,
            take_profit,
            stop_loss,
        };

        info!(%strategy_id, entry_price, "OrderCoordinator placing bracket group");
        self.broker.place_strategy(group).await?;
        Ok(())
    }

    /// Apply a broker order-status callback.
    pub fn on_trade_update(&mut self, update: &TradeUpdate, now: DateTime<Utc>) {
        let Some((strategy_id, leg_id, role)) = update.reference.decode() else {
            warn!(reference = %update.reference, "TradeUpdate with unparseable reference");
            return;
        };

        if update.is_filled() {
            info!(
                strategy_id,
                leg_id,
                role = %role,
                commission = ?update.commission,
                "order filled"
            );
        }
        debug!(reference = %update.reference, status = %update.status, "order status changed");

        self.receipts.append(&format!(
            "{} {} {} remaining={} commission={}",
            now.format("%Y-%m-%d %H:%M:%S"),
            update.reference,
            update.status,
            update.remaining,
            update
                .commission
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string()),
        ));

        match self.orders.get_mut(&update.reference) {
            Some(record) => {
                record.status = Some(update.status);
                record.remaining = Some(update.remaining);
                if update.commission.is_some() {
                    record.commission = update.commission;
                }
            }
            None => {
                debug!(reference = %update.reference, "TradeUpdate for unknown order");
            }
        }
    }

    pub fn order(&self, reference: &OrderRef) -> Option<&OrderRecord> {
        self.orders.get(reference)
    }

    pub fn orders(&self) -> impl Iterator<Item = (&OrderRef, &OrderRecord)> {
        self.orders.iter()
    }
}

/// Append-only trade-receipt log at `DATA_DIR/execution.log`.
#[derive(Debug)]
struct ReceiptLog {
    path: PathBuf,
}

impl ReceiptLog {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn append(&self, line: &str) {
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| writeln!(file, "{line}"));

        if let Err(error) = result {
            warn!(path = %self.path.display(), %error, "failed to append trade receipt");
        }
    }
}
