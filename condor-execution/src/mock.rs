use crate::{
    FnvIndexMap,
    account::Account,
    channel::{UnboundedRx, UnboundedTx, unbounded_channel},
    error::BrokerError,
    order::BracketGroup,
    port::{BrokerPort, ChainRequest},
    position::Position,
    trade::TradeUpdate,
};
use condor_instrument::{
    asset::{AssetCode, AssetDefinition, ContractId},
    market_data::{Current, History},
    option::{OptionContract, OptionQuote},
};
use rust_decimal::prelude::ToPrimitive;
use smol_str::SmolStr;
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};
use tracing::debug;

/// Scripted [`BrokerPort`] implementation.
///
/// Tests preload account values, positions, quotes, histories and chains,
/// then drive the engine against them. Placed bracket groups are recorded
/// for assertions, and trade updates can be pushed into the stream at any
/// point.
#[derive(Debug, Clone)]
pub struct MockBroker {
    inner: Arc<Mutex<MockBrokerInner>>,
}

#[derive(Debug)]
struct MockBrokerInner {
    connected: bool,
    account: Account,
    positions: FnvIndexMap<SmolStr, Position>,
    quotes: FnvIndexMap<AssetCode, Current>,
    option_quotes: FnvIndexMap<SmolStr, OptionQuote>,
    price_histories: FnvIndexMap<ContractId, History>,
    iv_histories: FnvIndexMap<ContractId, History>,
    chains: FnvIndexMap<AssetCode, FnvIndexMap<SmolStr, OptionQuote>>,
    ambiguous: Option<AssetCode>,
    stale_contracts: Vec<SmolStr>,
    rpc_failures: VecDeque<BrokerError>,
    placed: Vec<BracketGroup>,
    update_tx: UnboundedTx<TradeUpdate>,
    update_rx: Option<UnboundedRx<TradeUpdate>>,
}

/// Key for scripted option quotes, stable across qualification.
fn quote_key(contract: &OptionContract) -> SmolStr {
    SmolStr::from(format!(
        "{} {} {}",
        contract.underlying,
        contract.expiration.format("%Y%m%d"),
        contract.chain_key()
    ))
}

impl Default for MockBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBroker {
    pub fn new() -> Self {
        let (update_tx, update_rx) = unbounded_channel();
        Self {
            inner: Arc::new(Mutex::new(MockBrokerInner {
                connected: false,
                account: Account::default(),
                positions: FnvIndexMap::default(),
                quotes: FnvIndexMap::default(),
                option_quotes: FnvIndexMap::default(),
                price_histories: FnvIndexMap::default(),
                iv_histories: FnvIndexMap::default(),
                chains: FnvIndexMap::default(),
                ambiguous: None,
                stale_contracts: Vec::new(),
                rpc_failures: VecDeque::new(),
                placed: Vec::new(),
                update_tx,
                update_rx: Some(update_rx),
            })),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockBrokerInner> {
        self.inner.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    pub fn set_account(&self, account: Account) {
        self.lock().account = account;
    }

    pub fn set_positions(&self, positions: Vec<Position>) {
        self.lock().positions = positions
            .into_iter()
            .map(|position| (position.position_id(), position))
            .collect();
    }

    pub fn set_quote(&self, code: AssetCode, current: Current) {
        self.lock().quotes.insert(code, current);
    }

    pub fn set_option_quote(&self, quote: OptionQuote) {
        self.lock()
            .option_quotes
            .insert(quote_key(&quote.contract), quote);
    }

    pub fn set_price_history(&self, contract: ContractId, history: History) {
        self.lock().price_histories.insert(contract, history);
    }

    pub fn set_iv_history(&self, contract: ContractId, history: History) {
        self.lock().iv_histories.insert(contract, history);
    }

    pub fn set_chain(&self, code: AssetCode, chain: FnvIndexMap<SmolStr, OptionQuote>) {
        self.lock().chains.insert(code, chain);
    }

    /// Make the next asset qualification fail as ambiguous for `code`.
    pub fn set_ambiguous(&self, code: AssetCode) {
        self.lock().ambiguous = Some(code);
    }

    /// Mark an option contract (by quote key) as no longer qualifiable.
    pub fn set_stale(&self, contract: &OptionContract) {
        self.lock().stale_contracts.push(quote_key(contract));
    }

    /// Queue an error returned by the next RPC.
    pub fn fail_next(&self, error: BrokerError) {
        self.lock().rpc_failures.push_back(error);
    }

    /// Push an order-status callback into the event stream.
    pub fn push_trade_update(&self, update: TradeUpdate) {
        let inner = self.lock();
        let _ = inner.update_tx.send(update);
    }

    pub fn placed_groups(&self) -> Vec<BracketGroup> {
        self.lock().placed.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.lock().connected
    }

    fn take_failure(&self) -> Option<BrokerError> {
        self.lock().rpc_failures.pop_front()
    }
}

impl BrokerPort for MockBroker {
    async fn connect(&self) -> Result<(), BrokerError> {
        if let Some(error) = self.take_failure() {
            return Err(error);
        }
        self.lock().connected = true;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), BrokerError> {
        self.lock().connected = false;
        Ok(())
    }

    async fn sleep(&self, duration: Duration) {
        // Scripted time: tests step the engine clock instead.
        debug!(?duration, "MockBroker sleep elided");
    }

    async fn account_values(&self) -> Result<Account, BrokerError> {
        if let Some(error) = self.take_failure() {
            return Err(error);
        }
        Ok(self.lock().account.clone())
    }

    async fn positions(&self) -> Result<FnvIndexMap<SmolStr, Position>, BrokerError> {
        if let Some(error) = self.take_failure() {
            return Err(error);
        }
        Ok(self.lock().positions.clone())
    }

    async fn qualify_assets(
        &self,
        definitions: &[AssetDefinition],
    ) -> Result<FnvIndexMap<AssetCode, ContractId>, BrokerError> {
        if let Some(error) = self.take_failure() {
            return Err(error);
        }
        let inner = self.lock();
        definitions
            .iter()
            .map(|definition| {
                if inner.ambiguous.as_ref() == Some(&definition.code) {
                    Err(BrokerError::AmbiguousAsset(definition.code.clone()))
                } else {
                    Ok((
                        definition.code.clone(),
                        ContractId::new(definition.code.as_str()),
                    ))
                }
            })
            .collect()
    }

    async fn qualify_options(
        &self,
        contracts: &[OptionContract],
    ) -> Result<Vec<OptionContract>, BrokerError> {
        if let Some(error) = self.take_failure() {
            return Err(error);
        }
        let inner = self.lock();
        contracts
            .iter()
            .map(|contract| {
                let key = quote_key(contract);
                if inner.stale_contracts.contains(&key) {
                    Err(BrokerError::StaleContract(key.to_string()))
                } else {
                    Ok(contract.clone().with_contract(ContractId::new(key.as_str())))
                }
            })
            .collect()
    }

    async fn snapshot_quotes(
        &self,
        _contracts: &[ContractId],
    ) -> Result<FnvIndexMap<AssetCode, Current>, BrokerError> {
        if let Some(error) = self.take_failure() {
            return Err(error);
        }
        Ok(self.lock().quotes.clone())
    }

    async fn option_quotes(
        &self,
        contracts: &[OptionContract],
    ) -> Result<Vec<OptionQuote>, BrokerError> {
        if let Some(error) = self.take_failure() {
            return Err(error);
        }
        let inner = self.lock();
        Ok(contracts
            .iter()
            .filter_map(|contract| inner.option_quotes.get(&quote_key(contract)).cloned())
            .collect())
    }

    async fn price_history(
        &self,
        contract: &ContractId,
        _years: u32,
    ) -> Result<History, BrokerError> {
        if let Some(error) = self.take_failure() {
            return Err(error);
        }
        self.lock()
            .price_histories
            .get(contract)
            .cloned()
            .ok_or_else(|| BrokerError::TransientRpc(format!("no price history for {contract}")))
    }

    async fn iv_history(&self, contract: &ContractId, _years: u32) -> Result<History, BrokerError> {
        if let Some(error) = self.take_failure() {
            return Err(error);
        }
        self.lock()
            .iv_histories
            .get(contract)
            .cloned()
            .ok_or_else(|| BrokerError::TransientRpc(format!("no IV history for {contract}")))
    }

    async fn option_chain(
        &self,
        request: ChainRequest,
    ) -> Result<FnvIndexMap<SmolStr, OptionQuote>, BrokerError> {
        if let Some(error) = self.take_failure() {
            return Err(error);
        }
        let inner = self.lock();
        let chain = inner.chains.get(&request.underlying).cloned().unwrap_or_default();

        // Mirror the live adapter's strike-band filter.
        let min_strike = request.underlying_price - request.band_width;
        let max_strike = request.underlying_price + request.band_width;
        Ok(chain
            .into_iter()
            .filter(|(_, quote)| {
                let strike = quote.contract.strike.to_f64().unwrap_or(f64::NAN);
                quote.contract.expiration == request.expiration
                    && strike > min_strike
                    && strike < max_strike
            })
            .collect())
    }

    async fn place_strategy(&self, group: BracketGroup) -> Result<(), BrokerError> {
        if let Some(error) = self.take_failure() {
            return Err(error);
        }
        let mut inner = self.lock();
        if !inner.connected {
            return Err(BrokerError::ConnectionLost("not connected".to_string()));
        }
        debug!(reference = %group.parent.reference, "MockBroker recorded bracket group");
        inner.placed.push(group);
        Ok(())
    }

    async fn trade_updates(&self) -> Result<UnboundedRx<TradeUpdate>, BrokerError> {
        self.lock()
            .update_rx
            .take()
            .ok_or_else(|| BrokerError::Rejected("trade updates already taken".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{OrderRef, OrderStatus};

    #[tokio::test]
    async fn test_scripted_failures_are_consumed_in_order() {
        let broker = MockBroker::new();
        broker.fail_next(BrokerError::TransientRpc("flaky".to_string()));

        assert!(broker.account_values().await.is_err());
        assert!(broker.account_values().await.is_ok());
    }

    #[tokio::test]
    async fn test_trade_update_stream() {
        let broker = MockBroker::new();
        let mut rx = broker.trade_updates().await.unwrap();

        broker.push_trade_update(TradeUpdate::new(
            "a_b_NL".parse::<OrderRef>().unwrap(),
            OrderStatus::Filled,
            0,
            Some(1.2),
        ));

        let drained = rx.drain();
        assert_eq!(drained.len(), 1);
        assert!(drained[0].is_filled());

        // The stream is handed out exactly once.
        assert!(broker.trade_updates().await.is_err());
    }

    #[tokio::test]
    async fn test_ambiguous_qualification() {
        let broker = MockBroker::new();
        broker.set_ambiguous(AssetCode::from("SPY"));

        let result = broker
            .qualify_assets(&[AssetDefinition::new(
                "SPY",
                condor_instrument::asset::AssetKind::Stock,
            )])
            .await;
        assert_eq!(
            result,
            Err(BrokerError::AmbiguousAsset(AssetCode::from("SPY")))
        );
    }
}
