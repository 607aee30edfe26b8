use crate::{
    FnvIndexMap,
    account::Account,
    channel::UnboundedRx,
    error::BrokerError,
    order::BracketGroup,
    position::Position,
    trade::TradeUpdate,
};
use condor_instrument::{
    asset::{AssetCode, AssetDefinition, ContractId},
    market_data::{Current, History},
    option::{OptionContract, OptionQuote},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::{future::Future, time::Duration};

/// Option-chain discovery request.
///
/// Implementations filter the broker's raw chain to expirations inside the
/// configured DTE window, strikes within `band_width` of
/// `underlying_price`, and rights {Put, Call}.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ChainRequest {
    pub underlying: AssetCode,
    pub contract: ContractId,
    pub expiration: NaiveDate,
    pub underlying_price: f64,
    /// Absolute strike distance from the underlying price, in price units.
    pub band_width: f64,
}

/// Abstract capability set the engine consumes from a broker.
///
/// Implementations own their protocol client and any per-RPC timeouts. The
/// broker imposes a request budget of at most 50 per second; bulk
/// operations (`option_quotes`, `option_chain`) must batch contract
/// qualification and ticker requests in groups of 50 with cooperative
/// pauses between batches.
pub trait BrokerPort
where
    Self: Clone + Send + Sync,
{
    fn connect(&self) -> impl Future<Output = Result<(), BrokerError>> + Send;

    fn disconnect(&self) -> impl Future<Output = Result<(), BrokerError>> + Send;

    /// Cooperative pause executed on the broker's event loop.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;

    fn account_values(&self) -> impl Future<Output = Result<Account, BrokerError>> + Send;

    /// Current positions keyed by position id.
    fn positions(
        &self,
    ) -> impl Future<Output = Result<FnvIndexMap<SmolStr, Position>, BrokerError>> + Send;

    /// Resolve watch-list definitions to broker contract handles.
    ///
    /// Fails with [`BrokerError::AmbiguousAsset`] when resolution is not
    /// one-to-one.
    fn qualify_assets(
        &self,
        definitions: &[AssetDefinition],
    ) -> impl Future<Output = Result<FnvIndexMap<AssetCode, ContractId>, BrokerError>> + Send;

    /// Re-resolve option contracts, eg/ after a restart finds stale handles.
    ///
    /// Fails with [`BrokerError::StaleContract`] when a contract no longer
    /// qualifies.
    fn qualify_options(
        &self,
        contracts: &[OptionContract],
    ) -> impl Future<Output = Result<Vec<OptionContract>, BrokerError>> + Send;

    /// Snapshot quotes for qualified underlyings, keyed by asset code.
    fn snapshot_quotes(
        &self,
        contracts: &[ContractId],
    ) -> impl Future<Output = Result<FnvIndexMap<AssetCode, Current>, BrokerError>> + Send;

    /// Snapshot quotes for qualified option contracts.
    fn option_quotes(
        &self,
        contracts: &[OptionContract],
    ) -> impl Future<Output = Result<Vec<OptionQuote>, BrokerError>> + Send;

    /// Daily trade bars covering `years` back from now.
    fn price_history(
        &self,
        contract: &ContractId,
        years: u32,
    ) -> impl Future<Output = Result<History, BrokerError>> + Send;

    /// Daily implied-volatility bars covering `years` back from now.
    fn iv_history(
        &self,
        contract: &ContractId,
        years: u32,
    ) -> impl Future<Output = Result<History, BrokerError>> + Send;

    /// Discover the filtered option chain, keyed by `{strike}{right}`.
    fn option_chain(
        &self,
        request: ChainRequest,
    ) -> impl Future<Output = Result<FnvIndexMap<SmolStr, OptionQuote>, BrokerError>> + Send;

    /// Submit a bracketed order group.
    ///
    /// The parent must reach the wire before its children so the broker can
    /// link and activate the group atomically.
    fn place_strategy(
        &self,
        group: BracketGroup,
    ) -> impl Future<Output = Result<(), BrokerError>> + Send;

    /// Take the order-status event stream.
    ///
    /// The receiver is handed out once; the engine drains it at the top of
    /// each loop iteration.
    fn trade_updates(
        &self,
    ) -> impl Future<Output = Result<UnboundedRx<TradeUpdate>, BrokerError>> + Send;
}
