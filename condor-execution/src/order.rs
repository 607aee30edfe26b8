use condor_instrument::{
    Ownership,
    asset::{AssetCode, ContractId},
};
use derive_more::{Constructor, Display, From};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Broker-reported lifecycle state of an order.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
pub enum OrderStatus {
    ApiPending,
    PendingSubmit,
    PendingCancel,
    PreSubmitted,
    Submitted,
    ApiCancelled,
    Cancelled,
    Filled,
    Inactive,
}

impl OrderStatus {
    /// Whether the broker can still fill this order.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            OrderStatus::ApiPending
                | OrderStatus::PendingSubmit
                | OrderStatus::PendingCancel
                | OrderStatus::PreSubmitted
                | OrderStatus::Submitted
        )
    }
}

/// Role of an order within a bracketed group.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub enum OrderRole {
    NewLeg,
    TakeProfit,
    StopLoss,
}

impl OrderRole {
    pub fn code(&self) -> &'static str {
        match self {
            OrderRole::NewLeg => "NL",
            OrderRole::TakeProfit => "TP",
            OrderRole::StopLoss => "SL",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "NL" => Some(OrderRole::NewLeg),
            "TP" => Some(OrderRole::TakeProfit),
            "SL" => Some(OrderRole::StopLoss),
            _ => None,
        }
    }
}

impl Display for OrderRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
pub enum OrderKind {
    Market,
    Limit,
    Stop,
}

/// Order reference string used to re-associate broker callbacks with
/// in-memory strategies: `{strategy_id}_{leg_id}_{role}`.
///
/// Strategy and leg ids never contain `_`, which keeps the separator
/// unambiguous.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, From)]
pub struct OrderRef(SmolStr);

impl OrderRef {
    pub fn encode(strategy_id: &str, leg_id: &str, role: OrderRole) -> Self {
        debug_assert!(!strategy_id.contains('_') && !leg_id.contains('_'));
        Self(SmolStr::from(format!("{strategy_id}_{leg_id}_{role}")))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Split the reference back into `(strategy_id, leg_id, role)`.
    pub fn decode(&self) -> Option<(&str, &str, OrderRole)> {
        let mut parts = self.0.splitn(3, '_');
        let strategy_id = parts.next()?;
        let leg_id = parts.next()?;
        let role = OrderRole::from_code(parts.next()?)?;
        Some((strategy_id, leg_id, role))
    }
}

impl FromStr for OrderRef {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(SmolStr::new(s)))
    }
}

impl Display for OrderRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Immutable order template handed to the broker.
///
/// `leg_id` names the leg the order references; the same id is embedded in
/// `reference` for re-association of broker callbacks.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Constructor)]
pub struct OrderTemplate {
    pub leg_id: SmolStr,
    pub role: OrderRole,
    pub ownership: Ownership,
    pub quantity: u32,
    pub price: f64,
    pub kind: OrderKind,
    pub reference: OrderRef,
}

/// One component of a combo contract: qualified option contract, ratio and
/// the action taken on it by the parent order. Child exit orders reverse
/// the action.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Constructor)]
pub struct ComboLeg {
    pub contract: ContractId,
    pub ratio: u32,
    pub action: Ownership,
}

/// Parent entry order plus linked take-profit and stop-loss children.
///
/// Adapters must submit the parent first with transmit `false`, then the
/// children carrying the parent's broker order id, with transmit `true` on
/// the last child so the broker activates the group atomically.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BracketGroup {
    pub code: AssetCode,
    pub legs: Vec<ComboLeg>,
    pub parent: OrderTemplate,
    pub take_profit: OrderTemplate,
    pub stop_loss: OrderTemplate,
}
