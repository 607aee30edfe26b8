use crate::order::{OrderRef, OrderStatus};
use derive_more::Constructor;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Order-status callback pushed by the broker.
///
/// Delivered to the engine through the trade-update channel and drained at
/// the top of each loop iteration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Constructor)]
pub struct TradeUpdate {
    pub reference: OrderRef,
    pub status: OrderStatus,
    pub remaining: u32,
    pub commission: Option<f64>,
}

impl TradeUpdate {
    pub fn is_filled(&self) -> bool {
        self.status == OrderStatus::Filled && self.remaining == 0
    }
}

impl Display for TradeUpdate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ reference: {}, status: {}, remaining: {} }}",
            self.reference, self.status, self.remaining
        )
    }
}
