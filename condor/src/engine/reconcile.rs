use crate::{
    repository::StrategyRepo,
    state::DataStore,
    strategy::StrategyId,
};
use condor_execution::{FnvIndexMap, position::Position};
use chrono::{DateTime, Utc};
use smol_str::SmolStr;
use tracing::{error, warn};

/// Strategies whose lifecycle advanced during a reconciliation pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub opened: Vec<StrategyId>,
    pub closed: Vec<StrategyId>,
}

/// Reconcile broker-reported positions against in-flight strategies.
///
/// Consumes a working copy of the position map: every matched leg subtracts
/// its required quantity. A strategy whose legs are fully covered opens; an
/// opened strategy with no remaining coverage closes and is retired from
/// the store and the repository. Leftover positions are logged as excess.
///
/// A position with mismatched ownership counts as absent; a position
/// smaller than required leaves the strategy un-opened.
pub fn reconcile_positions(
    store: &mut DataStore,
    repo: &StrategyRepo,
    mut positions: FnvIndexMap<SmolStr, Position>,
    now: DateTime<Utc>,
) -> ReconcileOutcome {
    let mut outcome = ReconcileOutcome::default();
    let mut to_remove = Vec::new();

    for strategy in store.strategies_mut() {
        let mut filled: u32 = 0;

        for leg in &strategy.legs {
            let leg_id = leg.id();
            let Some(position) = positions.get_mut(leg_id.as_str()) else {
                warn!(leg = %leg_id, "leg has no position");
                continue;
            };
            if position.ownership != leg.ownership {
                warn!(leg = %leg_id, "leg and position ownerships don't match");
                continue;
            }

            let needed = strategy.quantity * leg.ratio;
            if position.quantity >= needed {
                position.quantity -= needed;
                filled += needed;
                if position.quantity == 0 {
                    positions.shift_remove(leg_id.as_str());
                }
            } else {
                filled += position.quantity;
                warn!(leg = %leg_id, "leg doesn't have enough positions");
            }
        }

        let expected = strategy.expected_position_quantity();

        if filled == expected && strategy.opened.is_none() {
            strategy.opened = Some(now);
            strategy.updated = now;
            if let Err(err) = repo.update(strategy) {
                error!(id = %strategy.id(), %err, "failed to persist opened strategy");
            }
            outcome.opened.push(strategy.id());
        }

        if filled == 0 && strategy.opened.is_some() && strategy.closed.is_none() {
            strategy.closed = Some(now);
            strategy.updated = now;
            if let Err(err) = repo.update(strategy) {
                error!(id = %strategy.id(), %err, "failed to persist closed strategy");
            }
            if let Err(err) = repo.delete(&strategy.id()) {
                error!(id = %strategy.id(), %err, "failed to retire strategy file");
            }
            to_remove.push(strategy.id());
        }
    }

    if !positions.is_empty() {
        warn!(count = positions.len(), "there are excess positions");
    }

    for id in to_remove {
        store.delete_strategy(&id);
        outcome.closed.push(id);
    }

    outcome
}
