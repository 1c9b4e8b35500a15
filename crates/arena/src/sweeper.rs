//! Background task that expires idle rooms and stale shape-key results.

use std::sync::Arc;
use std::time::Duration;

use arena_entitlement::{OwnershipOracle, PurchaseLedger};
use tokio::time::{Instant, MissedTickBehavior};

use crate::server::ServerState;

/// Sweeps every `every` until the task is aborted.
///
/// Missed ticks are skipped rather than replayed: one sweep after a stall
/// catches up on everything anyway.
pub(crate) async fn run_sweeper<L, O>(state: Arc<ServerState<L, O>>, every: Duration)
where
    L: PurchaseLedger,
    O: OwnershipOracle,
{
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        let now = Instant::now().into_std();
        let expired = state.gateway.expire_idle(now).await;
        let pruned = state.entitlements.prune_shape_keys(now).await;
        if !expired.is_empty() || pruned > 0 {
            tracing::debug!(rooms = expired.len(), shape_keys = pruned, "idle sweep");
        }
    }
}
