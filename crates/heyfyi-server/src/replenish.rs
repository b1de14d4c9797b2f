//! Periodic vote replenishment.
//!
//! Every tick adds one vote to the bank of every live account. The first tick
//! fires as soon as the job starts. Ticks missed while a grant was running
//! are not made up; the next one comes a full period later.

use std::{sync::Arc, time::Duration};

use heyfyi_core::store::VoteGrant;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Run the replenishment loop until `cancel` is triggered. A failed grant is
/// logged and retried on the next tick.
pub async fn run<S: VoteGrant>(store: Arc<S>, period: Duration, cancel: CancellationToken) {
  tracing::info!(interval_secs = period.as_secs(), "vote replenishment started");
  let mut interval = tokio::time::interval(period);
  interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

  loop {
    tokio::select! {
      _ = cancel.cancelled() => {
        tracing::info!("vote replenishment stopping");
        break;
      }
      _ = interval.tick() => {
        match store.grant_vote_to_all_accounts().await {
          Ok(accounts) => tracing::info!(accounts, "granted a vote to every account"),
          Err(e) => tracing::error!(error = %e, "vote replenishment failed"),
        }
      }
    }
  }
}
