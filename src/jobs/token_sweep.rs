use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, instrument, trace};

use crate::services::tokens;
use crate::state::SharedStore;

/// Deletes expired one-time codes every `period`, the first run is one period after start.
pub fn start(store: SharedStore, period: Duration) -> JoinHandle<()> {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::task::spawn(async move {
        loop {
            interval.tick().await;
            execute(&store).await;
        }
    })
}

#[instrument(skip(store))]
async fn execute(store: &SharedStore) {
    trace!("sweeping expired tokens");
    if let Err(err) = tokens::sweep_expired(&**store, Utc::now()).await {
        error!("failed to sweep expired tokens: {err}");
    }
}
