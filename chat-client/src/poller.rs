//! Background poll task.
//!
//! Fetches the message list at a fixed interval until aborted. The task only
//! holds a weak reference to the engine, so dropping the engine ends it even
//! if the abort is missed.

use crate::backend::Backend;
use crate::engine::Shared;
use chat_core::FetchMode;
use std::sync::Weak;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Spawn the poll task.
///
/// The first tick fires one `period` after the call. Each tick awaits its
/// fetch before waiting for the next one, so background fetches never
/// overlap. A fetch that outlasts `period` (a hung backend, say) stretches
/// the gap: the missed tick fires once the fetch returns and the schedule
/// restarts from there, with no burst to catch up. Returns a handle that
/// can be used to abort the task.
pub(crate) fn spawn_poll_task<B: Backend + 'static>(
    shared: Weak<Shared<B>>,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::debug!("Poll task started (interval: {:?})", period);

        let mut timer = interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            timer.tick().await;

            let Some(shared) = shared.upgrade() else {
                tracing::debug!("Poll task exiting: engine dropped");
                return;
            };

            // Failures are logged and reported by the fetch itself; the
            // loop keeps going regardless.
            if let Ok(report) = shared.fetch_messages(FetchMode::Background).await {
                tracing::trace!(?report, "Poll tick complete");
            }
        }
    })
}
