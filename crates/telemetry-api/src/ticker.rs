use std::sync::Weak;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::Inner;

/// Periodic tick loop. The first tick lands one full period after spawn.
/// The loop ends on its own once `generation` is superseded or the
/// orchestrator is gone.
pub(crate) fn spawn(
    runtime: &Handle,
    inner: Weak<Inner>,
    generation: u64,
    period: Duration,
) -> JoinHandle<()> {
    let first = Instant::now() + period;
    runtime.spawn(async move {
        let mut interval = interval_at(first, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let Some(inner) = inner.upgrade() else {
                break;
            };
            if !inner.tick_if_current(generation) {
                break;
            }
        }
    })
}
