use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::infra::backend::CodeBackend;
use crate::infra::clock::SystemClock;
use crate::usecase::sweep::SweepExpiredUseCase;

/// Periodically evict expired codes until the returned handle is aborted.
///
/// Each sweep goes through the store's own serialization, so it never races a
/// request or verification on the same identity.
pub fn spawn_sweeper(codes: CodeBackend, clock: SystemClock, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let usecase = SweepExpiredUseCase { codes, clock };
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match usecase.execute().await {
                Ok(0) => {}
                Ok(removed) => tracing::debug!(removed, "swept expired codes"),
                Err(e) => tracing::warn!(error = %e, "expired code sweep failed"),
            }
        }
    })
}
