use std::time::Duration;
use tracing::info;

use crate::session::coordinator::WeakCoordinator;
use crate::session::scheduler::ScheduledTask;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownTick {
    Running(u32),
    Expired,
    /// The poll the countdown was started for is no longer open
    Stale,
}

/// One-second countdown for the open poll; closes it when time runs out.
pub(crate) fn start(coordinator: WeakCoordinator, poll_id: String, seconds: u32) -> ScheduledTask {
    info!(poll_id = %poll_id, seconds, "Poll countdown started");

    ScheduledTask::spawn("poll-countdown", async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        // The first tick completes immediately
        interval.tick().await;

        loop {
            interval.tick().await;

            let Some(coordinator) = coordinator.upgrade() else {
                return;
            };
            match coordinator.countdown_tick(&poll_id).await {
                CountdownTick::Running(_) => {}
                CountdownTick::Expired => {
                    info!(poll_id = %poll_id, "Time limit reached, closing poll");
                    coordinator.close_poll_if_current(&poll_id).await;
                    return;
                }
                CountdownTick::Stale => return,
            }
        }
    })
}
