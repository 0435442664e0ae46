use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::SimulationSettings;
use crate::question::Question;
use crate::session::coordinator::WeakCoordinator;
use crate::session::scheduler::ScheduledTask;

/// Who votes and which letters they may press during a rehearsal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationPlan {
    pub device_ids: Vec<String>,
    pub letters: Vec<char>,
}

impl SimulationPlan {
    /// Uses the known devices when there are any, otherwise invents `placeholders`
    /// keypads.
    pub fn new<'a>(
        known_devices: impl IntoIterator<Item = &'a str>,
        question: &Question,
        placeholders: usize,
    ) -> Self {
        let mut device_ids: Vec<String> = known_devices.into_iter().map(str::to_string).collect();
        if device_ids.is_empty() {
            device_ids = (1..=placeholders).map(|i| format!("SIM-{i:02}")).collect();
        }

        Self {
            device_ids,
            letters: question.answer_letters(),
        }
    }

    /// Between one device and half of the population vote, each for a random letter.
    pub fn pick_votes<R: Rng>(&self, rng: &mut R) -> Vec<(String, char)> {
        if self.device_ids.is_empty() || self.letters.is_empty() {
            return Vec::new();
        }

        let max_voters = (self.device_ids.len() / 2).max(1);
        let voters = rng.random_range(1..=max_voters);

        self.device_ids
            .choose_multiple(&mut *rng, voters)
            .filter_map(|id| self.letters.choose(&mut *rng).map(|letter| (id.clone(), *letter)))
            .collect()
    }
}

pub fn next_period<R: Rng>(rng: &mut R, settings: &SimulationSettings) -> Duration {
    let low = settings.min_period_ms.min(settings.max_period_ms);
    let high = settings.min_period_ms.max(settings.max_period_ms);
    Duration::from_millis(rng.random_range(low..=high))
}

/// Start feeding simulated votes into `coordinator` until it stops polling in test mode.
pub(crate) fn start(
    coordinator: WeakCoordinator,
    plan: SimulationPlan,
    settings: SimulationSettings,
) -> ScheduledTask {
    info!(
        devices = plan.device_ids.len(),
        letters = ?plan.letters,
        "Starting simulated responses"
    );

    ScheduledTask::spawn("simulated-responses", async move {
        let mut rng = StdRng::from_os_rng();
        loop {
            tokio::time::sleep(next_period(&mut rng, &settings)).await;

            let Some(coordinator) = coordinator.upgrade() else {
                return;
            };
            if !coordinator.simulation_should_continue().await {
                debug!("Simulation no longer needed, stopping");
                return;
            }

            for (device_id, letter) in plan.pick_votes(&mut rng) {
                coordinator
                    .handle_response(&device_id, &letter.to_string())
                    .await;
            }
        }
    })
}
