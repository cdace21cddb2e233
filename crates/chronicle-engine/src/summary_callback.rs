//! Update callback that reports each finished day through `tracing`.

use tracing::{debug, info};

use chronicle_core::{SimulationUpdate, UpdateCallback};
use chronicle_types::WorldState;

/// Logs one `info!` line per finished day; everything else at `debug!`.
#[derive(Debug, Default)]
pub struct DaySummaryLogger {
    days_logged: u64,
}

impl DaySummaryLogger {
    /// A fresh logger.
    pub const fn new() -> Self {
        Self { days_logged: 0 }
    }

    /// Days reported so far.
    pub const fn days_logged(&self) -> u64 {
        self.days_logged
    }
}

impl UpdateCallback for DaySummaryLogger {
    fn on_update(&mut self, update: &SimulationUpdate, world: &WorldState) {
        match update {
            SimulationUpdate::DayStarted { day } => {
                debug!(day, agents = world.agents.len(), "Day started");
            }
            SimulationUpdate::ActionResolved { agent_id, kind } => {
                debug!(day = world.day, agent_id = %agent_id, kind, "Action resolved");
            }
            SimulationUpdate::DayEnded { summary } => {
                self.days_logged = self.days_logged.saturating_add(1);
                info!(
                    day = summary.day,
                    turns = summary.turns_taken,
                    actions = summary.actions_resolved,
                    budget_spent = summary.budget_spent,
                    budget_exhausted = summary.budget_exhausted,
                    chains = summary.chains,
                    events_started = summary.events_started,
                    events_ended = summary.events_ended,
                    logs_trimmed = summary.logs_trimmed,
                    stability = world.world_stability,
                    magic_level = world.magic_level,
                    corruption = world.corruption.global,
                    active_events = world.active_events.len(),
                    "Day complete"
                );
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chronicle_core::DaySummary;
    use chronicle_types::AgentId;
    use chronicle_world::create_starting_world;

    use super::*;

    #[test]
    fn only_day_ends_are_counted() {
        let world = create_starting_world();
        let mut logger = DaySummaryLogger::new();
        logger.on_update(&SimulationUpdate::DayStarted { day: 1 }, &world);
        logger.on_update(
            &SimulationUpdate::ActionResolved {
                agent_id: AgentId::new("hero_1"),
                kind: "REST".to_owned(),
            },
            &world,
        );
        logger.on_update(
            &SimulationUpdate::DayEnded {
                summary: DaySummary::default(),
            },
            &world,
        );
        assert_eq!(logger.days_logged(), 1);
    }
}
