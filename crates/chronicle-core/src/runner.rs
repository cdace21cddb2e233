//! Multi-day runner and the update callback.
//!
//! [`Simulation::run`] drives the daily cycle for a fixed number of days.
//! An [`UpdateCallback`] is invoked after every resolved action and at
//! every day boundary; it is the only observability hook external tooling
//! needs.

use tracing::info;

use chronicle_types::{AgentId, WorldState};

use crate::scheduler::{DaySummary, Simulation};

/// Something that happened in the simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulationUpdate {
    /// A new day began.
    DayStarted {
        /// The day number.
        day: u64,
    },
    /// The resolver applied an action.
    ActionResolved {
        /// Who acted.
        agent_id: AgentId,
        /// The action's kind.
        kind: String,
    },
    /// A day finished.
    DayEnded {
        /// What the day did.
        summary: DaySummary,
    },
}

/// Callback invoked as the simulation progresses.
///
/// Receives the update and a read-only view of the world after it.
pub trait UpdateCallback: Send {
    /// Called after every update.
    fn on_update(&mut self, update: &SimulationUpdate, world: &WorldState);
}

/// A callback that ignores every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCallback;

impl UpdateCallback for NoOpCallback {
    fn on_update(&mut self, _update: &SimulationUpdate, _world: &WorldState) {}
}

/// Totals over a multi-day run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Days executed.
    pub days_run: u64,
    /// The world's day counter at the end.
    pub final_day: u64,
    /// Actions resolved over the run.
    pub actions_resolved: u64,
    /// Conversation chains run.
    pub chains: u64,
    /// Days on which the interaction budget ran out.
    pub budget_exhausted_days: u64,
    /// World events started.
    pub events_started: u64,
    /// World stability at the end.
    pub final_stability: f64,
    /// Magic level at the end.
    pub final_magic_level: f64,
    /// Global corruption at the end.
    pub final_corruption: f64,
    /// World log entries held at the end.
    pub log_count: usize,
}

impl Simulation {
    /// Run `days` daily cycles.
    pub async fn run(&mut self, days: u64, callback: &mut dyn UpdateCallback) -> RunSummary {
        info!(
            start_day = self.world.day,
            days,
            agents = self.world.agents.len(),
            providers = self.providers.len(),
            "Simulation starting"
        );

        let mut summary = RunSummary::default();
        for _ in 0..days {
            let day = self.run_day(callback).await;
            summary.days_run = summary.days_run.saturating_add(1);
            summary.actions_resolved = summary
                .actions_resolved
                .saturating_add(u64::from(day.actions_resolved));
            summary.chains = summary.chains.saturating_add(u64::from(day.chains));
            summary.events_started = summary
                .events_started
                .saturating_add(u64::from(day.events_started));
            if day.budget_exhausted {
                summary.budget_exhausted_days = summary.budget_exhausted_days.saturating_add(1);
            }
        }

        summary.final_day = self.world.day;
        summary.final_stability = self.world.world_stability;
        summary.final_magic_level = self.world.magic_level;
        summary.final_corruption = self.world.corruption.global;
        summary.log_count = self.world.logs.len();
        log_simulation_end(&summary);
        summary
    }

    /// Run the number of days named in the configuration.
    pub async fn run_configured(&mut self, callback: &mut dyn UpdateCallback) -> RunSummary {
        let days = self.config.simulation.days;
        self.run(days, callback).await
    }
}

fn log_simulation_end(summary: &RunSummary) {
    info!(
        days_run = summary.days_run,
        final_day = summary.final_day,
        actions = summary.actions_resolved,
        chains = summary.chains,
        budget_exhausted_days = summary.budget_exhausted_days,
        events_started = summary.events_started,
        stability = summary.final_stability,
        magic_level = summary.final_magic_level,
        corruption = summary.final_corruption,
        logs = summary.log_count,
        "Simulation complete"
    );
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chronicle_world::{add_agent, create_starting_world, hero_status};

    use super::*;
    use crate::config::SimulationConfig;
    use crate::decision::StubDecisionProvider;

    #[derive(Default)]
    struct Recorder {
        updates: Vec<SimulationUpdate>,
    }

    impl UpdateCallback for Recorder {
        fn on_update(&mut self, update: &SimulationUpdate, _world: &WorldState) {
            self.updates.push(update.clone());
        }
    }

    #[tokio::test]
    async fn run_reports_every_day_and_action() {
        let mut world = create_starting_world();
        add_agent(
            &mut world,
            hero_status("hero_1", "Phainon", "burden", "city-of-dawn"),
        )
        .unwrap();
        let mut config = SimulationConfig::default();
        config.scheduler.seed = Some(5);
        config.events.enabled = false;
        let mut sim = Simulation::new(world, config).unwrap();
        sim.add_provider(AgentId::new("hero_1"), Box::new(StubDecisionProvider))
            .unwrap();

        let mut recorder = Recorder::default();
        let summary = sim.run(3, &mut recorder).await;

        assert_eq!(summary.days_run, 3);
        assert_eq!(summary.final_day, 3);
        assert_eq!(summary.actions_resolved, 3);
        let starts = recorder
            .updates
            .iter()
            .filter(|u| matches!(u, SimulationUpdate::DayStarted { .. }))
            .count();
        let rests = recorder
            .updates
            .iter()
            .filter(|u| matches!(u, SimulationUpdate::ActionResolved { kind, .. } if kind == "REST"))
            .count();
        assert_eq!(starts, 3);
        assert_eq!(rests, 3);
        assert!(matches!(
            recorder.updates.last(),
            Some(SimulationUpdate::DayEnded { summary }) if summary.day == 3
        ));
    }
}
