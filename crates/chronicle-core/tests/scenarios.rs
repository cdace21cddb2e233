//! End-to-end scenarios driven through the daily cycle with scripted
//! providers.

#![allow(clippy::unwrap_used)]

use std::collections::BTreeMap;
use std::time::Duration;

use chronicle_core::config::EventsConfig;
use chronicle_core::{
    NoOpCallback, ScriptedProvider, Simulation, SimulationConfig, SimulationUpdate, UpdateCallback,
};
use chronicle_types::{
    Action, AgentId, CityId, GatherResource, Importance, TownsfolkRole, WorldState,
};
use chronicle_world::{add_agent, create_starting_world, hero_status, townsfolk_status};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn config() -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.scheduler.seed = Some(42);
    config.events = EventsConfig {
        enabled: false,
        ..EventsConfig::default()
    };
    config
}

fn base_world() -> WorldState {
    let mut world = create_starting_world();
    add_agent(
        &mut world,
        hero_status("hero_1", "Phainon", "burden", "city-of-dawn"),
    )
    .unwrap();
    add_agent(
        &mut world,
        townsfolk_status("npc_1", "Hesper", TownsfolkRole::Merchant, "city-of-dawn"),
    )
    .unwrap();
    world
}

/// A simulation where only `hero_1` acts, replaying `script` once.
fn scripted(world: WorldState, script: Vec<Action>) -> Simulation {
    let mut sim = Simulation::new(world, config()).unwrap();
    sim.add_provider(
        AgentId::new("hero_1"),
        Box::new(ScriptedProvider::new([script])),
    )
    .unwrap();
    sim
}

fn hero(sim: &Simulation) -> &chronicle_types::AgentStatus {
    sim.world().agents.get("hero_1").unwrap()
}

fn npc(sim: &Simulation) -> &chronicle_types::AgentStatus {
    sim.world().agents.get("npc_1").unwrap()
}

fn give(world: &mut WorldState, agent: &str, item: &str, amount: u32) {
    world.agents.get_mut(agent).unwrap().add_item(item, amount);
}

// ---------------------------------------------------------------------------
// Scenario A: gathering from an empty city
// ---------------------------------------------------------------------------

#[tokio::test]
async fn gather_relocates_to_the_richest_city() {
    let mut world = base_world();
    world
        .cities
        .get_mut("city-of-dawn")
        .unwrap()
        .resources
        .materials = 0;
    for (id, city) in &mut world.cities {
        if id.as_str() != "city-of-dawn" {
            city.resources.materials = 5;
        }
    }
    world
        .cities
        .get_mut("ember-forges")
        .unwrap()
        .resources
        .materials = 40;

    let mut sim = scripted(
        world,
        vec![Action::GatherResources {
            resource: GatherResource::Stone,
        }],
    );
    sim.run_day(&mut NoOpCallback).await;

    assert_eq!(hero(&sim).location, CityId::new("ember-forges"));
    assert_eq!(hero(&sim).held("stone"), 10);
    assert!(
        sim.world()
            .logs
            .iter()
            .any(|l| l.tags.iter().any(|t| t == "auto_relocate"))
    );
}

#[tokio::test]
async fn gather_falls_back_when_every_city_is_empty() {
    let mut world = base_world();
    for city in world.cities.values_mut() {
        city.resources.materials = 0;
    }
    let mut sim = scripted(
        world,
        vec![Action::GatherResources {
            resource: GatherResource::Stone,
        }],
    );
    sim.run_day(&mut NoOpCallback).await;

    assert_eq!(hero(&sim).location, CityId::new("city-of-dawn"));
    assert!((1..=3).contains(&hero(&sim).held("stone")));
}

// ---------------------------------------------------------------------------
// Scenario B: gifting
// ---------------------------------------------------------------------------

#[tokio::test]
async fn gift_moves_items_and_resources() {
    let mut world = base_world();
    give(&mut world, "hero_1", "stone_sword", 1);
    give(&mut world, "hero_1", "wood", 2);

    let mut sim = scripted(
        world,
        vec![Action::Gift {
            target_id: AgentId::new("npc_1"),
            items: vec![String::from("stone_sword")],
            resources: BTreeMap::from([(String::from("wood"), 2)]),
            message: None,
        }],
    );
    let wood_before = npc(&sim).held("wood");
    sim.run_day(&mut NoOpCallback).await;

    assert_eq!(hero(&sim).held("stone_sword"), 0);
    assert_eq!(hero(&sim).held("wood"), 0);
    assert_eq!(npc(&sim).held("stone_sword"), 1);
    assert_eq!(npc(&sim).held("wood"), wood_before + 2);

    let gift_logs: Vec<_> = sim
        .world()
        .logs
        .iter()
        .filter(|l| l.tags.iter().any(|t| t == "gift"))
        .collect();
    assert_eq!(gift_logs.len(), 1);
    assert_eq!(gift_logs.first().unwrap().importance, Importance::Medium);
}

// ---------------------------------------------------------------------------
// Scenario C: crafting
// ---------------------------------------------------------------------------

#[tokio::test]
async fn craft_consumes_recipe_materials() {
    let mut world = base_world();
    give(&mut world, "hero_1", "wood", 3);
    let mut sim = scripted(
        world,
        vec![Action::CraftItem {
            item_name: String::from("wooden_shield"),
            materials: BTreeMap::new(),
        }],
    );
    sim.run_day(&mut NoOpCallback).await;

    assert_eq!(hero(&sim).held("wood"), 0);
    assert_eq!(hero(&sim).held("wooden_shield"), 1);
}

// ---------------------------------------------------------------------------
// Action properties
// ---------------------------------------------------------------------------

#[tokio::test]
async fn move_to_unknown_city_changes_nothing() {
    let mut sim = scripted(
        base_world(),
        vec![Action::Move {
            target_city: CityId::new("atlantis"),
        }],
    );
    sim.run_day(&mut NoOpCallback).await;

    assert_eq!(hero(&sim).location, CityId::new("city-of-dawn"));
    assert!(sim.world().logs.iter().any(|l| {
        l.importance == Importance::Low && l.message.contains("tried to MOVE")
    }));
}

#[tokio::test]
async fn attack_damage_and_recoil_follow_the_formula() {
    for power in [0_u32, 7, 45, 60, 500] {
        let mut sim = scripted(
            base_world(),
            vec![Action::Attack {
                target_id: AgentId::new("npc_1"),
                power,
            }],
        );
        let target_before = npc(&sim).hp;
        let attacker_before = hero(&sim).hp;
        sim.run_day(&mut NoOpCallback).await;

        let dealt = power.min(target_before);
        assert_eq!(npc(&sim).hp, target_before - dealt, "power {power}");
        assert_eq!(
            hero(&sim).hp,
            attacker_before.saturating_sub(dealt / 10),
            "power {power}"
        );
    }
}

#[tokio::test]
async fn trade_conserves_goods_or_changes_nothing() {
    for (offer, request) in [(2_u32, 1_u32), (2, 99), (9, 1)] {
        let mut world = base_world();
        give(&mut world, "hero_1", "iron", 3);
        let mut sim = scripted(
            world,
            vec![Action::Trade {
                target_id: AgentId::new("npc_1"),
                offer: BTreeMap::from([(String::from("iron"), offer)]),
                request: BTreeMap::from([(String::from("stone"), request)]),
                message: None,
            }],
        );
        let total = |sim: &Simulation, item: &str| hero(sim).held(item) + npc(sim).held(item);
        let before = (hero(&sim).clone(), npc(&sim).clone());
        let iron_total = total(&sim, "iron");
        let stone_total = total(&sim, "stone");

        sim.run_day(&mut NoOpCallback).await;

        assert_eq!(total(&sim, "iron"), iron_total);
        assert_eq!(total(&sim, "stone"), stone_total);
        let affordable = offer <= 3 && request <= 2;
        if !affordable {
            assert_eq!(hero(&sim).inventory, before.0.inventory);
            assert_eq!(npc(&sim).inventory, before.1.inventory);
        }
    }
}

// ---------------------------------------------------------------------------
// Scheduler properties
// ---------------------------------------------------------------------------

#[tokio::test]
async fn chains_stay_within_the_depth_cap() {
    let mut world = base_world();
    add_agent(
        &mut world,
        hero_status("hero_2", "Mydei", "strife", "city-of-dawn"),
    )
    .unwrap();
    let mut config = config();
    config.scheduler.max_chain_depth = 4;
    let mut sim = Simulation::new(world, config).unwrap();
    let chatter = |to: &str| {
        ScriptedProvider::repeating(vec![Action::Chat {
            target_id: to.to_owned(),
            content: String::from("Tell me more."),
        }])
    };
    sim.add_provider(AgentId::new("hero_1"), Box::new(chatter("Mydei")))
        .unwrap();
    sim.add_provider(AgentId::new("hero_2"), Box::new(chatter("Phainon")))
        .unwrap();

    let summary = sim.run_day(&mut NoOpCallback).await;

    // Two proactive chats, each opening one chain of at most four lines.
    assert_eq!(summary.chains, 2);
    assert!(sim.resolver().comms().len() <= 8);
    assert!(
        sim.world()
            .logs
            .iter()
            .filter(|l| l.tags.iter().any(|t| t == "depthlimit"))
            .count()
            == 2
    );
}

#[tokio::test]
async fn budget_exhaustion_drops_the_rest_of_the_day() {
    let mut world = base_world();
    add_agent(
        &mut world,
        hero_status("hero_2", "Mydei", "strife", "city-of-dawn"),
    )
    .unwrap();
    let mut config = config();
    config.scheduler.interaction_budget = 10;
    let mut sim = Simulation::new(world, config).unwrap();
    for id in ["hero_1", "hero_2"] {
        sim.add_provider(
            AgentId::new(id),
            Box::new(ScriptedProvider::repeating(vec![Action::Forage; 8])),
        )
        .unwrap();
    }

    let summary = sim.run_day(&mut NoOpCallback).await;

    assert!(summary.budget_exhausted);
    assert_eq!(summary.budget_spent, 10);
    assert_eq!(summary.actions_resolved, 10);
    let exhausted: Vec<_> = sim
        .world()
        .logs
        .iter()
        .filter(|l| l.tags.iter().any(|t| t == "budget_exhausted"))
        .collect();
    assert_eq!(exhausted.len(), 1);
    assert_eq!(exhausted.first().unwrap().importance, Importance::Medium);
}

#[tokio::test]
async fn budget_is_checked_before_each_action() {
    let mut config = config();
    config.scheduler.interaction_budget = 3;
    let mut sim = Simulation::new(base_world(), config).unwrap();
    sim.add_provider(
        AgentId::new("hero_1"),
        Box::new(ScriptedProvider::new([vec![
            Action::Forage,
            Action::Chat {
                target_id: "npc_1".to_owned(),
                content: "Any bread left?".to_owned(),
            },
            Action::Forage,
        ]])),
    )
    .unwrap();

    let summary = sim.run_day(&mut NoOpCallback).await;

    // The CHAT runs on the two remaining units; the FORAGE after it does not.
    assert_eq!(summary.actions_resolved, 2);
    assert_eq!(summary.budget_spent, 6);
    assert!(summary.budget_exhausted);
}

#[tokio::test]
async fn slow_providers_fall_back_to_rest() {
    let mut world = base_world();
    world.agents.get_mut("hero_1").unwrap().hp = 50;
    let mut config = config();
    config.scheduler.decision_timeout_ms = 20;
    let mut sim = Simulation::new(world, config).unwrap();
    sim.add_provider(
        AgentId::new("hero_1"),
        Box::new(
            ScriptedProvider::repeating(vec![Action::Forage])
                .with_delay(Duration::from_millis(500)),
        ),
    )
    .unwrap();

    sim.run_day(&mut NoOpCallback).await;

    assert_eq!(hero(&sim).hp, 60);
    assert_eq!(hero(&sim).held("food"), 0);
    assert!(
        sim.world()
            .logs
            .iter()
            .any(|l| l.tags.iter().any(|t| t == "decision_timeout"))
    );
}

/// Checks the retention invariant at every day boundary.
struct RetentionWatch {
    cap: usize,
    violations: Vec<String>,
}

impl UpdateCallback for RetentionWatch {
    fn on_update(&mut self, update: &SimulationUpdate, world: &WorldState) {
        if let SimulationUpdate::DayEnded { summary } = update {
            if world.logs.len() > self.cap {
                self.violations
                    .push(format!("day {}: {} entries", summary.day, world.logs.len()));
            }
            for day in 1..=summary.day {
                let begins = format!("Day {day} begins");
                if !world.logs.iter().any(|l| l.message == begins) {
                    self.violations.push(format!("day {}: lost {begins}", summary.day));
                }
            }
        }
    }
}

#[tokio::test]
async fn retention_keeps_the_cap_and_protected_entries() {
    let mut config = config();
    config.retention.max_logs = 30;
    config.retention.recent_fraction_percent = 50;
    let mut sim = Simulation::new(base_world(), config).unwrap();
    sim.add_provider(
        AgentId::new("hero_1"),
        Box::new(ScriptedProvider::repeating(vec![Action::Forage; 4])),
    )
    .unwrap();
    sim.add_provider(
        AgentId::new("npc_1"),
        Box::new(ScriptedProvider::repeating(vec![Action::Rest; 4])),
    )
    .unwrap();

    let mut watch = RetentionWatch {
        cap: 30,
        violations: Vec::new(),
    };
    let summary = sim.run(6, &mut watch).await;

    assert!(watch.violations.is_empty(), "{:?}", watch.violations);
    assert!(summary.log_count <= 30);
    let sequences: Vec<u64> = sim.world().logs.iter().map(|l| l.sequence).collect();
    assert!(sequences.windows(2).all(|w| w.first() < w.last()));
}
