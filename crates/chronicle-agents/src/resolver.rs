//! The action resolver: the only writer of agent-driven world mutations.
//!
//! [`Resolver::apply`] takes one action and the acting agent's id, validates
//! it, mutates the world, and appends exactly one summary log entry. It
//! never fails: a missing actor, a rejected action, or an unhandled kind is
//! logged at low importance and otherwise ignored. The returned string is a
//! synchronous result for the actor (an inspection report, or a hint after
//! a failed MOVE or INSPECT); every other outcome is observable only
//! through the world and its log.

use rand::Rng;
use serde_json::json;
use tracing::{debug, info};

use chronicle_types::{Action, AgentId, Channel, Importance, LogDraft, LogKind, WorldState};

use crate::actions::handlers::{self, Outcome};
use crate::actions::validation::{Rejection, validate_action};
use crate::communication::CommsChannel;
use crate::matcher;

/// First tag on every resolver log entry.
pub const ACTION_TAG: &str = "agent_action";

/// Applies actions to the world and routes chat through the comms channel.
#[derive(Debug, Default)]
pub struct Resolver {
    comms: CommsChannel,
}

impl Resolver {
    /// A resolver delivering chat through `comms`.
    pub const fn new(comms: CommsChannel) -> Self {
        Self { comms }
    }

    /// The communication channel chat is delivered through.
    pub const fn comms(&self) -> &CommsChannel {
        &self.comms
    }

    /// Mutable access to the channel, for subscribing agents.
    pub const fn comms_mut(&mut self) -> &mut CommsChannel {
        &mut self.comms
    }

    /// Apply one action taken by `actor`.
    pub fn apply(
        &mut self,
        world: &mut WorldState,
        actor: &AgentId,
        action: &Action,
        rng: &mut impl Rng,
    ) -> Option<String> {
        let kind = action.kind().to_owned();

        if let Some((importance, message, parameters)) = handlers::handle_generator_action(action) {
            world.push_log(
                LogDraft::new(LogKind::Event, importance, message)
                    .tag("world_event")
                    .tag(kind.to_ascii_lowercase())
                    .metadata(parameters),
            );
            return None;
        }

        let Some(status) = world.agents.get(actor.as_str()) else {
            world.push_log(
                LogDraft::new(
                    LogKind::Action,
                    Importance::Low,
                    format!("Unknown agent {actor} tried to {kind}"),
                )
                .tag(ACTION_TAG)
                .tag("unknown_agent"),
            );
            return None;
        };

        if let Action::Unhandled { payload, .. } = action {
            let draft = LogDraft::new(
                LogKind::Action,
                Importance::Low,
                format!("{} attempted an unhandled action: {kind}", status.name),
            )
            .agent(actor)
            .location(&status.location)
            .tag(ACTION_TAG)
            .tag("unhandled")
            .metadata(payload.clone());
            world.push_log(draft);
            return None;
        }

        if let Err(rejection) = validate_action(world, status, action) {
            let reply = rejection_reply(world, action, &rejection);
            let draft = LogDraft::new(
                LogKind::Action,
                Importance::Low,
                format!("{} tried to {kind} but {rejection}", status.name),
            )
            .agent(actor)
            .location(&status.location)
            .tag(ACTION_TAG)
            .tag(kind.to_ascii_lowercase())
            .tag("rejected");
            debug!(agent_id = %actor, kind = %kind, reason = %rejection, "Action rejected");
            world.push_log(draft);
            return reply;
        }

        let outcome = self.execute(world, actor, action, rng);

        let location = world
            .agents
            .get(actor.as_str())
            .map(|s| s.location.clone());
        let mut draft = LogDraft::new(LogKind::Action, outcome.importance, outcome.message)
            .agent(actor)
            .tag(ACTION_TAG)
            .tag(kind.to_ascii_lowercase());
        if let Some(location) = &location {
            draft = draft.location(location);
        }
        for tag in outcome.tags {
            draft = draft.tag(tag);
        }
        if let Some(metadata) = outcome.metadata {
            draft = draft.metadata(metadata);
        }
        let sequence = world.push_log(draft);
        info!(day = world.day, agent_id = %actor, kind = %kind, sequence, "Action applied");

        outcome.reply
    }

    fn execute(
        &mut self,
        world: &mut WorldState,
        actor: &AgentId,
        action: &Action,
        rng: &mut impl Rng,
    ) -> Outcome {
        match action {
            Action::Move { target_city } => handlers::handle_move(world, actor, target_city),
            Action::Inspect { target_id } => handlers::handle_inspect(world, actor, target_id),
            Action::Chat { target_id, content } => self.deliver_chat(world, actor, target_id, content),
            Action::Negotiate {
                target_id,
                proposal,
            } => handlers::handle_negotiate(world, actor, target_id, proposal),
            Action::FormAlliance { target_id } => {
                handlers::handle_form_alliance(world, actor, target_id)
            }
            Action::Attack { target_id, power } => {
                handlers::handle_attack(world, actor, target_id, *power)
            }
            Action::BuildDefense {
                city_id,
                defense_type,
            } => handlers::handle_build_defense(world, actor, city_id, *defense_type),
            Action::Forage => handlers::handle_forage(world, actor, rng),
            Action::GatherResources { resource } => {
                handlers::handle_gather(world, actor, *resource, rng)
            }
            Action::CraftItem {
                item_name,
                materials,
            } => handlers::handle_craft(world, actor, item_name, materials),
            Action::Trade {
                target_id,
                offer,
                request,
                ..
            } => handlers::handle_trade(world, actor, target_id, offer, request),
            Action::Gift {
                target_id,
                items,
                resources,
                message,
            } => handlers::handle_gift(
                world,
                actor,
                target_id,
                items,
                resources,
                message.as_deref(),
            ),
            Action::CleanseCorruption { area_id, power } => {
                handlers::handle_cleanse(world, actor, area_id, *power)
            }
            Action::Rest => handlers::handle_rest(world, actor),
            Action::UseAbility {
                ability_name,
                target_id,
                payload,
            } => handlers::handle_use_ability(
                world,
                actor,
                ability_name,
                target_id.as_deref(),
                payload.as_ref(),
            ),
            Action::Special { name, payload } => handlers::handle_special(world, actor, name, payload),
            Action::WorldEvent { .. }
            | Action::EnvironmentChange { .. }
            | Action::Unhandled { .. } => Outcome {
                importance: Importance::Low,
                message: format!("{} was not executed", action.kind()),
                tags: Vec::new(),
                metadata: None,
                reply: None,
            },
        }
    }

    /// Deliver a chat line to the addressee's direct channel.
    fn deliver_chat(
        &mut self,
        world: &WorldState,
        actor: &AgentId,
        reference: &str,
        content: &str,
    ) -> Outcome {
        let speaker = world.agent_name(actor.as_str());
        let Some(target) = matcher::find_agent(world, reference) else {
            return Outcome {
                importance: Importance::Low,
                message: format!("{speaker} spoke to no one: {reference} does not exist"),
                tags: Vec::new(),
                metadata: None,
                reply: None,
            };
        };
        let delivered = self
            .comms
            .send_message(actor, Channel::Direct(target.id.clone()), content);
        Outcome {
            importance: Importance::Medium,
            message: format!("{speaker} said to {}: \"{content}\"", target.name),
            tags: vec!["chat_action"],
            metadata: Some(json!({ "targetId": target.id, "delivered": delivered })),
            reply: None,
        }
    }
}

/// The hint handed back to the actor after a rejected action.
fn rejection_reply(world: &WorldState, action: &Action, rejection: &Rejection) -> Option<String> {
    match (action, rejection) {
        (Action::Move { target_city }, Rejection::UnknownCity(_)) => {
            let valid: Vec<&str> = world.cities.keys().map(|c| c.as_str()).collect();
            Some(format!(
                "Cannot move to {target_city}. Valid cities: {}",
                valid.join(", ")
            ))
        }
        (Action::Inspect { .. }, Rejection::UnknownAgent(id)) => Some(format!("{id} does not exist")),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    use chronicle_types::{
        AreaId, ArchetypeProfile, ChatMessage, CityId, CityResource, DefenseType, EmberId,
        GatherResource, TownsfolkRole,
    };
    use chronicle_world::{
        add_agent, create_starting_world, guardian_status, hero_status, townsfolk_status,
    };
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn world() -> WorldState {
        let mut world = create_starting_world();
        add_agent(
            &mut world,
            hero_status("hero_1", "Phainon", "burden", "city-of-dawn"),
        )
        .unwrap();
        add_agent(
            &mut world,
            townsfolk_status("npc_1", "Mira", TownsfolkRole::Merchant, "city-of-dawn"),
        )
        .unwrap();
        world
    }

    fn apply(world: &mut WorldState, actor: &str, action: Action) -> Option<String> {
        let mut resolver = Resolver::default();
        let mut rng = SmallRng::seed_from_u64(7);
        resolver.apply(world, &AgentId::new(actor), &action, &mut rng)
    }

    fn last_log(world: &WorldState) -> &chronicle_types::LogEntry {
        world.logs.last().unwrap()
    }

    #[test]
    fn failed_move_leaves_location_and_lists_cities() {
        let mut world = world();
        let before = world.logs.len();
        let reply = apply(
            &mut world,
            "hero_1",
            Action::Move {
                target_city: CityId::new("atlantis"),
            },
        )
        .unwrap();
        assert!(reply.contains("city-of-dawn"));
        assert_eq!(
            world.agents.get("hero_1").unwrap().location,
            CityId::new("city-of-dawn")
        );
        assert_eq!(world.logs.len(), before + 1);
        let log = last_log(&world);
        assert_eq!(log.importance, Importance::Low);
        assert_eq!(log.message, "Phainon tried to MOVE but city atlantis does not exist");
    }

    #[test]
    fn successful_move_relocates() {
        let mut world = world();
        assert!(apply(
            &mut world,
            "hero_1",
            Action::Move {
                target_city: CityId::new("mystic-grove"),
            },
        )
        .is_none());
        assert_eq!(
            world.agents.get("hero_1").unwrap().location,
            CityId::new("mystic-grove")
        );
        let log = last_log(&world);
        assert_eq!(log.importance, Importance::Medium);
        assert_eq!(log.tags, vec!["agent_action", "move"]);
        assert_eq!(log.location, Some(CityId::new("mystic-grove")));
    }

    #[test]
    fn attack_applies_damage_and_recoil() {
        let mut world = world();
        apply(
            &mut world,
            "hero_1",
            Action::Attack {
                target_id: AgentId::new("npc_1"),
                power: 45,
            },
        );
        assert_eq!(world.agents.get("npc_1").unwrap().hp, 15);
        assert_eq!(world.agents.get("hero_1").unwrap().hp, 96);
    }

    #[test]
    fn attack_to_zero_logs_defeat_without_removal() {
        let mut world = world();
        apply(
            &mut world,
            "hero_1",
            Action::Attack {
                target_id: AgentId::new("npc_1"),
                power: 500,
            },
        );
        let target = world.agents.get("npc_1").unwrap();
        assert_eq!(target.hp, 0);
        assert_eq!(world.agents.get("hero_1").unwrap().hp, 94);
        assert!(world.logs.iter().any(|l| l.kind == LogKind::Death));
    }

    #[test]
    fn hero_defeating_guardian_claims_ember() {
        let mut world = world();
        let ember = EmberId::new("ember-1");
        add_agent(
            &mut world,
            guardian_status("guardian_1", "Kronos", "time", "city-of-dawn", Some(&ember)),
        )
        .unwrap();
        world.agents.get_mut("guardian_1").unwrap().hp = 5;

        apply(
            &mut world,
            "hero_1",
            Action::Attack {
                target_id: AgentId::new("guardian_1"),
                power: 25,
            },
        );
        assert!(world.embers.embers.get(&ember).unwrap().collected);
        match &world.agents.get("hero_1").unwrap().profile {
            ArchetypeProfile::Hero {
                embers_collected, ..
            } => assert_eq!(embers_collected, &vec![ember.clone()]),
            other => panic!("Expected hero profile, got {other:?}"),
        }
        assert!(world.logs.iter().any(|l| l.kind == LogKind::GuardianDefeat));
        assert!(world.logs.iter().any(|l| l.kind == LogKind::EmberCollection));
    }

    #[test]
    fn trade_conserves_totals() {
        let mut world = world();
        world.agents.get_mut("hero_1").unwrap().add_item("wood", 4);
        let total = |w: &WorldState, item: &str| {
            w.agents.get("hero_1").unwrap().held(item) + w.agents.get("npc_1").unwrap().held(item)
        };
        let (wood, coins) = (total(&world, "wood"), total(&world, "coins"));

        apply(
            &mut world,
            "hero_1",
            Action::Trade {
                target_id: AgentId::new("npc_1"),
                offer: BTreeMap::from([(String::from("wood"), 2)]),
                request: BTreeMap::from([(String::from("coins"), 20)]),
                message: None,
            },
        );
        assert_eq!(world.agents.get("hero_1").unwrap().held("coins"), 20);
        assert_eq!(total(&world, "wood"), wood);
        assert_eq!(total(&world, "coins"), coins);
    }

    #[test]
    fn rejected_trade_moves_nothing() {
        let mut world = world();
        world.agents.get_mut("hero_1").unwrap().add_item("wood", 4);
        let before = world.agents.clone();
        apply(
            &mut world,
            "hero_1",
            Action::Trade {
                target_id: AgentId::new("npc_1"),
                offer: BTreeMap::from([(String::from("wood"), 2)]),
                request: BTreeMap::from([(String::from("coins"), 999)]),
                message: None,
            },
        );
        assert_eq!(world.agents, before);
        assert_eq!(last_log(&world).importance, Importance::Low);
    }

    #[test]
    fn rest_heals_up_to_max() {
        let mut world = world();
        world.agents.get_mut("hero_1").unwrap().hp = 95;
        apply(&mut world, "hero_1", Action::Rest);
        assert_eq!(world.agents.get("hero_1").unwrap().hp, 100);
    }

    #[test]
    fn cleanse_reduces_level_and_costs_hp() {
        let mut world = world();
        let area_id = AreaId::new("corrupted-plains");
        let level = world.corruption.areas.get(&area_id).unwrap().level;
        apply(
            &mut world,
            "hero_1",
            Action::CleanseCorruption {
                area_id: area_id.clone(),
                power: 250,
            },
        );
        let after = world.corruption.areas.get(&area_id).unwrap().level;
        assert!((level - after - 2.5).abs() < 1e-9);
        assert_eq!(world.agents.get("hero_1").unwrap().hp, 75);
    }

    #[test]
    fn gather_relocates_to_richest_city() {
        let mut world = world();
        for city in world.cities.values_mut() {
            *city.resources.amount_mut(CityResource::Materials) = 0;
        }
        *world
            .cities
            .get_mut("mystic-grove")
            .unwrap()
            .resources
            .amount_mut(CityResource::Materials) = 4;

        apply(
            &mut world,
            "hero_1",
            Action::GatherResources {
                resource: GatherResource::Stone,
            },
        );
        let hero = world.agents.get("hero_1").unwrap();
        assert_eq!(hero.location, CityId::new("mystic-grove"));
        assert_eq!(hero.held("stone"), 4);
        assert!(
            world
                .logs
                .iter()
                .any(|l| l.tags.iter().any(|t| t == "auto_relocate"))
        );
    }

    #[test]
    fn build_defense_raises_rating() {
        let mut world = world();
        let city = CityId::new("city-of-dawn");
        let before = world.cities.get(&city).unwrap().defenses.walls;
        apply(
            &mut world,
            "hero_1",
            Action::BuildDefense {
                city_id: city.clone(),
                defense_type: DefenseType::Wall,
            },
        );
        let defenses = &world.cities.get(&city).unwrap().defenses;
        assert_eq!(defenses.walls, before + 1);
        assert!(defenses.total_defense_rating >= 10);
    }

    #[test]
    fn alliance_is_mutual() {
        let mut world = world();
        apply(
            &mut world,
            "hero_1",
            Action::FormAlliance {
                target_id: AgentId::new("npc_1"),
            },
        );
        assert_eq!(
            world.agents.get("hero_1").unwrap().allies,
            vec![AgentId::new("npc_1")]
        );
        assert_eq!(
            world.agents.get("npc_1").unwrap().allies,
            vec![AgentId::new("hero_1")]
        );
    }

    #[test]
    fn inspect_hides_social_fields() {
        let mut world = world();
        let reply = apply(
            &mut world,
            "hero_1",
            Action::Inspect {
                target_id: AgentId::new("npc_1"),
            },
        )
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&reply).unwrap();
        assert_eq!(value["name"], "Mira");
        assert!(value.get("allies").is_none());
        assert!(value.get("relationships").is_none());

        let missing = apply(
            &mut world,
            "hero_1",
            Action::Inspect {
                target_id: AgentId::new("ghost"),
            },
        );
        assert_eq!(missing.as_deref(), Some("ghost does not exist"));
    }

    #[test]
    fn chat_is_delivered_to_fuzzy_target() {
        let mut world = world();
        let inbox = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&inbox);
        let mut resolver = Resolver::default();
        resolver.comms_mut().subscribe(
            AgentId::new("npc_1"),
            Box::new(move |m: &ChatMessage| sink.lock().unwrap().push(m.content.clone())),
        );
        let mut rng = SmallRng::seed_from_u64(1);
        resolver.apply(
            &mut world,
            &AgentId::new("hero_1"),
            &Action::Chat {
                target_id: String::from("mira"),
                content: String::from("Any news?"),
            },
            &mut rng,
        );
        assert_eq!(inbox.lock().unwrap().as_slice(), ["Any news?"]);
        let log = last_log(&world);
        assert!(log.tags.iter().any(|t| t == "chat_action"));
        assert_eq!(resolver.comms().len(), 1);
    }

    #[test]
    fn unknown_actor_and_unhandled_kinds_are_logged() {
        let mut world = world();
        assert!(apply(&mut world, "nobody", Action::Rest).is_none());
        assert_eq!(last_log(&world).importance, Importance::Low);

        let dance = Action::from_json(&json!({"type": "DANCE"}));
        apply(&mut world, "hero_1", dance);
        assert!(last_log(&world).tags.iter().any(|t| t == "unhandled"));
    }

    #[test]
    fn generator_actions_need_no_actor() {
        let mut world = world();
        apply(
            &mut world,
            "world_event_generator",
            Action::WorldEvent {
                target: String::from("all_cities"),
                parameters: json!({"description": "A magic storm rolls in"}),
            },
        );
        let log = last_log(&world);
        assert_eq!(log.kind, LogKind::Event);
        assert_eq!(log.importance, Importance::High);
        assert_eq!(log.message, "World event: A magic storm rolls in");
    }
}
