//! Execution handlers for validated actions.
//!
//! Each handler assumes the action already passed
//! [`validate_action`](super::validation::validate_action) and applies its
//! side effects to the world. Handlers return an [`Outcome`] describing the
//! single summary log entry the resolver appends; secondary narrative
//! entries (defeats, ember collections, relocations) are pushed directly.

use std::collections::BTreeMap;

use rand::Rng;
use serde_json::{Value, json};
use tracing::debug;

use chronicle_types::{
    Action, AgentId, ArchetypeProfile, AreaId, CityId, DefenseType, GatherResource, Importance,
    LogDraft, LogKind, WorldState,
};

use crate::crafting::{self, format_quantities};

use super::validation::{gift_bundle, non_zero};

/// hp recovered by one REST.
pub const REST_HEAL: u32 = 10;

/// Upper bound on units drawn by one GATHER_RESOURCES.
pub const GATHER_YIELD_CAP: u32 = 10;

/// Percentage of dealt damage an attacker takes back as recoil.
pub const RECOIL_PERCENT: u32 = 10;

/// The summary of one executed action.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// Log importance of the summary entry.
    pub importance: Importance,
    /// Human-readable summary.
    pub message: String,
    /// Tags appended after `agent_action` and the kind tag.
    pub tags: Vec<&'static str>,
    /// Structured details for the log entry.
    pub metadata: Option<Value>,
    /// Synchronous textual result handed back to the actor.
    pub reply: Option<String>,
}

impl Outcome {
    fn medium(message: impl Into<String>) -> Self {
        Self {
            importance: Importance::Medium,
            message: message.into(),
            tags: Vec::new(),
            metadata: None,
            reply: None,
        }
    }

    fn low(message: impl Into<String>) -> Self {
        Self {
            importance: Importance::Low,
            ..Self::medium(message)
        }
    }

    fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

// ---------------------------------------------------------------------------
// Movement and inspection
// ---------------------------------------------------------------------------

/// Relocate the actor.
pub fn handle_move(world: &mut WorldState, actor: &AgentId, target_city: &CityId) -> Outcome {
    let city_name = world
        .cities
        .get(target_city)
        .map_or_else(|| target_city.to_string(), |c| c.name.clone());
    let Some(status) = world.agents.get_mut(actor.as_str()) else {
        return Outcome::low(format!("{actor} could not be found"));
    };
    let from = std::mem::replace(&mut status.location, target_city.clone());
    Outcome::medium(format!("{} traveled from {from} to {city_name}", status.name))
        .with_metadata(json!({ "from": from, "to": target_city }))
}

/// Describe another agent's status to the actor.
///
/// Social bookkeeping (allies, relationships, a guardian's respect for
/// challengers) is withheld from the rendering.
pub fn handle_inspect(world: &WorldState, actor: &AgentId, target_id: &AgentId) -> Outcome {
    let Some(target) = world.agents.get(target_id.as_str()) else {
        return Outcome::low(format!("{target_id} does not exist"));
    };
    let mut rendered = serde_json::to_value(target).unwrap_or(Value::Null);
    if let Some(object) = rendered.as_object_mut() {
        object.remove("allies");
        object.remove("relationships");
        if let Some(profile) = object.get_mut("profile").and_then(Value::as_object_mut) {
            profile.remove("respect_for_challengers");
        }
    }
    let reply = rendered.to_string();
    Outcome {
        reply: Some(reply),
        ..Outcome::medium(format!(
            "{} inspected {}",
            world.agent_name(actor.as_str()),
            target.name
        ))
    }
}

// ---------------------------------------------------------------------------
// Social
// ---------------------------------------------------------------------------

/// Record a proposal. No state changes.
pub fn handle_negotiate(
    world: &WorldState,
    actor: &AgentId,
    target_id: &AgentId,
    proposal: &str,
) -> Outcome {
    Outcome::medium(format!(
        "{} proposed to {}: \"{proposal}\"",
        world.agent_name(actor.as_str()),
        world.agent_name(target_id.as_str())
    ))
}

/// Make both parties allies of each other.
pub fn handle_form_alliance(world: &mut WorldState, actor: &AgentId, target_id: &AgentId) -> Outcome {
    if let Some(status) = world.agents.get_mut(actor.as_str()) {
        status.add_ally(target_id);
    }
    if let Some(status) = world.agents.get_mut(target_id.as_str()) {
        status.add_ally(actor);
    }
    Outcome::medium(format!(
        "{} formed an alliance with {}",
        world.agent_name(actor.as_str()),
        world.agent_name(target_id.as_str())
    ))
}

// ---------------------------------------------------------------------------
// Combat
// ---------------------------------------------------------------------------

/// Deal `min(power, hp)` damage and take a tenth of it back as recoil.
///
/// A target driven to 0 hp stays in the world; a death entry is logged. A
/// hero who fells a guardian claims the ember it kept.
pub fn handle_attack(
    world: &mut WorldState,
    actor: &AgentId,
    target_id: &AgentId,
    power: u32,
) -> Outcome {
    let Some(target) = world.agents.get_mut(target_id.as_str()) else {
        return Outcome::low(format!("{target_id} does not exist"));
    };
    let was_standing = target.hp > 0;
    let damage = target.take_damage(power);
    let target_hp = target.hp;
    let target_name = target.name.clone();
    let target_location = target.location.clone();

    let recoil = damage.saturating_mul(RECOIL_PERCENT) / 100;
    let attacker_name = match world.agents.get_mut(actor.as_str()) {
        Some(attacker) => {
            attacker.take_damage(recoil);
            attacker.name.clone()
        }
        None => actor.to_string(),
    };

    debug!(attacker = %actor, target = %target_id, damage, recoil, "Attack resolved");

    if was_standing && target_hp == 0 {
        world.push_log(
            LogDraft::new(
                LogKind::Death,
                Importance::High,
                format!("{target_name} was defeated by {attacker_name}"),
            )
            .agent(target_id)
            .location(&target_location)
            .tag("death"),
        );
        claim_guardian_ember(world, actor, target_id);
    }

    Outcome::medium(format!(
        "{attacker_name} attacked {target_name} for {damage} damage ({target_name} now at {target_hp} hp)"
    ))
    .with_metadata(json!({ "damage": damage, "recoil": recoil, "targetHp": target_hp }))
}

/// Transfer a defeated guardian's ember to the hero who defeated it.
fn claim_guardian_ember(world: &mut WorldState, hero: &AgentId, guardian: &AgentId) {
    let is_hero = matches!(
        world.agents.get(hero.as_str()).map(|s| &s.profile),
        Some(ArchetypeProfile::Hero { .. })
    );
    let ember_id = match world.agents.get(guardian.as_str()).map(|s| &s.profile) {
        Some(ArchetypeProfile::Guardian { ember_guarded, .. }) => ember_guarded.clone(),
        _ => return,
    };
    if !is_hero {
        return;
    }

    let hero_name = world.agent_name(hero.as_str()).to_owned();
    let guardian_name = world.agent_name(guardian.as_str()).to_owned();
    world.push_log(
        LogDraft::new(
            LogKind::GuardianDefeat,
            Importance::Critical,
            format!("{hero_name} has overcome the guardian {guardian_name}"),
        )
        .agent(hero)
        .tag("guardian_defeat"),
    );

    let Some(ember_id) = ember_id else {
        return;
    };
    let Some(ember) = world.embers.embers.get_mut(&ember_id) else {
        return;
    };
    if ember.collected {
        return;
    }
    ember.collected = true;
    ember.collector = Some(hero.clone());
    let ember_name = ember.name.clone();

    if let Some(status) = world.agents.get_mut(hero.as_str())
        && let ArchetypeProfile::Hero {
            embers_collected, ..
        } = &mut status.profile
    {
        embers_collected.push(ember_id.clone());
    }
    let collected = world.embers.collected_count();
    let total = world.embers.total;
    world.push_log(
        LogDraft::new(
            LogKind::EmberCollection,
            Importance::Critical,
            format!("{hero_name} claimed {ember_name} ({collected}/{total} embers collected)"),
        )
        .agent(hero)
        .tag("ember_collection")
        .metadata(json!({ "emberId": ember_id })),
    );
}

/// Spend effort to lower an area's corruption at a cost in hp.
pub fn handle_cleanse(
    world: &mut WorldState,
    actor: &AgentId,
    area_id: &AreaId,
    power: u32,
) -> Outcome {
    let Some(area) = world.corruption.areas.get_mut(area_id) else {
        return Outcome::low(format!("area {area_id} does not exist"));
    };
    let effect = (f64::from(power) / 100.0).min(area.level);
    area.level = (area.level - effect).max(0.0);
    let remaining = area.level;
    let area_name = area.name.clone();
    world.corruption.recompute_global();

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let cost = (effect * 10.0).floor().max(0.0) as u32;
    let (name, lost) = world
        .agents
        .get_mut(actor.as_str())
        .map_or_else(|| (actor.to_string(), 0), |s| (s.name.clone(), s.take_damage(cost)));

    Outcome::medium(format!(
        "{name} cleansed {effect:.2} corruption from {area_name} at the cost of {lost} hp ({remaining:.1} remains)"
    ))
    .with_metadata(json!({ "effect": effect, "hpCost": lost, "remaining": remaining }))
}

// ---------------------------------------------------------------------------
// Survival and economy
// ---------------------------------------------------------------------------

/// Recover [`REST_HEAL`] hp, never beyond `max_hp`.
pub fn handle_rest(world: &mut WorldState, actor: &AgentId) -> Outcome {
    let Some(status) = world.agents.get_mut(actor.as_str()) else {
        return Outcome::low(format!("{actor} could not be found"));
    };
    let gained = status.heal(REST_HEAL);
    Outcome::medium(format!(
        "{} rested and recovered {gained} hp ({}/{})",
        status.name, status.hp, status.max_hp
    ))
}

/// Find 1 to 5 food.
pub fn handle_forage(world: &mut WorldState, actor: &AgentId, rng: &mut impl Rng) -> Outcome {
    let Some(status) = world.agents.get_mut(actor.as_str()) else {
        return Outcome::low(format!("{actor} could not be found"));
    };
    let found: u32 = rng.random_range(1..=5);
    status.add_item("food", found);
    Outcome::medium(format!("{} foraged and found {found} food", status.name))
}

/// Draw a resource from a city's stock.
///
/// The actor's own city is preferred. Otherwise the city holding the most
/// of the pool is chosen and the actor travels there first. When no city
/// has any, the actor scrounges 1 to 3 units instead.
pub fn handle_gather(
    world: &mut WorldState,
    actor: &AgentId,
    resource: GatherResource,
    rng: &mut impl Rng,
) -> Outcome {
    let pool = resource.pool();
    let key = resource.inventory_key();
    let Some(location) = world.agents.get(actor.as_str()).map(|s| s.location.clone()) else {
        return Outcome::low(format!("{actor} could not be found"));
    };
    let name = world.agent_name(actor.as_str()).to_owned();

    let local_stock = world
        .cities
        .get(&location)
        .map_or(0, |c| c.resources.amount(pool));

    let source = if local_stock > 0 {
        Some(location.clone())
    } else {
        let mut best: Option<(&CityId, u32)> = None;
        for (id, city) in &world.cities {
            let stock = city.resources.amount(pool);
            if stock > 0 && best.is_none_or(|(_, top)| stock > top) {
                best = Some((id, stock));
            }
        }
        best.map(|(id, _)| id.clone())
    };

    let Some(source) = source else {
        let scrounged: u32 = rng.random_range(1..=3);
        if let Some(status) = world.agents.get_mut(actor.as_str()) {
            status.add_item(key, scrounged);
        }
        return Outcome::low(format!(
            "{name} found no {pool} in any city and scrounged {scrounged} {key}"
        ))
        .with_metadata(json!({ "fallback": true, "amount": scrounged }));
    };

    if source != location {
        if let Some(status) = world.agents.get_mut(actor.as_str()) {
            status.location = source.clone();
        }
        world.push_log(
            LogDraft::new(
                LogKind::Action,
                Importance::Low,
                format!("{name} traveled from {location} to {source} in search of {key}"),
            )
            .agent(actor)
            .location(&source)
            .tag("agent_action")
            .tag("auto_relocate"),
        );
    }

    let Some(city) = world.cities.get_mut(&source) else {
        return Outcome::low(format!("city {source} does not exist"));
    };
    let stock = city.resources.amount_mut(pool);
    let gathered = (*stock).min(GATHER_YIELD_CAP);
    *stock = stock.saturating_sub(gathered);
    let city_name = city.name.clone();
    if let Some(status) = world.agents.get_mut(actor.as_str()) {
        status.add_item(key, gathered);
    }
    Outcome::medium(format!("{name} gathered {gathered} {key} in {city_name}"))
        .with_metadata(json!({ "source": source, "amount": gathered }))
}

/// Consume materials and add the recipe's output.
pub fn handle_craft(
    world: &mut WorldState,
    actor: &AgentId,
    item_name: &str,
    materials: &BTreeMap<String, u32>,
) -> Outcome {
    let Some(recipe) = chronicle_world::get_recipe(item_name) else {
        return Outcome::low(format!("there is no recipe for {item_name}"));
    };
    let Some(status) = world.agents.get_mut(actor.as_str()) else {
        return Outcome::low(format!("{actor} could not be found"));
    };
    let consumed = crafting::resolve_materials(recipe, materials);
    for (item, &quantity) in &consumed {
        status.remove_item(item, quantity);
    }
    status.add_item(&recipe.output.item, recipe.output.quantity);
    Outcome::medium(format!(
        "{} crafted {} {} from {}",
        status.name,
        recipe.output.quantity,
        recipe.output.item,
        format_quantities(&consumed)
    ))
}

/// Swap the offer and the request between two co-located agents.
pub fn handle_trade(
    world: &mut WorldState,
    actor: &AgentId,
    target_id: &AgentId,
    offer: &BTreeMap<String, u32>,
    request: &BTreeMap<String, u32>,
) -> Outcome {
    let offer = non_zero(offer);
    let request = non_zero(request);
    transfer(world, actor, target_id, &offer);
    transfer(world, target_id, actor, &request);
    Outcome::medium(format!(
        "{} traded {} to {} for {}",
        world.agent_name(actor.as_str()),
        describe(&offer),
        world.agent_name(target_id.as_str()),
        describe(&request)
    ))
    .with_metadata(json!({ "offer": offer, "request": request }))
}

/// Hand items and resources to a co-located agent.
pub fn handle_gift(
    world: &mut WorldState,
    actor: &AgentId,
    target_id: &AgentId,
    items: &[String],
    resources: &BTreeMap<String, u32>,
    message: Option<&str>,
) -> Outcome {
    let bundle = gift_bundle(items, resources);
    transfer(world, actor, target_id, &bundle);
    let note = message.map(|m| format!(" with a note: \"{m}\"")).unwrap_or_default();
    Outcome::medium(format!(
        "{} gave {} to {}{note}",
        world.agent_name(actor.as_str()),
        format_quantities(&bundle),
        world.agent_name(target_id.as_str())
    ))
    .with_metadata(json!({ "given": bundle }))
}

/// Move validated quantities between inventories.
fn transfer(
    world: &mut WorldState,
    from: &AgentId,
    to: &AgentId,
    quantities: &BTreeMap<String, u32>,
) {
    let mut moved = BTreeMap::new();
    if let Some(giver) = world.agents.get_mut(from.as_str()) {
        for (item, &quantity) in quantities {
            if giver.remove_item(item, quantity) {
                moved.insert(item.clone(), quantity);
            }
        }
    }
    if let Some(receiver) = world.agents.get_mut(to.as_str()) {
        for (item, &quantity) in &moved {
            receiver.add_item(item, quantity);
        }
    }
}

fn describe(quantities: &BTreeMap<String, u32>) -> String {
    if quantities.is_empty() {
        String::from("nothing")
    } else {
        format_quantities(quantities)
    }
}

/// Add a wall or watchtower and recompute the city's defense rating.
pub fn handle_build_defense(
    world: &mut WorldState,
    actor: &AgentId,
    city_id: &CityId,
    defense_type: DefenseType,
) -> Outcome {
    let name = world.agent_name(actor.as_str()).to_owned();
    let Some(city) = world.cities.get_mut(city_id) else {
        return Outcome::low(format!("city {city_id} does not exist"));
    };
    let structure = match defense_type {
        DefenseType::Wall => {
            city.defenses.walls = city.defenses.walls.saturating_add(1);
            "a wall"
        }
        DefenseType::Watchtower => {
            city.defenses.watchtowers = city.defenses.watchtowers.saturating_add(1);
            "a watchtower"
        }
    };
    city.defenses.recompute_rating();
    Outcome::medium(format!(
        "{name} built {structure} in {} (defense rating {})",
        city.name, city.defenses.total_defense_rating
    ))
}

// ---------------------------------------------------------------------------
// Narrative-only kinds
// ---------------------------------------------------------------------------

/// Record an ability use. No state changes.
pub fn handle_use_ability(
    world: &WorldState,
    actor: &AgentId,
    ability_name: &str,
    target_id: Option<&str>,
    payload: Option<&Value>,
) -> Outcome {
    let on = target_id
        .map(|t| format!(" on {}", world.agent_name(t)))
        .unwrap_or_default();
    let outcome = Outcome::medium(format!(
        "{} used {ability_name}{on}",
        world.agent_name(actor.as_str())
    ));
    match payload {
        Some(payload) => outcome.with_metadata(payload.clone()),
        None => outcome,
    }
}

/// Record a special action. No state changes.
pub fn handle_special(world: &WorldState, actor: &AgentId, name: &str, payload: &Value) -> Outcome {
    Outcome::medium(format!(
        "{} performed {name}",
        world.agent_name(actor.as_str())
    ))
    .with_metadata(payload.clone())
}

/// Narrate a world event or environmental drift announced by the generator.
pub fn handle_generator_action(action: &Action) -> Option<(Importance, String, Value)> {
    match action {
        Action::WorldEvent { target, parameters } => {
            let description = parameters
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or(target);
            Some((
                Importance::High,
                format!("World event: {description}"),
                parameters.clone(),
            ))
        }
        Action::EnvironmentChange { target, parameters } => {
            let detail = parameters
                .get("change")
                .and_then(Value::as_f64)
                .map(|change| format!(" ({change:+.2})"))
                .unwrap_or_default();
            Some((
                Importance::Low,
                format!("The world's {target} shifted{detail}"),
                parameters.clone(),
            ))
        }
        _ => None,
    }
}
