//! Action validation pipeline.
//!
//! The pipeline runs three stages in order and stops at the first failure:
//! 1. Target -- do referenced cities, agents, areas, and recipes exist?
//! 2. Location -- is the actor standing where the action requires?
//! 3. Resources -- does each party hold what the action consumes?
//!
//! A [`Rejection`] is never fatal. The resolver renders it into a
//! low-importance log entry and leaves the world untouched.

use std::collections::BTreeMap;

use chronicle_types::{Action, AgentStatus, AreaId, CityId, WorldState};

use crate::crafting::{self, format_quantities};
use crate::matcher;

/// Why an action was refused.
///
/// The display text completes the sentence `"<actor> tried to <KIND> but "`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    /// The destination or named city is not in the world.
    #[error("city {0} does not exist")]
    UnknownCity(CityId),

    /// No agent matches the reference.
    #[error("{0} does not exist")]
    UnknownAgent(String),

    /// The action may not target the actor.
    #[error("they cannot target themselves")]
    SelfTarget,

    /// The counterparty is in a different city.
    #[error("{target} is in {target_location}, not {actor_location}")]
    NotCoLocated {
        /// Counterparty name.
        target: String,
        /// Where the counterparty is.
        target_location: CityId,
        /// Where the actor is.
        actor_location: CityId,
    },

    /// The actor must stand in the named city.
    #[error("they are in {actual}, not {required}")]
    WrongLocation {
        /// City the action names.
        required: CityId,
        /// City the actor is in.
        actual: CityId,
    },

    /// No recipe produces the item.
    #[error("there is no recipe for {0}")]
    UnknownRecipe(String),

    /// A party lacks quantities the action consumes.
    #[error("{owner} is missing {}", format_quantities(.missing))]
    Insufficient {
        /// Name of the party that is short.
        owner: String,
        /// Missing quantities per inventory key.
        missing: BTreeMap<String, u32>,
    },

    /// A trade or gift moves nothing.
    #[error("nothing would change hands")]
    EmptyTransfer,

    /// The corrupted area is not in the world.
    #[error("area {0} does not exist")]
    UnknownArea(AreaId),

    /// The corrupted area has no corruption left.
    #[error("area {0} is already clean")]
    AlreadyClean(AreaId),
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Validate an action taken by `actor` against the current world.
///
/// Kinds with no preconditions (FORAGE, GATHER_RESOURCES, REST,
/// USE_ABILITY, SPECIAL, and generator or unhandled kinds) always pass;
/// GATHER_RESOURCES settles availability while executing.
pub fn validate_action(
    world: &WorldState,
    actor: &AgentStatus,
    action: &Action,
) -> Result<(), Rejection> {
    // Stage 1: Target check
    validate_targets(world, actor, action)?;

    // Stage 2: Location check
    validate_location(world, actor, action)?;

    // Stage 3: Resource check
    validate_resources(world, actor, action)
}

fn validate_targets(
    world: &WorldState,
    actor: &AgentStatus,
    action: &Action,
) -> Result<(), Rejection> {
    match action {
        Action::Move { target_city } => {
            if !world.cities.contains_key(target_city) {
                return Err(Rejection::UnknownCity(target_city.clone()));
            }
        }
        Action::BuildDefense { city_id, .. } => {
            if !world.cities.contains_key(city_id) {
                return Err(Rejection::UnknownCity(city_id.clone()));
            }
        }
        Action::Inspect { target_id } | Action::Negotiate { target_id, .. } => {
            require_agent(world, target_id.as_str())?;
        }
        Action::Chat { target_id, .. } => {
            if matcher::find_agent(world, target_id).is_none() {
                return Err(Rejection::UnknownAgent(target_id.clone()));
            }
        }
        Action::FormAlliance { target_id }
        | Action::Attack { target_id, .. }
        | Action::Trade { target_id, .. }
        | Action::Gift { target_id, .. } => {
            require_agent(world, target_id.as_str())?;
            if *target_id == actor.id {
                return Err(Rejection::SelfTarget);
            }
        }
        Action::CraftItem { item_name, .. } => {
            if chronicle_world::get_recipe(item_name).is_none() {
                return Err(Rejection::UnknownRecipe(item_name.clone()));
            }
        }
        Action::CleanseCorruption { area_id, .. } => match world.corruption.areas.get(area_id) {
            None => return Err(Rejection::UnknownArea(area_id.clone())),
            Some(area) if area.level <= 0.0 => {
                return Err(Rejection::AlreadyClean(area_id.clone()));
            }
            Some(_) => {}
        },
        _ => {}
    }
    Ok(())
}

fn validate_location(
    world: &WorldState,
    actor: &AgentStatus,
    action: &Action,
) -> Result<(), Rejection> {
    match action {
        Action::BuildDefense { city_id, .. } => {
            if actor.location != *city_id {
                return Err(Rejection::WrongLocation {
                    required: city_id.clone(),
                    actual: actor.location.clone(),
                });
            }
        }
        Action::Trade { target_id, .. } | Action::Gift { target_id, .. } => {
            let target = require_agent(world, target_id.as_str())?;
            if target.location != actor.location {
                return Err(Rejection::NotCoLocated {
                    target: target.name.clone(),
                    target_location: target.location.clone(),
                    actor_location: actor.location.clone(),
                });
            }
        }
        _ => {}
    }
    Ok(())
}

fn validate_resources(
    world: &WorldState,
    actor: &AgentStatus,
    action: &Action,
) -> Result<(), Rejection> {
    match action {
        Action::CraftItem {
            item_name,
            materials,
        } => {
            let recipe = chronicle_world::get_recipe(item_name)
                .ok_or_else(|| Rejection::UnknownRecipe(item_name.clone()))?;
            let required = crafting::resolve_materials(recipe, materials);
            require_holdings(actor, &required)
        }
        Action::Trade {
            target_id,
            offer,
            request,
            ..
        } => {
            let offer = non_zero(offer);
            let request = non_zero(request);
            if offer.is_empty() && request.is_empty() {
                return Err(Rejection::EmptyTransfer);
            }
            require_holdings(actor, &offer)?;
            let target = require_agent(world, target_id.as_str())?;
            require_holdings(target, &request)
        }
        Action::Gift {
            items, resources, ..
        } => {
            let given = gift_bundle(items, resources);
            if given.is_empty() {
                return Err(Rejection::EmptyTransfer);
            }
            require_holdings(actor, &given)
        }
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn require_agent<'a>(world: &'a WorldState, id: &str) -> Result<&'a AgentStatus, Rejection> {
    world
        .agents
        .get(id)
        .ok_or_else(|| Rejection::UnknownAgent(id.to_owned()))
}

fn require_holdings(
    party: &AgentStatus,
    required: &BTreeMap<String, u32>,
) -> Result<(), Rejection> {
    let missing = crafting::missing_materials(&party.inventory, required);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Rejection::Insufficient {
            owner: party.name.clone(),
            missing,
        })
    }
}

/// Drop zero quantities from a transfer map.
pub fn non_zero(quantities: &BTreeMap<String, u32>) -> BTreeMap<String, u32> {
    quantities
        .iter()
        .filter(|&(_, &quantity)| quantity > 0)
        .map(|(item, &quantity)| (item.clone(), quantity))
        .collect()
}

/// Merge a gift's item list (one unit per entry) with its resource map.
pub fn gift_bundle(items: &[String], resources: &BTreeMap<String, u32>) -> BTreeMap<String, u32> {
    let mut bundle = non_zero(resources);
    for item in items {
        let entry = bundle.entry(item.clone()).or_insert(0);
        *entry = entry.saturating_add(1);
    }
    bundle
}
