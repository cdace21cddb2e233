//! Roster spawner for seeding the world with its starting agents.
//!
//! Heroes and guardians are named in the `roster` section of the config
//! file (a built-in cast is used otherwise). Townsfolk are generated: for
//! every trade, `townsfolk_per_role` agents with names drawn from that
//! trade's pool and placed in the trade's preferred city.

use std::collections::BTreeSet;

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Deserialize;
use tracing::info;

use chronicle_types::{AgentId, CityId, EmberId, TownsfolkRole, WorldState};
use chronicle_world::{add_agent, guardian_status, hero_status, role_profile, townsfolk_status};

use crate::error::EngineError;

// -----------------------------------------------------------------------
// Configuration
// -----------------------------------------------------------------------

/// One hero in the roster.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HeroSeed {
    /// Agent id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// The hero's calling.
    pub path: String,
    /// Starting city.
    pub location: String,
}

/// One guardian in the roster.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GuardianSeed {
    /// Agent id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// What the guardian presides over.
    pub domain: String,
    /// The city it resides in.
    pub location: String,
    /// The ember in its keeping.
    #[serde(default)]
    pub ember: Option<String>,
}

/// The `roster` section of the config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RosterConfig {
    /// Heroes to place.
    #[serde(default = "default_heroes")]
    pub heroes: Vec<HeroSeed>,

    /// Guardians to place.
    #[serde(default = "default_guardians")]
    pub guardians: Vec<GuardianSeed>,

    /// Generated townsfolk per trade.
    #[serde(default = "default_townsfolk_per_role")]
    pub townsfolk_per_role: u32,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            heroes: default_heroes(),
            guardians: default_guardians(),
            townsfolk_per_role: default_townsfolk_per_role(),
        }
    }
}

const fn default_townsfolk_per_role() -> u32 {
    1
}

fn default_heroes() -> Vec<HeroSeed> {
    [
        ("hero_phainon", "Phainon", "burden", "city-of-dawn"),
        ("hero_cyrene", "Cyrene", "time", "mystic-grove"),
        ("hero_mydei", "Mydei", "strife", "fortress-of-dusk"),
        ("hero_castorice", "Castorice", "death", "crystal-caverns"),
    ]
    .into_iter()
    .map(|(id, name, path, location)| HeroSeed {
        id: id.to_owned(),
        name: name.to_owned(),
        path: path.to_owned(),
        location: location.to_owned(),
    })
    .collect()
}

fn default_guardians() -> Vec<GuardianSeed> {
    [
        ("guardian_janus", "Janus", "passage", "city-of-dawn", "ember-1"),
        ("guardian_talanton", "Talanton", "law", "fortress-of-dusk", "ember-2"),
        ("guardian_georios", "Georios", "earth", "ember-forges", "ember-5"),
    ]
    .into_iter()
    .map(|(id, name, domain, location, ember)| GuardianSeed {
        id: id.to_owned(),
        name: name.to_owned(),
        domain: domain.to_owned(),
        location: location.to_owned(),
        ember: Some(ember.to_owned()),
    })
    .collect()
}

// -----------------------------------------------------------------------
// Name pools
// -----------------------------------------------------------------------

fn name_pool(role: TownsfolkRole) -> &'static [&'static str] {
    match role {
        TownsfolkRole::Merchant => &[
            "Elara", "Marcus Goldhand", "Vera Coinweaver", "Dorian Tradewing", "Lysa Fairmarket",
            "Thane Silverbarter",
        ],
        TownsfolkRole::Guard => &[
            "Sera Vigilant", "Gareth Steadfast", "Luna Nightwatch", "Bram Defender",
            "Kira Stalwart", "Orrin Ironshield",
        ],
        TownsfolkRole::Scholar => &[
            "Theron Inkwell", "Mira Starglass", "Quintus Lore", "Ysolde Pagebright",
            "Cassian Quill", "Nerys Ashdown",
        ],
        TownsfolkRole::Craftsman => &[
            "Hale Anvilborn", "Tamsin Oakhand", "Rurik Stonecut", "Wren Loomwright",
            "Pell Brassbinder", "Ida Kilnworth",
        ],
    }
}

fn role_slug(role: TownsfolkRole) -> &'static str {
    match role {
        TownsfolkRole::Merchant => "merchant",
        TownsfolkRole::Guard => "guard",
        TownsfolkRole::Scholar => "scholar",
        TownsfolkRole::Craftsman => "craftsman",
    }
}

/// Pick `count` distinct names from `pool`. Past the pool size, names get a
/// numeric suffix.
fn pick_names(rng: &mut impl Rng, pool: &[&str], count: u32) -> Vec<String> {
    let count = usize::try_from(count).unwrap_or(usize::MAX);
    let mut names: Vec<String> = pool
        .choose_multiple(rng, count)
        .map(|n| (*n).to_owned())
        .collect();
    let mut suffix: u32 = 2;
    while names.len() < count {
        let base = pool.choose(rng).copied().unwrap_or("Villager");
        names.push(format!("{base} {suffix}"));
        suffix = suffix.saturating_add(1);
    }
    names
}

/// The first preferred city of `role` that exists in `world`.
fn home_city(world: &WorldState, role: TownsfolkRole) -> Option<CityId> {
    role_profile(role)
        .into_iter()
        .flat_map(|p| p.preferred_locations.iter())
        .find(|city| world.cities.contains_key(*city))
        .cloned()
        .or_else(|| world.cities.keys().next().cloned())
}

// -----------------------------------------------------------------------
// Spawning
// -----------------------------------------------------------------------

/// Place the whole roster into `world`. Returns the new agents' ids in
/// insertion order.
pub fn spawn_roster(
    config: &RosterConfig,
    world: &mut WorldState,
    rng: &mut impl Rng,
) -> Result<Vec<AgentId>, EngineError> {
    let mut spawned = Vec::new();
    let mut seen = BTreeSet::new();
    let mut claim = |id: &str| -> Result<AgentId, EngineError> {
        if seen.insert(id.to_owned()) {
            Ok(AgentId::new(id))
        } else {
            Err(EngineError::Spawner {
                message: format!("agent id {id} appears twice in the roster"),
            })
        }
    };

    for hero in &config.heroes {
        let id = claim(&hero.id)?;
        add_agent(
            world,
            hero_status(&hero.id, &hero.name, &hero.path, &hero.location),
        )?;
        spawned.push(id);
    }

    for guardian in &config.guardians {
        let id = claim(&guardian.id)?;
        let ember = guardian.ember.as_deref().map(EmberId::new);
        add_agent(
            world,
            guardian_status(
                &guardian.id,
                &guardian.name,
                &guardian.domain,
                &guardian.location,
                ember.as_ref(),
            ),
        )?;
        spawned.push(id);
    }

    for role in TownsfolkRole::ALL {
        let Some(city) = home_city(world, role) else {
            return Err(EngineError::Spawner {
                message: String::from("world has no cities to place townsfolk in"),
            });
        };
        let names = pick_names(rng, name_pool(role), config.townsfolk_per_role);
        for (index, name) in names.iter().enumerate() {
            let raw_id = format!("{}_{}", role_slug(role), index.saturating_add(1));
            let id = claim(&raw_id)?;
            add_agent(
                world,
                townsfolk_status(&raw_id, name, role, city.as_str()),
            )?;
            spawned.push(id);
        }
    }

    info!(
        heroes = config.heroes.len(),
        guardians = config.guardians.len(),
        townsfolk_per_role = config.townsfolk_per_role,
        total = spawned.len(),
        "Roster spawned"
    );
    Ok(spawned)
}
