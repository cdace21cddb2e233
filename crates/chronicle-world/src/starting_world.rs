//! Default starting world for the Chronicle simulation.
//!
//! Six cities linked into a ring around the capital, nine corrupted areas
//! (two of them expanding), and twelve embers waiting for guardians.
//! Agents are added afterwards with [`add_agent`] and the status builders.

use std::collections::BTreeMap;

use chronicle_types::{
    AgentId, AgentStatus, ArchetypeProfile, AreaId, City, CityId, CityKind, CityResources,
    CorruptedArea, Corruption, Defenses, Ember, EmberId, EmberSystem, Importance, LogDraft,
    LogKind, TownsfolkRole, WorldState,
};

use crate::error::WorldError;
use crate::profiles::role_profile;

/// Starting world stability.
pub const INITIAL_STABILITY: f64 = 80.0;

/// Starting magic level.
pub const INITIAL_MAGIC_LEVEL: f64 = 60.0;

/// Number of embers in the setting.
pub const TOTAL_EMBERS: u32 = 12;

/// Starting hp of a hero.
pub const HERO_MAX_HP: u32 = 100;

/// Starting hp of a guardian.
pub const GUARDIAN_MAX_HP: u32 = 200;

// ---------------------------------------------------------------------------
// Cities
// ---------------------------------------------------------------------------

/// Static description of a starting city.
struct CitySeed {
    id: &'static str,
    name: &'static str,
    kind: CityKind,
    population: u32,
    prosperity: u32,
    /// Walls, watchtowers, guard posts, magical wards.
    defenses: [u32; 4],
    /// Food, materials, wealth, mana.
    resources: [u32; 4],
    connected: &'static [&'static str],
    influence: f64,
    features: &'static [&'static str],
}

impl CitySeed {
    fn build(&self) -> City {
        let [walls, watchtowers, guard_posts, magical_wards] = self.defenses;
        let mut defenses = Defenses {
            walls,
            watchtowers,
            guard_posts,
            magical_wards,
            total_defense_rating: 0,
        };
        defenses.recompute_rating();
        let [food, materials, wealth, mana] = self.resources;
        City {
            id: CityId::from(self.id),
            name: self.name.to_owned(),
            kind: self.kind,
            population: self.population,
            prosperity: self.prosperity,
            defenses,
            resources: CityResources {
                food,
                materials,
                wealth,
                mana,
                rare_elements: BTreeMap::new(),
            },
            connected_cities: self.connected.iter().map(|id| CityId::from(*id)).collect(),
            corruption_influence: self.influence,
            guardian: None,
            special_features: self.features.iter().map(|f| (*f).to_owned()).collect(),
        }
    }
}

const CITY_SEEDS: &[CitySeed] = &[
    CitySeed {
        id: "city-of-dawn",
        name: "City of Dawn",
        kind: CityKind::Capital,
        population: 12_000,
        prosperity: 70,
        defenses: [4, 3, 6, 2],
        resources: [1200, 800, 5000, 200],
        connected: &["fortress-of-dusk", "mystic-grove", "ember-forges", "academy-quarter"],
        influence: 5.0,
        features: &["Sunrise Cathedral", "Grand Market"],
    },
    CitySeed {
        id: "fortress-of-dusk",
        name: "Fortress of Dusk",
        kind: CityKind::Fortress,
        population: 6_000,
        prosperity: 55,
        defenses: [8, 6, 10, 3],
        resources: [900, 1000, 3000, 120],
        connected: &["city-of-dawn", "crystal-caverns"],
        influence: 15.0,
        features: &["Twilight Barracks", "Siege Workshop"],
    },
    CitySeed {
        id: "mystic-grove",
        name: "Mystic Grove",
        kind: CityKind::Mystical,
        population: 2_000,
        prosperity: 55,
        defenses: [2, 3, 4, 8],
        resources: [600, 300, 1500, 150],
        connected: &["city-of-dawn", "academy-quarter"],
        influence: 8.0,
        features: &["Druid Sanctum", "Ancient Library"],
    },
    CitySeed {
        id: "crystal-caverns",
        name: "Crystal Caverns",
        kind: CityKind::Mystical,
        population: 1_500,
        prosperity: 45,
        defenses: [1, 2, 3, 9],
        resources: [300, 400, 2000, 400],
        connected: &["fortress-of-dusk", "ember-forges"],
        influence: 12.0,
        features: &["Singing Geodes"],
    },
    CitySeed {
        id: "ember-forges",
        name: "Ember Forges",
        kind: CityKind::Trading,
        population: 4_000,
        prosperity: 60,
        defenses: [3, 2, 5, 1],
        resources: [700, 1300, 4000, 90],
        connected: &["city-of-dawn", "crystal-caverns"],
        influence: 6.0,
        features: &["Great Anvil", "Smelting Halls"],
    },
    CitySeed {
        id: "academy-quarter",
        name: "Academy Quarter",
        kind: CityKind::Village,
        population: 1_800,
        prosperity: 65,
        defenses: [1, 1, 2, 6],
        resources: [400, 200, 2500, 250],
        connected: &["city-of-dawn", "mystic-grove"],
        influence: 3.0,
        features: &["Hall of Reason", "Star Observatory"],
    },
];

// ---------------------------------------------------------------------------
// Corrupted areas
// ---------------------------------------------------------------------------

/// Id, name, level, type, affected cities, expanding.
type AreaSeed = (&'static str, &'static str, f64, &'static str, &'static [&'static str], bool);

const AREA_SEEDS: &[AreaSeed] = &[
    ("corrupted-plains", "Corrupted Plains", 15.0, "shadow", &["fortress-of-dusk"], true),
    ("void-rift", "Void Rift", 0.0, "void", &[], false),
    ("crimson-wastes", "Crimson Wastes", 0.0, "blood", &["ember-forges"], true),
    ("withered-forest", "Withered Forest", 0.0, "decay", &["mystic-grove"], false),
    ("frozen-abyss", "Frozen Abyss", 88.0, "ice", &[], false),
    ("mirage-desert", "Mirage Desert", 0.0, "illusion", &[], false),
    ("twisted-mountain", "Twisted Mountain", 0.0, "chaos", &["crystal-caverns"], false),
    ("bone-graveyard", "Bone Graveyard", 92.0, "necromancy", &[], false),
    ("cursed-lake", "Cursed Lake", 78.0, "curse", &[], false),
];

// ---------------------------------------------------------------------------
// Embers
// ---------------------------------------------------------------------------

const EMBER_ELEMENTS: [&str; 6] = ["fire", "time", "shadow", "stone", "storm", "spirit"];

fn starting_embers() -> EmberSystem {
    let mut embers = BTreeMap::new();
    for index in 0..TOTAL_EMBERS {
        let slot = usize::try_from(index).unwrap_or(0);
        let city = CITY_SEEDS
            .get(slot.checked_rem(CITY_SEEDS.len()).unwrap_or(0))
            .map_or("city-of-dawn", |seed| seed.id);
        let element = EMBER_ELEMENTS
            .get(slot.checked_rem(EMBER_ELEMENTS.len()).unwrap_or(0))
            .copied()
            .unwrap_or("fire");
        let number = index.saturating_add(1);
        let id = EmberId::new(format!("ember-{number}"));
        embers.insert(
            id.clone(),
            Ember {
                id,
                name: format!("Ember of {element} #{number}"),
                guardian: None,
                collected: false,
                collector: None,
                location: CityId::from(city),
                power: 50_u32.saturating_add(number.saturating_mul(5)),
                element: element.to_owned(),
            },
        );
    }
    EmberSystem {
        total: TOTAL_EMBERS,
        embers,
    }
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// Build the default starting world with no agents.
pub fn create_starting_world() -> WorldState {
    let cities = CITY_SEEDS
        .iter()
        .map(|seed| (CityId::from(seed.id), seed.build()))
        .collect();

    let areas = AREA_SEEDS
        .iter()
        .map(|(id, name, level, kind, affected, expanding)| {
            (
                AreaId::from(*id),
                CorruptedArea {
                    id: AreaId::from(*id),
                    name: (*name).to_owned(),
                    level: *level,
                    corruption_type: (*kind).to_owned(),
                    affected_cities: affected.iter().map(|c| CityId::from(*c)).collect(),
                    expanding: *expanding,
                },
            )
        })
        .collect();

    let mut corruption = Corruption {
        intensity: 10.0,
        areas,
        global: 0.0,
    };
    corruption.recompute_global();

    let mut world = WorldState {
        cities,
        corruption,
        embers: starting_embers(),
        world_stability: INITIAL_STABILITY,
        magic_level: INITIAL_MAGIC_LEVEL,
        ..WorldState::default()
    };
    world.push_log(
        LogDraft::new(
            LogKind::Event,
            Importance::Critical,
            "The world awakens. Twelve embers wait in the keeping of the guardians.",
        )
        .tag("world_start"),
    );
    world
}

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

/// A fresh hero status.
pub fn hero_status(id: &str, name: &str, path: &str, location: &str) -> AgentStatus {
    AgentStatus {
        id: AgentId::from(id),
        name: name.to_owned(),
        location: CityId::from(location),
        hp: HERO_MAX_HP,
        max_hp: HERO_MAX_HP,
        power: 25,
        inventory: BTreeMap::new(),
        allies: Vec::new(),
        relationships: BTreeMap::new(),
        profile: ArchetypeProfile::Hero {
            path: path.to_owned(),
            level: 1,
            experience: 0,
            embers_collected: Vec::new(),
        },
    }
}

/// A fresh guardian status.
pub fn guardian_status(
    id: &str,
    name: &str,
    domain: &str,
    location: &str,
    ember: Option<&EmberId>,
) -> AgentStatus {
    AgentStatus {
        id: AgentId::from(id),
        name: name.to_owned(),
        location: CityId::from(location),
        hp: GUARDIAN_MAX_HP,
        max_hp: GUARDIAN_MAX_HP,
        power: 60,
        inventory: BTreeMap::new(),
        allies: Vec::new(),
        relationships: BTreeMap::new(),
        profile: ArchetypeProfile::Guardian {
            domain: domain.to_owned(),
            ember_guarded: ember.cloned(),
            awakening: 0,
            respect_for_challengers: BTreeMap::new(),
        },
    }
}

/// A fresh townsfolk status built from the role's profile.
pub fn townsfolk_status(id: &str, name: &str, role: TownsfolkRole, location: &str) -> AgentStatus {
    let (max_hp, power, inventory, title) = role_profile(role).map_or_else(
        || (60, 8, BTreeMap::new(), String::from("Villager")),
        |p| (p.max_hp, p.power, p.starting_inventory.clone(), p.title.clone()),
    );
    AgentStatus {
        id: AgentId::from(id),
        name: name.to_owned(),
        location: CityId::from(location),
        hp: max_hp,
        max_hp,
        power,
        inventory,
        allies: Vec::new(),
        relationships: BTreeMap::new(),
        profile: ArchetypeProfile::Townsfolk {
            role,
            occupation: title,
            is_corrupted: false,
            corruption_level: 0.0,
        },
    }
}

/// Add an agent to the world.
///
/// Guardians that keep an ember are recorded as that ember's guardian and
/// as their city's resident guardian.
pub fn add_agent(world: &mut WorldState, status: AgentStatus) -> Result<(), WorldError> {
    if world.agents.contains(status.id.as_str()) {
        return Err(WorldError::DuplicateAgent(status.id));
    }
    if !world.cities.contains_key(&status.location) {
        return Err(WorldError::CityNotFound(status.location));
    }
    if let ArchetypeProfile::Guardian {
        ember_guarded: Some(ember_id),
        ..
    } = &status.profile
    {
        let ember = world
            .embers
            .embers
            .get_mut(ember_id)
            .ok_or_else(|| WorldError::EmberNotFound(ember_id.clone()))?;
        ember.guardian = Some(status.id.clone());
        if let Some(city) = world.cities.get_mut(&status.location) {
            city.guardian = Some(status.id.clone());
        }
    }
    world.agents.insert(status);
    Ok(())
}

/// Check that every id reference in the world resolves.
pub fn validate_world(world: &WorldState) -> Result<(), WorldError> {
    for city in world.cities.values() {
        for connected in &city.connected_cities {
            if !world.cities.contains_key(connected) {
                return Err(WorldError::CityNotFound(connected.clone()));
            }
        }
        if let Some(guardian) = &city.guardian {
            if !world.agents.contains(guardian.as_str()) {
                return Err(WorldError::AgentNotFound(guardian.clone()));
            }
        }
    }
    for area in world.corruption.areas.values() {
        for city in &area.affected_cities {
            if !world.cities.contains_key(city) {
                return Err(WorldError::AreaCityNotFound {
                    area: area.id.clone(),
                    city: city.clone(),
                });
            }
        }
    }
    for status in world.agents.iter() {
        if !world.cities.contains_key(&status.location) {
            return Err(WorldError::CityNotFound(status.location.clone()));
        }
    }
    for ember in world.embers.embers.values() {
        if !world.cities.contains_key(&ember.location) {
            return Err(WorldError::CityNotFound(ember.location.clone()));
        }
    }
    Ok(())
}
