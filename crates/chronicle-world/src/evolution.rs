//! Passive world evolution, run once at the end of every daily cycle.
//!
//! Three independent updates, all randomized in magnitude:
//!
//! 1. **Corruption spread** -- every expanding area gains up to
//!    `corruption_step` levels (capped at 100) and pushes up to
//!    `influence_step` of corruption influence onto each affected city.
//!    Increases above one level are logged at medium importance.
//! 2. **Regeneration** -- every city regains food, materials, wealth, and
//!    mana by a random amount within a fixed band, up to a fixed cap.
//! 3. **Prosperity drift** -- every city's prosperity moves by -1, 0, or +1
//!    with equal chance, clamped to `[0, 100]`.
//!
//! Global corruption is recomputed afterwards.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use chronicle_types::{AreaId, CityId, CityResource, Importance, LogDraft, LogKind, WorldState};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Regeneration band and cap for one city resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegenBand {
    /// Smallest daily gain.
    pub min: u32,
    /// Largest daily gain.
    pub max: u32,
    /// Stock ceiling.
    pub cap: u32,
}

/// Tunables for passive world evolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// Largest daily corruption gain of an expanding area (default: 2.0).
    #[serde(default = "default_corruption_step")]
    pub corruption_step: f64,

    /// Largest daily influence gain of an affected city (default: 1.0).
    #[serde(default = "default_influence_step")]
    pub influence_step: f64,

    /// Food regeneration (default: 10..=59, cap 2000).
    #[serde(default = "default_food")]
    pub food: RegenBand,

    /// Materials regeneration (default: 5..=34, cap 1500).
    #[serde(default = "default_materials")]
    pub materials: RegenBand,

    /// Wealth regeneration (default: 20..=119, cap 10000).
    #[serde(default = "default_wealth")]
    pub wealth: RegenBand,

    /// Mana regeneration (default: 5..=24, cap 500).
    #[serde(default = "default_mana")]
    pub mana: RegenBand,
}

const fn default_corruption_step() -> f64 {
    2.0
}

const fn default_influence_step() -> f64 {
    1.0
}

const fn default_food() -> RegenBand {
    RegenBand {
        min: 10,
        max: 59,
        cap: 2000,
    }
}

const fn default_materials() -> RegenBand {
    RegenBand {
        min: 5,
        max: 34,
        cap: 1500,
    }
}

const fn default_wealth() -> RegenBand {
    RegenBand {
        min: 20,
        max: 119,
        cap: 10_000,
    }
}

const fn default_mana() -> RegenBand {
    RegenBand {
        min: 5,
        max: 24,
        cap: 500,
    }
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            corruption_step: default_corruption_step(),
            influence_step: default_influence_step(),
            food: default_food(),
            materials: default_materials(),
            wealth: default_wealth(),
            mana: default_mana(),
        }
    }
}

impl EvolutionConfig {
    /// The band for a city resource.
    pub const fn band(&self, resource: CityResource) -> RegenBand {
        match resource {
            CityResource::Food => self.food,
            CityResource::Materials => self.materials,
            CityResource::Wealth => self.wealth,
            CityResource::Mana => self.mana,
        }
    }
}

// ---------------------------------------------------------------------------
// Evolution
// ---------------------------------------------------------------------------

/// What one evolution pass changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvolutionReport {
    /// Corruption gained by each expanding area.
    pub corruption_gain: BTreeMap<AreaId, f64>,
    /// Units regenerated per city and resource.
    pub regeneration: BTreeMap<CityId, BTreeMap<CityResource, u32>>,
    /// Signed prosperity change per city.
    pub prosperity_change: BTreeMap<CityId, i32>,
}

/// Run one passive evolution pass over the world.
pub fn evolve(
    world: &mut WorldState,
    config: &EvolutionConfig,
    rng: &mut impl Rng,
) -> EvolutionReport {
    let mut report = EvolutionReport::default();
    spread_corruption(world, config, rng, &mut report);
    regenerate_cities(world, config, rng, &mut report);
    drift_prosperity(world, rng, &mut report);
    world.corruption.recompute_global();
    debug!(
        day = world.day,
        global_corruption = world.corruption.global,
        "World evolution complete"
    );
    report
}

fn spread_corruption(
    world: &mut WorldState,
    config: &EvolutionConfig,
    rng: &mut impl Rng,
    report: &mut EvolutionReport,
) {
    let step = config.corruption_step.max(0.0);
    let influence_step = config.influence_step.max(0.0);
    let mut notes = Vec::new();

    for area in world.corruption.areas.values_mut() {
        if !area.expanding {
            continue;
        }
        let before = area.level;
        area.level = rng.random::<f64>().mul_add(step, area.level).min(100.0);
        let gain = area.level - before;
        report.corruption_gain.insert(area.id.clone(), gain);
        if gain > 1.0 {
            notes.push(format!(
                "Corruption in {} spreads, now at {:.0}%",
                area.name, area.level
            ));
        }

        for city_id in &area.affected_cities {
            if let Some(city) = world.cities.get_mut(city_id) {
                city.corruption_influence = rng
                    .random::<f64>()
                    .mul_add(influence_step, city.corruption_influence)
                    .min(100.0);
            }
        }
    }

    for note in notes {
        world.push_log(
            LogDraft::new(LogKind::Event, Importance::Medium, note).tag("corruption_spread"),
        );
    }
}

fn regenerate_cities(
    world: &mut WorldState,
    config: &EvolutionConfig,
    rng: &mut impl Rng,
    report: &mut EvolutionReport,
) {
    for city in world.cities.values_mut() {
        let mut gained = BTreeMap::new();
        for resource in CityResource::ALL {
            let band = config.band(resource);
            let roll = rng.random_range(band.min..=band.max.max(band.min));
            let stock = city.resources.amount_mut(resource);
            let before = *stock;
            *stock = stock.saturating_add(roll).min(band.cap.max(before));
            gained.insert(resource, stock.saturating_sub(before));
        }
        report.regeneration.insert(city.id.clone(), gained);
    }
}

fn drift_prosperity(world: &mut WorldState, rng: &mut impl Rng, report: &mut EvolutionReport) {
    for city in world.cities.values_mut() {
        let delta: i32 = rng.random_range(-1..=1);
        city.prosperity = city.prosperity.saturating_add_signed(delta).min(100);
        report.prosperity_change.insert(city.id.clone(), delta);
    }
}
