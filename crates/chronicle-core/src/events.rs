//! Rule-based world event generator.
//!
//! Runs once at the end of every day, after passive evolution, with no LLM
//! involvement. Each cycle it:
//!
//! 1. tries every [`EventTemplate`] in order: a template fires when its
//!    cooldown has passed, its probability roll succeeds, and all of its
//!    conditions hold. A fired template materializes a [`WorldEvent`] whose
//!    effects are applied to the world immediately;
//! 2. expires active events whose duration has elapsed and archives them
//!    in `completed_events`;
//! 3. lets the magic level and world stability drift, each behind its own
//!    probability, clamped to `[0, 100]`.
//!
//! Every fired event and every drift is returned as a `WORLD_EVENT` or
//! `ENVIRONMENT_CHANGE` action, which the scheduler passes through the
//! resolver so it lands in the world log like any other action.

use std::collections::BTreeMap;

use rand::Rng;
use rand::seq::IndexedRandom;
use serde_json::json;
use tracing::{debug, info};

use chronicle_types::{
    Action, AgentId, Archetype, CityId, EffectKind, EffectTarget, EventEffect, EventId, EventKind,
    EventSeverity, Importance, LogDraft, LogKind, WorldEvent, WorldState,
};

use crate::config::EventsConfig;

/// Agent id the generator's actions are attributed to.
pub const GENERATOR_ID: &str = "world_event_generator";

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

/// A world scalar a condition compares against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// `world_stability`.
    WorldStability,
    /// `magic_level`.
    MagicLevel,
    /// Global corruption.
    Corruption,
    /// Embers collected so far.
    EmberCount,
}

impl Metric {
    fn read(self, world: &WorldState) -> f64 {
        match self {
            Self::WorldStability => world.world_stability,
            Self::MagicLevel => world.magic_level,
            Self::Corruption => world.corruption.global,
            Self::EmberCount => f64::from(world.embers.collected_count()),
        }
    }
}

/// A comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// Strictly greater.
    Gt,
    /// Strictly less.
    Lt,
    /// Greater or equal.
    Gte,
    /// Less or equal.
    Lte,
}

/// A threshold test on a world scalar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Condition {
    /// Scalar under test.
    pub metric: Metric,
    /// How to compare.
    pub comparison: Comparison,
    /// Threshold.
    pub value: f64,
}

impl Condition {
    const fn new(metric: Metric, comparison: Comparison, value: f64) -> Self {
        Self {
            metric,
            comparison,
            value,
        }
    }

    /// Whether the world currently satisfies this condition.
    pub fn holds(&self, world: &WorldState) -> bool {
        let current = self.metric.read(world);
        match self.comparison {
            Comparison::Gt => current > self.value,
            Comparison::Lt => current < self.value,
            Comparison::Gte => current >= self.value,
            Comparison::Lte => current <= self.value,
        }
    }
}

/// An effect a template applies when it fires.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectTemplate {
    /// What changes.
    pub kind: EffectKind,
    /// Where it applies.
    pub target: EffectTarget,
    /// Signed strength.
    pub magnitude: f64,
    /// Narrative description.
    pub description: &'static str,
}

/// A recipe for one kind of world event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventTemplate {
    /// Event family.
    pub kind: EventKind,
    /// Display name.
    pub name: &'static str,
    /// Narrative description.
    pub description: &'static str,
    /// Reach.
    pub severity: EventSeverity,
    /// Chance to fire once cooldown and conditions allow.
    pub probability: f64,
    /// All must hold.
    pub conditions: Vec<Condition>,
    /// Applied when the event materializes.
    pub effects: Vec<EffectTemplate>,
    /// Days the event stays active.
    pub duration: u64,
    /// Days between firings.
    pub cooldown: u64,
}

const fn effect(
    kind: EffectKind,
    target: EffectTarget,
    magnitude: f64,
    description: &'static str,
) -> EffectTemplate {
    EffectTemplate {
        kind,
        target,
        magnitude,
        description,
    }
}

/// The seven built-in templates.
pub fn default_templates() -> Vec<EventTemplate> {
    use Comparison::{Gt, Gte, Lt};
    use EffectKind as K;
    use EffectTarget as T;
    use Metric::{Corruption, EmberCount, MagicLevel, WorldStability};

    vec![
        EventTemplate {
            kind: EventKind::NaturalDisaster,
            name: "Magic Storm",
            description: "A violent storm of raw magic sweeps over a region, wrecking stores and shaking its people.",
            severity: EventSeverity::Major,
            probability: 0.15,
            conditions: vec![Condition::new(MagicLevel, Gt, 30.0)],
            effects: vec![
                effect(K::ResourceChange, T::RandomCity, -20.0, "The storm destroys part of the city's stores"),
                effect(K::StatChange, T::RandomCity, -10.0, "Residents are battered by the storm"),
            ],
            duration: 3,
            cooldown: 10,
        },
        EventTemplate {
            kind: EventKind::MagicalAnomaly,
            name: "Ember Resonance",
            description: "Collected embers begin to resonate with one another, setting off strange magical phenomena.",
            severity: EventSeverity::Major,
            probability: 0.1,
            conditions: vec![Condition::new(EmberCount, Gte, 3.0)],
            effects: vec![
                effect(K::MagicLevel, T::AllCities, 15.0, "Ambient magic surges"),
                effect(K::NewAbility, T::AllAgents, 1.0, "Everyone briefly senses the embers"),
            ],
            duration: 5,
            cooldown: 15,
        },
        EventTemplate {
            kind: EventKind::GuardianInterference,
            name: "Guardian's Will Made Manifest",
            description: "The will of an ancient guardian breaks into the material world, bending its surroundings.",
            severity: EventSeverity::WorldChanging,
            probability: 0.05,
            conditions: vec![Condition::new(WorldStability, Lt, 50.0)],
            effects: vec![
                effect(K::RealityShift, T::SpecificLocation, 25.0, "A guardian's domain overlays the city"),
                effect(K::CorruptionSpread, T::RandomCity, 10.0, "The intrusion drags corruption in its wake"),
            ],
            duration: 7,
            cooldown: 30,
        },
        EventTemplate {
            kind: EventKind::TimeAnomaly,
            name: "Time Rift",
            description: "The flow of time falters and some places run fast while others crawl.",
            severity: EventSeverity::Major,
            probability: 0.08,
            conditions: vec![Condition::new(MagicLevel, Gt, 60.0)],
            effects: vec![
                effect(K::RealityShift, T::RandomCity, 15.0, "Time runs strangely"),
                effect(K::MemoryAlteration, T::AllAgents, 5.0, "Memories blur at the edges"),
            ],
            duration: 4,
            cooldown: 20,
        },
        EventTemplate {
            kind: EventKind::DimensionalBreach,
            name: "Dimensional Breach",
            description: "A tear opens between the world and the void beyond it.",
            severity: EventSeverity::WorldChanging,
            probability: 0.03,
            conditions: vec![Condition::new(Corruption, Gt, 70.0)],
            effects: vec![
                effect(K::RealityShift, T::SpecificLocation, 30.0, "The fabric of reality twists"),
                effect(K::CorruptionSpread, T::RandomCity, 20.0, "Corruption floods through the breach"),
            ],
            duration: 10,
            cooldown: 50,
        },
        EventTemplate {
            kind: EventKind::ProphecyFulfillment,
            name: "Ancient Prophecy",
            description: "An ancient prophecy begins to come true and the course of the world shifts.",
            severity: EventSeverity::Major,
            probability: 0.12,
            conditions: vec![Condition::new(EmberCount, Gte, 6.0)],
            effects: vec![
                effect(K::FateIntervention, T::AllAgents, 10.0, "Fate takes a hand in everyone's deeds"),
                effect(K::RelationshipChange, T::RandomCity, 15.0, "The prophecy draws neighbors together"),
            ],
            duration: 6,
            cooldown: 25,
        },
        EventTemplate {
            kind: EventKind::ChaosManifestation,
            name: "Chaos Manifest",
            description: "Pure chaos takes form in the material world, with unpredictable results.",
            severity: EventSeverity::WorldChanging,
            probability: 0.02,
            conditions: vec![Condition::new(WorldStability, Lt, 30.0)],
            effects: vec![
                effect(K::RealityShift, T::AllCities, 20.0, "Chaos warps reality everywhere"),
                effect(K::MemoryAlteration, T::AllAgents, 10.0, "Chaos seeps into memories"),
            ],
            duration: 8,
            cooldown: 60,
        },
    ]
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

/// What one generator cycle did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventCycle {
    /// Actions announcing started events and drifts.
    pub actions: Vec<Action>,
    /// Events that started this cycle.
    pub started: Vec<EventId>,
    /// Events that ended this cycle.
    pub ended: Vec<EventId>,
}

/// Fires templates, expires events, and drifts world scalars.
#[derive(Debug, Clone)]
pub struct EventGenerator {
    config: EventsConfig,
    templates: Vec<EventTemplate>,
    last_fired: BTreeMap<EventKind, u64>,
}

impl EventGenerator {
    /// A generator with the built-in templates.
    pub fn new(config: EventsConfig) -> Self {
        Self::with_templates(config, default_templates())
    }

    /// A generator with custom templates.
    pub const fn with_templates(config: EventsConfig, templates: Vec<EventTemplate>) -> Self {
        Self {
            config,
            templates,
            last_fired: BTreeMap::new(),
        }
    }

    /// The configured templates.
    pub fn templates(&self) -> &[EventTemplate] {
        &self.templates
    }

    /// Run one cycle against the world.
    pub fn run_cycle(&mut self, world: &mut WorldState, rng: &mut impl Rng) -> EventCycle {
        let mut cycle = EventCycle::default();
        if !self.config.enabled {
            return cycle;
        }

        for index in 0..self.templates.len() {
            if world.active_events.len() >= self.config.max_active_events {
                break;
            }
            let Some(template) = self.templates.get(index) else {
                continue;
            };
            if !self.should_fire(template, world, rng) {
                continue;
            }
            let event = materialize(template, world, rng);
            info!(
                day = world.day,
                event = %event.name,
                kind = ?event.kind,
                location = ?event.location,
                "World event started"
            );
            cycle.started.push(event.id);
            cycle.actions.push(Action::WorldEvent {
                target: String::from("world"),
                parameters: json!({
                    "eventId": event.id,
                    "eventName": event.name,
                    "description": format!("{}: {}", event.name, event.description),
                    "severity": event.severity,
                    "location": event.location,
                    "participants": event.participants,
                }),
            });
            self.last_fired.insert(template.kind, world.day);
            world.active_events.push(event);
        }

        cycle.ended = expire_events(world);
        self.drift(world, rng, &mut cycle.actions);
        cycle
    }

    fn should_fire(&self, template: &EventTemplate, world: &WorldState, rng: &mut impl Rng) -> bool {
        let last = self.last_fired.get(&template.kind).copied().unwrap_or(0);
        if world.day.saturating_sub(last) < template.cooldown {
            return false;
        }
        if rng.random::<f64>() > template.probability {
            return false;
        }
        template.conditions.iter().all(|c| c.holds(world))
    }

    fn drift(&self, world: &mut WorldState, rng: &mut impl Rng, actions: &mut Vec<Action>) {
        if rng.random::<f64>() < self.config.magic_drift_chance {
            let change = (rng.random::<f64>() - 0.5) * self.config.magic_drift_amplitude;
            world.magic_level = (world.magic_level + change).clamp(0.0, 100.0);
            actions.push(drift_action("magic_level", change, world.magic_level));
        }
        if rng.random::<f64>() < self.config.stability_drift_chance {
            let change = (rng.random::<f64>() - 0.5) * self.config.stability_drift_amplitude;
            world.world_stability = (world.world_stability + change).clamp(0.0, 100.0);
            actions.push(drift_action("world_stability", change, world.world_stability));
        }
    }
}

fn drift_action(target: &str, change: f64, value: f64) -> Action {
    Action::EnvironmentChange {
        target: target.to_owned(),
        parameters: json!({ "change": change, "value": value }),
    }
}

/// Archive every active event whose duration has elapsed.
fn expire_events(world: &mut WorldState) -> Vec<EventId> {
    let day = world.day;
    let (expired, active): (Vec<WorldEvent>, Vec<WorldEvent>) = std::mem::take(&mut world.active_events)
        .into_iter()
        .partition(|e| e.has_expired(day));
    world.active_events = active;

    let mut ended = Vec::with_capacity(expired.len());
    for mut event in expired {
        event.ongoing = false;
        world.push_log(
            LogDraft::new(
                LogKind::Event,
                Importance::Medium,
                format!("{} has ended", event.name),
            )
            .tag("world_event")
            .tag("event_ended")
            .metadata(json!({ "eventId": event.id })),
        );
        debug!(event = %event.name, "World event archived");
        ended.push(event.id);
        world.completed_events.push(event);
    }
    ended
}

// ---------------------------------------------------------------------------
// Materialization
// ---------------------------------------------------------------------------

fn materialize(template: &EventTemplate, world: &mut WorldState, rng: &mut impl Rng) -> WorldEvent {
    let location = select_location(template.kind, world, rng);
    let participants = select_participants(template.kind, world);

    let effects: Vec<EventEffect> = template
        .effects
        .iter()
        .map(|e| EventEffect {
            kind: e.kind,
            target: e.target,
            magnitude: e.magnitude,
            description: e.description.to_owned(),
        })
        .collect();

    for effect in &effects {
        let cities = resolve_cities(effect.target, location.as_ref(), world, rng);
        apply_effect(effect, &cities, world);
    }

    WorldEvent {
        id: EventId::new(),
        name: template.name.to_owned(),
        kind: template.kind,
        severity: template.severity,
        description: template.description.to_owned(),
        participants,
        location,
        start_day: world.day,
        duration: template.duration,
        effects,
        ongoing: true,
    }
}

/// Where an event takes place.
///
/// Ember resonance favors a mana-rich city and a dimensional breach favors
/// a city under heavy corruption; otherwise the city is random.
fn select_location(kind: EventKind, world: &WorldState, rng: &mut impl Rng) -> Option<CityId> {
    let preferred = match kind {
        EventKind::MagicalAnomaly => world
            .cities
            .values()
            .find(|c| c.resources.mana > 200)
            .map(|c| c.id.clone()),
        EventKind::DimensionalBreach => world
            .cities
            .values()
            .find(|c| c.corruption_influence > 50.0)
            .map(|c| c.id.clone()),
        _ => None,
    };
    preferred.or_else(|| random_city(world, rng))
}

fn random_city(world: &WorldState, rng: &mut impl Rng) -> Option<CityId> {
    let ids: Vec<&CityId> = world.cities.keys().collect();
    ids.choose(rng).map(|&id| id.clone())
}

/// Who an event involves.
fn select_participants(kind: EventKind, world: &WorldState) -> Vec<AgentId> {
    let of = |archetype: Archetype| {
        world
            .agents
            .iter()
            .filter(move |s| s.archetype() == archetype)
            .map(|s| s.id.clone())
    };
    match kind {
        EventKind::GuardianInterference => of(Archetype::Guardian).collect(),
        EventKind::MagicalAnomaly => of(Archetype::Hero).collect(),
        EventKind::ProphecyFulfillment => of(Archetype::Hero).chain(of(Archetype::Guardian)).collect(),
        _ => Vec::new(),
    }
}

/// The cities an effect touches. Empty for agent-wide effects.
fn resolve_cities(
    target: EffectTarget,
    location: Option<&CityId>,
    world: &WorldState,
    rng: &mut impl Rng,
) -> Vec<CityId> {
    match target {
        EffectTarget::RandomCity => random_city(world, rng).into_iter().collect(),
        EffectTarget::AllCities => world.cities.keys().cloned().collect(),
        EffectTarget::SpecificLocation => location.cloned().into_iter().collect(),
        EffectTarget::AllAgents => Vec::new(),
    }
}

/// Apply one effect.
///
/// - resource changes scale every stock of the touched cities by
///   `magnitude` percent;
/// - stat changes move the hp of agents standing in the touched cities (or
///   of everyone, for agent-wide effects);
/// - magic shifts move the magic level;
/// - reality shifts cost a fifth of `magnitude` in world stability;
/// - corruption spreads raise the touched cities' corruption influence by
///   `magnitude` and their affecting areas by half of it;
/// - relationship changes move the mutual regard of agents sharing a city.
///
/// New abilities, memory alterations, and fate interventions are narrative
/// only.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn apply_effect(effect: &EventEffect, cities: &[CityId], world: &mut WorldState) {
    let everyone = effect.target == EffectTarget::AllAgents;
    match effect.kind {
        EffectKind::ResourceChange => {
            let factor = (1.0 + effect.magnitude / 100.0).max(0.0);
            for id in cities {
                if let Some(city) = world.cities.get_mut(id) {
                    let stocks = &mut city.resources;
                    for stock in [
                        &mut stocks.food,
                        &mut stocks.materials,
                        &mut stocks.wealth,
                        &mut stocks.mana,
                    ] {
                        *stock = (f64::from(*stock) * factor).round() as u32;
                    }
                }
            }
        }
        EffectKind::StatChange => {
            let amount = effect.magnitude.abs().round() as u32;
            for status in world.agents.iter_mut() {
                if everyone || cities.contains(&status.location) {
                    if effect.magnitude < 0.0 {
                        status.take_damage(amount);
                    } else {
                        status.heal(amount);
                    }
                }
            }
        }
        EffectKind::MagicLevel => {
            world.magic_level = (world.magic_level + effect.magnitude).clamp(0.0, 100.0);
        }
        EffectKind::RealityShift => {
            world.world_stability =
                (world.world_stability - effect.magnitude / 5.0).clamp(0.0, 100.0);
        }
        EffectKind::CorruptionSpread => {
            for id in cities {
                if let Some(city) = world.cities.get_mut(id) {
                    city.corruption_influence =
                        (city.corruption_influence + effect.magnitude).clamp(0.0, 100.0);
                }
            }
            for area in world.corruption.areas.values_mut() {
                if area.affected_cities.iter().any(|c| cities.contains(c)) {
                    area.level = (area.level + effect.magnitude / 2.0).clamp(0.0, 100.0);
                }
            }
            world.corruption.recompute_global();
        }
        EffectKind::RelationshipChange => {
            let delta = effect.magnitude.round() as i32;
            let residents: Vec<(AgentId, CityId)> = world
                .agents
                .iter()
                .filter(|s| cities.contains(&s.location))
                .map(|s| (s.id.clone(), s.location.clone()))
                .collect();
            for status in world.agents.iter_mut() {
                for (other, city) in &residents {
                    if *other != status.id && *city == status.location {
                        let regard = status.relationships.entry(other.clone()).or_insert(0);
                        *regard = regard.saturating_add(delta);
                    }
                }
            }
        }
        EffectKind::NewAbility | EffectKind::MemoryAlteration | EffectKind::FateIntervention => {}
    }
}
