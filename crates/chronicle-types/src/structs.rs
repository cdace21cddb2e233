//! Core world structs: cities, agent statuses, corruption, embers, events,
//! and the [`WorldState`] aggregate that owns them.
//!
//! `WorldState` is an arena of maps keyed by string ids. Nothing in it
//! points back at anything else; relationships (allies, guardians,
//! affected cities) are stored as ids and resolved through the maps.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::enums::{
    Archetype, CityKind, CityResource, EffectKind, EffectTarget, EventKind, EventSeverity,
    Importance, LogKind, TownsfolkRole,
};
use crate::ids::{AgentId, AreaId, CityId, EmberId, EventId};

// ---------------------------------------------------------------------------
// Cities
// ---------------------------------------------------------------------------

/// Defensive works of a city.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defenses {
    /// Wall sections.
    pub walls: u32,
    /// Watchtowers.
    pub watchtowers: u32,
    /// Manned guard posts.
    pub guard_posts: u32,
    /// Magical wards.
    pub magical_wards: u32,
    /// Aggregate rating in `[0, 100]`, derived from the counts above.
    pub total_defense_rating: u32,
}

impl Defenses {
    /// Recompute [`Defenses::total_defense_rating`] from the structure
    /// counts, capped at 100.
    pub fn recompute_rating(&mut self) {
        let rating = self
            .walls
            .saturating_mul(10)
            .saturating_add(self.watchtowers.saturating_mul(5))
            .saturating_add(self.guard_posts.saturating_mul(3))
            .saturating_add(self.magical_wards.saturating_mul(2));
        self.total_defense_rating = rating.min(100);
    }
}

/// Pooled resource stocks of a city.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityResources {
    /// Food stores.
    pub food: u32,
    /// Building materials.
    pub materials: u32,
    /// Coin and treasure.
    pub wealth: u32,
    /// Ambient mana.
    pub mana: u32,
    /// Named rare elements and their amounts.
    #[serde(default)]
    pub rare_elements: BTreeMap<String, u32>,
}

impl CityResources {
    /// Current stock of a pooled resource.
    pub const fn amount(&self, resource: CityResource) -> u32 {
        match resource {
            CityResource::Food => self.food,
            CityResource::Materials => self.materials,
            CityResource::Wealth => self.wealth,
            CityResource::Mana => self.mana,
        }
    }

    /// Mutable access to a pooled resource.
    pub const fn amount_mut(&mut self, resource: CityResource) -> &mut u32 {
        match resource {
            CityResource::Food => &mut self.food,
            CityResource::Materials => &mut self.materials,
            CityResource::Wealth => &mut self.wealth,
            CityResource::Mana => &mut self.mana,
        }
    }
}

/// A city on the world map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    /// Unique identifier.
    pub id: CityId,
    /// Display name.
    pub name: String,
    /// Character of the city.
    pub kind: CityKind,
    /// Inhabitants.
    pub population: u32,
    /// Prosperity in `[0, 100]`.
    pub prosperity: u32,
    /// Defensive works.
    pub defenses: Defenses,
    /// Pooled resources.
    pub resources: CityResources,
    /// Directly reachable cities.
    #[serde(default)]
    pub connected_cities: Vec<CityId>,
    /// Corruption pressure on the city in `[0, 100]`.
    pub corruption_influence: f64,
    /// Guardian residing in the city, if any.
    #[serde(default)]
    pub guardian: Option<AgentId>,
    /// Notable places and traits.
    #[serde(default)]
    pub special_features: Vec<String>,
}

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

/// Archetype-specific fields of an agent status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "archetype", rename_all = "snake_case")]
pub enum ArchetypeProfile {
    /// Hero fields.
    Hero {
        /// The hero's calling.
        path: String,
        /// Experience level.
        level: u32,
        /// Experience points.
        experience: u32,
        /// Embers this hero has collected.
        #[serde(default)]
        embers_collected: Vec<EmberId>,
    },
    /// Guardian fields.
    Guardian {
        /// What the guardian presides over.
        domain: String,
        /// The ember in this guardian's keeping, if any.
        #[serde(default)]
        ember_guarded: Option<EmberId>,
        /// How roused the guardian is, `[0, 100]`.
        awakening: u32,
        /// Regard for each hero who has challenged it.
        #[serde(default)]
        respect_for_challengers: BTreeMap<AgentId, i32>,
    },
    /// Townsfolk fields.
    Townsfolk {
        /// The agent's trade.
        role: TownsfolkRole,
        /// Free-text occupation.
        occupation: String,
        /// Whether corruption has taken hold.
        is_corrupted: bool,
        /// Personal corruption in `[0, 100]`.
        corruption_level: f64,
    },
}

impl ArchetypeProfile {
    /// The archetype this profile belongs to.
    pub const fn archetype(&self) -> Archetype {
        match self {
            Self::Hero { .. } => Archetype::Hero,
            Self::Guardian { .. } => Archetype::Guardian,
            Self::Townsfolk { .. } => Archetype::Townsfolk,
        }
    }
}

/// The mutable status record of one agent.
///
/// `hp` stays within `[0, max_hp]` after every mutation. Inventory counts
/// never go negative; callers check quantities before removing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStatus {
    /// Unique identifier.
    pub id: AgentId,
    /// Display name.
    pub name: String,
    /// City the agent currently stands in.
    pub location: CityId,
    /// Current hit points.
    pub hp: u32,
    /// Maximum hit points.
    pub max_hp: u32,
    /// Base combat strength.
    pub power: u32,
    /// Items and resources carried.
    #[serde(default)]
    pub inventory: BTreeMap<String, u32>,
    /// Allied agents.
    #[serde(default)]
    pub allies: Vec<AgentId>,
    /// Relationship score towards other agents.
    #[serde(default)]
    pub relationships: BTreeMap<AgentId, i32>,
    /// Archetype-specific fields.
    pub profile: ArchetypeProfile,
}

impl AgentStatus {
    /// The archetype this agent belongs to.
    pub const fn archetype(&self) -> Archetype {
        self.profile.archetype()
    }

    /// Units of an inventory item held.
    pub fn held(&self, item: &str) -> u32 {
        self.inventory.get(item).copied().unwrap_or(0)
    }

    /// Add units of an inventory item.
    pub fn add_item(&mut self, item: &str, amount: u32) {
        let entry = self.inventory.entry(item.to_owned()).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    /// Remove units of an inventory item.
    ///
    /// Returns `false` and leaves the inventory untouched if fewer than
    /// `amount` units are held.
    pub fn remove_item(&mut self, item: &str, amount: u32) -> bool {
        let held = self.held(item);
        if held < amount {
            return false;
        }
        self.inventory.insert(item.to_owned(), held.saturating_sub(amount));
        true
    }

    /// Lose hp, stopping at 0. Returns the hp actually lost.
    pub fn take_damage(&mut self, amount: u32) -> u32 {
        let lost = amount.min(self.hp);
        self.hp = self.hp.saturating_sub(lost);
        lost
    }

    /// Gain hp, stopping at `max_hp`. Returns the hp actually gained.
    pub fn heal(&mut self, amount: u32) -> u32 {
        let before = self.hp;
        self.hp = self.hp.saturating_add(amount).min(self.max_hp);
        self.hp.saturating_sub(before)
    }

    /// Record another agent as an ally once.
    pub fn add_ally(&mut self, ally: &AgentId) {
        if !self.allies.contains(ally) {
            self.allies.push(ally.clone());
        }
    }
}

/// All agent status records, split by archetype.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentRoster {
    /// Hero statuses.
    pub heroes: BTreeMap<AgentId, AgentStatus>,
    /// Guardian statuses.
    pub guardians: BTreeMap<AgentId, AgentStatus>,
    /// Townsfolk statuses.
    pub townsfolk: BTreeMap<AgentId, AgentStatus>,
}

impl AgentRoster {
    /// Insert a status into the map matching its profile.
    pub fn insert(&mut self, status: AgentStatus) {
        let map = match status.archetype() {
            Archetype::Hero => &mut self.heroes,
            Archetype::Guardian => &mut self.guardians,
            Archetype::Townsfolk => &mut self.townsfolk,
        };
        map.insert(status.id.clone(), status);
    }

    /// Look up a status in any of the three maps.
    pub fn get(&self, id: &str) -> Option<&AgentStatus> {
        self.heroes
            .get(id)
            .or_else(|| self.guardians.get(id))
            .or_else(|| self.townsfolk.get(id))
    }

    /// Mutable lookup in any of the three maps.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut AgentStatus> {
        if let Some(status) = self.heroes.get_mut(id) {
            return Some(status);
        }
        if let Some(status) = self.guardians.get_mut(id) {
            return Some(status);
        }
        self.townsfolk.get_mut(id)
    }

    /// Whether any map holds this id.
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// The archetype of a known agent.
    pub fn archetype_of(&self, id: &str) -> Option<Archetype> {
        self.get(id).map(AgentStatus::archetype)
    }

    /// Iterate every status: heroes, then guardians, then townsfolk.
    pub fn iter(&self) -> impl Iterator<Item = &AgentStatus> {
        self.heroes
            .values()
            .chain(self.guardians.values())
            .chain(self.townsfolk.values())
    }

    /// Mutably iterate every status.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut AgentStatus> {
        self.heroes
            .values_mut()
            .chain(self.guardians.values_mut())
            .chain(self.townsfolk.values_mut())
    }

    /// Number of status records.
    pub fn len(&self) -> usize {
        self.heroes
            .len()
            .saturating_add(self.guardians.len())
            .saturating_add(self.townsfolk.len())
    }

    /// Whether the roster is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Corruption & embers
// ---------------------------------------------------------------------------

/// An area overtaken by corruption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorruptedArea {
    /// Unique identifier.
    pub id: AreaId,
    /// Display name.
    pub name: String,
    /// Corruption level in `[0, 100]`.
    pub level: f64,
    /// Flavor of corruption (shadow, void, blood, ...).
    pub corruption_type: String,
    /// Cities that feel this area's influence.
    #[serde(default)]
    pub affected_cities: Vec<CityId>,
    /// Whether the area grows each day.
    pub expanding: bool,
}

/// Corruption across the world.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Corruption {
    /// Current surge intensity in `[0, 100]`.
    pub intensity: f64,
    /// Corrupted areas by id.
    pub areas: BTreeMap<AreaId, CorruptedArea>,
    /// Mean corruption level across all areas.
    pub global: f64,
}

impl Corruption {
    /// Recompute [`Corruption::global`] as the mean area level.
    pub fn recompute_global(&mut self) {
        let count = self.areas.len();
        if count == 0 {
            self.global = 0.0;
            return;
        }
        let total: f64 = self.areas.values().map(|area| area.level).sum();
        #[allow(clippy::cast_precision_loss)]
        let mean = total / count as f64;
        self.global = mean.clamp(0.0, 100.0);
    }
}

/// A collectible world objective held by a guardian.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ember {
    /// Unique identifier.
    pub id: EmberId,
    /// Display name.
    pub name: String,
    /// Guardian keeping the ember.
    pub guardian: Option<AgentId>,
    /// Whether a hero has claimed it.
    pub collected: bool,
    /// The hero who claimed it.
    pub collector: Option<AgentId>,
    /// Where the ember rests.
    pub location: CityId,
    /// Raw power of the ember.
    pub power: u32,
    /// Elemental affinity.
    pub element: String,
}

/// Every ember in the world.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmberSystem {
    /// How many embers exist in the setting.
    pub total: u32,
    /// Known embers by id.
    pub embers: BTreeMap<EmberId, Ember>,
}

impl EmberSystem {
    /// Number of embers already claimed.
    pub fn collected_count(&self) -> u32 {
        let count = self.embers.values().filter(|ember| ember.collected).count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }
}

// ---------------------------------------------------------------------------
// World events
// ---------------------------------------------------------------------------

/// One consequence of a world event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEffect {
    /// What the effect changes.
    pub kind: EffectKind,
    /// What the effect applies to.
    pub target: EffectTarget,
    /// Signed strength of the effect.
    pub magnitude: f64,
    /// Narrative description.
    pub description: String,
}

/// A materialized world event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldEvent {
    /// Unique identifier.
    pub id: EventId,
    /// Display name.
    pub name: String,
    /// Template family.
    pub kind: EventKind,
    /// Reach of the event.
    pub severity: EventSeverity,
    /// Narrative description.
    pub description: String,
    /// Agents drawn into the event.
    pub participants: Vec<AgentId>,
    /// Where the event is centered.
    pub location: Option<CityId>,
    /// Day the event began.
    pub start_day: u64,
    /// Days the event lasts.
    pub duration: u64,
    /// Consequences applied when the event began.
    pub effects: Vec<EventEffect>,
    /// Whether the event is still running.
    pub ongoing: bool,
}

impl WorldEvent {
    /// Whether the event has run its course by `current_day`.
    pub const fn has_expired(&self, current_day: u64) -> bool {
        current_day.saturating_sub(self.start_day) >= self.duration
    }
}

// ---------------------------------------------------------------------------
// World log
// ---------------------------------------------------------------------------

/// One entry in the world's narrative log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Monotonic position in the world's log. Unique per world.
    pub sequence: u64,
    /// Wall-clock time the entry was written.
    pub timestamp: DateTime<Utc>,
    /// Simulation day the entry belongs to.
    pub day: u64,
    /// Entry category.
    pub kind: LogKind,
    /// Agent the entry is about, if any.
    pub agent_id: Option<AgentId>,
    /// Human-readable description.
    pub message: String,
    /// City the entry happened in, if any.
    pub location: Option<CityId>,
    /// Retention weight.
    pub importance: Importance,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Structured extras.
    pub metadata: Option<Value>,
}

/// A log entry before the world stamps it with sequence, time, and day.
#[derive(Debug, Clone, PartialEq)]
pub struct LogDraft {
    /// Entry category.
    pub kind: LogKind,
    /// Retention weight.
    pub importance: Importance,
    /// Human-readable description.
    pub message: String,
    /// Agent the entry is about.
    pub agent_id: Option<AgentId>,
    /// City the entry happened in.
    pub location: Option<CityId>,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Structured extras.
    pub metadata: Option<Value>,
}

impl LogDraft {
    /// A draft of the given kind with no agent, location, tags, or metadata.
    pub fn new(kind: LogKind, importance: Importance, message: impl Into<String>) -> Self {
        Self {
            kind,
            importance,
            message: message.into(),
            agent_id: None,
            location: None,
            tags: Vec::new(),
            metadata: None,
        }
    }

    /// Attach the agent the entry is about.
    #[must_use]
    pub fn agent(mut self, agent_id: &AgentId) -> Self {
        self.agent_id = Some(agent_id.clone());
        self
    }

    /// Attach the city the entry happened in.
    #[must_use]
    pub fn location(mut self, city: &CityId) -> Self {
        self.location = Some(city.clone());
        self
    }

    /// Append a tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Attach structured metadata.
    #[must_use]
    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

// ---------------------------------------------------------------------------
// World state
// ---------------------------------------------------------------------------

/// The single shared world aggregate.
///
/// Constructed once at simulation start and mutated in place. Only the
/// action resolver, world evolution, and the event generator take it by
/// `&mut`; decision providers get `&WorldState`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    /// Current simulation day. Incremented once per daily cycle.
    pub day: u64,
    /// Cities by id.
    pub cities: BTreeMap<CityId, City>,
    /// Agent status records.
    pub agents: AgentRoster,
    /// Corruption state.
    pub corruption: Corruption,
    /// Ember state.
    pub embers: EmberSystem,
    /// Events currently running.
    pub active_events: Vec<WorldEvent>,
    /// Events that have run their course.
    pub completed_events: Vec<WorldEvent>,
    /// World stability in `[0, 100]`.
    pub world_stability: f64,
    /// Ambient magic level in `[0, 100]`.
    pub magic_level: f64,
    /// Narrative log, oldest first.
    pub logs: Vec<LogEntry>,
    /// Sequence number the next log entry receives.
    pub next_log_sequence: u64,
}

impl WorldState {
    /// Stamp a draft and append it to the log. Returns the entry's sequence.
    pub fn push_log(&mut self, draft: LogDraft) -> u64 {
        let sequence = self.next_log_sequence;
        self.next_log_sequence = self.next_log_sequence.saturating_add(1);
        let entry = LogEntry {
            sequence,
            timestamp: Utc::now(),
            day: self.day,
            kind: draft.kind,
            agent_id: draft.agent_id,
            message: draft.message,
            location: draft.location,
            importance: draft.importance,
            tags: draft.tags,
            metadata: draft.metadata,
        };
        self.logs.push(entry);
        sequence
    }

    /// Display name of an agent, falling back to the id.
    pub fn agent_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.agents.get(id).map_or(id, |status| status.name.as_str())
    }
}
