//! Enumeration types for the Chronicle simulation.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// How much a world log entry matters for retention.
///
/// Variants are ordered so that `Importance::High < Importance::Critical`
/// and so on, which lets retention keep everything at or above a floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    /// Failed validations, skipped turns, minor notes.
    Low,
    /// Successful everyday actions.
    Medium,
    /// Day boundaries, defeats, world events.
    High,
    /// World-defining moments. Never trimmed.
    Critical,
}

impl Importance {
    /// Whether retention must always keep entries of this importance.
    pub const fn is_protected(self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }
}

/// The category of a world log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    /// The outcome of an agent action or a scheduler step.
    Action,
    /// A world event started, ended, or drifted.
    Event,
    /// An agent was reduced to zero hp.
    Death,
    /// An ember changed hands.
    EmberCollection,
    /// A guardian was defeated.
    GuardianDefeat,
    /// A decision provider call was recorded.
    AiCall,
}

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

/// The three classes of agent that hold a status record in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    /// An ember-seeking hero.
    Hero,
    /// An ancient guardian. Never takes a proactive turn.
    Guardian,
    /// An ordinary inhabitant with a trade.
    Townsfolk,
}

impl core::fmt::Display for Archetype {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let label = match self {
            Self::Hero => "hero",
            Self::Guardian => "guardian",
            Self::Townsfolk => "townsfolk",
        };
        f.write_str(label)
    }
}

/// The trade of a townsfolk agent, used as the key into the role profile
/// table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TownsfolkRole {
    /// Buys and sells goods.
    Merchant,
    /// Keeps the peace.
    Guard,
    /// Studies lore and magic.
    Scholar,
    /// Builds and crafts.
    Craftsman,
}

impl TownsfolkRole {
    /// All roles, in declaration order.
    pub const ALL: [Self; 4] = [Self::Merchant, Self::Guard, Self::Scholar, Self::Craftsman];
}

/// The author of a message held in agent short-term memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    /// Input presented to the agent (world context, reactions).
    Human,
    /// The agent's own output.
    Ai,
    /// Framework-inserted notes.
    System,
}

impl core::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let label = match self {
            Self::Human => "human",
            Self::Ai => "ai",
            Self::System => "system",
        };
        f.write_str(label)
    }
}

// ---------------------------------------------------------------------------
// Action payload enums
// ---------------------------------------------------------------------------

/// A defensive structure an agent can add to a city.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DefenseType {
    /// A section of city wall.
    Wall,
    /// A watchtower.
    Watchtower,
}

/// A raw resource an agent can gather from a city's stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GatherResource {
    /// Timber, drawn from the city's materials.
    Wood,
    /// Quarried stone, drawn from the city's materials.
    Stone,
    /// Crystallized mana, drawn from the city's mana.
    ManaCrystal,
    /// Provisions, drawn from the city's food.
    Food,
}

impl GatherResource {
    /// The city stock pool this resource is drawn from.
    pub const fn pool(self) -> CityResource {
        match self {
            Self::Wood | Self::Stone => CityResource::Materials,
            Self::ManaCrystal => CityResource::Mana,
            Self::Food => CityResource::Food,
        }
    }

    /// The inventory key a gathered unit is stored under.
    pub const fn inventory_key(self) -> &'static str {
        match self {
            Self::Wood => "wood",
            Self::Stone => "stone",
            Self::ManaCrystal => "mana_crystal",
            Self::Food => "food",
        }
    }
}

/// A pooled resource held by a city.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CityResource {
    /// Food stores.
    Food,
    /// Building materials (wood and stone).
    Materials,
    /// Coin and treasure.
    Wealth,
    /// Ambient magical energy.
    Mana,
}

impl CityResource {
    /// All pooled resources, in declaration order.
    pub const ALL: [Self; 4] = [Self::Food, Self::Materials, Self::Wealth, Self::Mana];
}

impl core::fmt::Display for CityResource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let label = match self {
            Self::Food => "food",
            Self::Materials => "materials",
            Self::Wealth => "wealth",
            Self::Mana => "mana",
        };
        f.write_str(label)
    }
}

/// The character of a city.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CityKind {
    /// A seat of power.
    Capital,
    /// A military stronghold.
    Fortress,
    /// A place steeped in magic.
    Mystical,
    /// A market town.
    Trading,
    /// A small settlement.
    Village,
}

// ---------------------------------------------------------------------------
// World events
// ---------------------------------------------------------------------------

/// How far-reaching a world event is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSeverity {
    /// Local flavor.
    Minor,
    /// Felt across a region.
    Major,
    /// Reshapes the world.
    WorldChanging,
}

impl EventSeverity {
    /// The log importance used when an event of this severity begins.
    pub const fn importance(self) -> Importance {
        match self {
            Self::Minor => Importance::Medium,
            Self::Major => Importance::High,
            Self::WorldChanging => Importance::Critical,
        }
    }
}

/// The template family a world event was generated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Storms, quakes, floods.
    NaturalDisaster,
    /// Mana surges and ember resonance.
    MagicalAnomaly,
    /// A guardian meddles in mortal affairs.
    GuardianInterference,
    /// Time slips and loops.
    TimeAnomaly,
    /// A rift to elsewhere opens.
    DimensionalBreach,
    /// An old prophecy comes true.
    ProphecyFulfillment,
    /// Raw chaos takes form.
    ChaosManifestation,
}

/// What an event effect changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    /// Shifts city resource stocks by a percentage.
    ResourceChange,
    /// Shifts agent hp.
    StatChange,
    /// Shifts the world magic level.
    MagicLevel,
    /// Grants agents a new ability.
    NewAbility,
    /// Shakes world stability.
    RealityShift,
    /// Raises corruption.
    CorruptionSpread,
    /// Clouds agent memories.
    MemoryAlteration,
    /// Bends fate in favor of agents.
    FateIntervention,
    /// Shifts relationships between agents.
    RelationshipChange,
}

/// What an event effect is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectTarget {
    /// One randomly chosen city.
    RandomCity,
    /// Every city.
    AllCities,
    /// Every agent with a status record.
    AllAgents,
    /// The event's resolved location.
    SpecificLocation,
}

// ---------------------------------------------------------------------------
// Recipes
// ---------------------------------------------------------------------------

/// What a crafted item is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecipeCategory {
    /// Offensive gear.
    Weapon,
    /// Worn protection.
    Armor,
    /// Work implements.
    Tool,
    /// Single-use goods.
    Consumable,
    /// Enchanted gear.
    Magical,
    /// Held or placed protection.
    Defense,
}

/// How hard a recipe is to craft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecipeDifficulty {
    /// Anyone can make it.
    Basic,
    /// Needs some practice.
    Intermediate,
    /// Needs real skill.
    Advanced,
    /// Masterwork.
    Master,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn importance_orders_low_to_critical() {
        assert!(Importance::Low < Importance::Medium);
        assert!(Importance::High < Importance::Critical);
        assert!(Importance::High.is_protected());
        assert!(!Importance::Medium.is_protected());
    }

    #[test]
    fn gather_resources_map_to_pools() {
        assert_eq!(GatherResource::Stone.pool(), CityResource::Materials);
        assert_eq!(GatherResource::ManaCrystal.pool(), CityResource::Mana);
        assert_eq!(GatherResource::ManaCrystal.inventory_key(), "mana_crystal");
    }

    #[test]
    fn action_facing_enums_use_upper_case() {
        let wall: DefenseType = serde_json::from_str("\"WALL\"").unwrap();
        assert_eq!(wall, DefenseType::Wall);
        let crystal: GatherResource = serde_json::from_str("\"MANA_CRYSTAL\"").unwrap();
        assert_eq!(crystal, GatherResource::ManaCrystal);
    }
}
