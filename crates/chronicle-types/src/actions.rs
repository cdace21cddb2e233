//! The closed action vocabulary agents may emit.
//!
//! Decision providers produce loosely-shaped JSON objects such as
//! `{"type": "MOVE", "targetCity": "city-of-dawn"}`. [`Action::from_json`]
//! turns each object into a strictly-typed [`Action`] before it reaches the
//! resolver:
//!
//! - known kinds with a well-formed payload become their variant,
//! - numeric fields are coerced from floats or numeric strings,
//! - anything else becomes [`Action::Unhandled`] carrying the raw payload,
//!   which the resolver logs and ignores.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::enums::{DefenseType, GatherResource};
use crate::ids::{AgentId, AreaId, CityId};

/// One thing an agent wants to do this turn.
///
/// Produced by decision providers and consumed exactly once by the
/// resolver. The wire form is internally tagged by `type` with
/// `SCREAMING_SNAKE_CASE` kinds and `camelCase` payload fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum Action {
    /// Travel to another city.
    Move {
        /// Destination city.
        target_city: CityId,
    },
    /// Look at another agent's status.
    Inspect {
        /// Agent to inspect.
        target_id: AgentId,
    },
    /// Speak to another agent. May start a conversation chain.
    Chat {
        /// Agent id or (possibly partial) name of the addressee.
        target_id: String,
        /// What is said.
        content: String,
    },
    /// Put a proposal to another agent.
    Negotiate {
        /// Counterparty.
        target_id: AgentId,
        /// The proposal text.
        proposal: String,
    },
    /// Become allies with another agent.
    FormAlliance {
        /// The new ally.
        target_id: AgentId,
    },
    /// Strike another agent.
    Attack {
        /// Agent under attack.
        target_id: AgentId,
        /// Maximum damage dealt.
        #[serde(deserialize_with = "lenient_u32")]
        power: u32,
    },
    /// Add a defensive structure to the city the agent stands in.
    BuildDefense {
        /// City to fortify. Must be the actor's location.
        city_id: CityId,
        /// What to build.
        defense_type: DefenseType,
    },
    /// Search the surroundings for food.
    Forage,
    /// Draw a raw resource from a city's stock.
    GatherResources {
        /// Resource to gather.
        resource: GatherResource,
    },
    /// Turn materials into an item using a recipe.
    CraftItem {
        /// Recipe key, for example `"wooden_shield"`.
        item_name: String,
        /// Materials override. Empty means "use the recipe's materials".
        #[serde(default)]
        materials: BTreeMap<String, u32>,
    },
    /// Swap goods with another agent in the same city.
    Trade {
        /// Counterparty.
        target_id: AgentId,
        /// What the initiator gives.
        offer: BTreeMap<String, u32>,
        /// What the initiator receives.
        request: BTreeMap<String, u32>,
        /// Optional note attached to the trade.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Give items and resources to another agent in the same city.
    Gift {
        /// Recipient.
        target_id: AgentId,
        /// Items given, one unit each.
        #[serde(default)]
        items: Vec<String>,
        /// Resource quantities given.
        #[serde(default)]
        resources: BTreeMap<String, u32>,
        /// Optional note attached to the gift.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Push back corruption in an area at the cost of hp.
    CleanseCorruption {
        /// Area to cleanse.
        area_id: AreaId,
        /// Effort spent. Every 100 points removes one corruption level.
        #[serde(deserialize_with = "lenient_u32")]
        power: u32,
    },
    /// Recover hp.
    Rest,
    /// Use a named ability.
    UseAbility {
        /// Ability name.
        ability_name: String,
        /// Optional target agent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_id: Option<String>,
        /// Free-form ability parameters.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },
    /// A world event announced by the event generator.
    WorldEvent {
        /// What the event affects.
        target: String,
        /// Event details.
        #[serde(default)]
        parameters: Value,
    },
    /// An environmental drift announced by the event generator.
    EnvironmentChange {
        /// The scalar that drifted.
        target: String,
        /// Drift details.
        #[serde(default)]
        parameters: Value,
    },
    /// Open-ended escape hatch for provider-specific behaviour.
    Special {
        /// Name of the special action.
        name: String,
        /// Free-form parameters.
        #[serde(default)]
        payload: Value,
    },
    /// A kind outside the vocabulary, or a known kind whose payload did
    /// not validate. Logged and ignored by the resolver.
    #[serde(skip_deserializing)]
    Unhandled {
        /// The `type` the provider sent, or `"<missing>"`.
        kind: String,
        /// The raw object.
        payload: Value,
    },
}

impl Action {
    /// Parse one provider-emitted JSON object into an action.
    ///
    /// Never fails: malformed input becomes [`Action::Unhandled`].
    pub fn from_json(value: &Value) -> Self {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .map_or_else(|| String::from("<missing>"), normalize_kind);

        let mut normalized = value.clone();
        if let Some(object) = normalized.as_object_mut() {
            object.insert(String::from("type"), Value::String(kind.clone()));
        }

        match serde_json::from_value::<Self>(normalized) {
            Ok(action) => action,
            Err(_) => Self::Unhandled {
                kind,
                payload: value.clone(),
            },
        }
    }

    /// The wire name of this action's kind.
    pub fn kind(&self) -> &str {
        match self {
            Self::Move { .. } => "MOVE",
            Self::Inspect { .. } => "INSPECT",
            Self::Chat { .. } => "CHAT",
            Self::Negotiate { .. } => "NEGOTIATE",
            Self::FormAlliance { .. } => "FORM_ALLIANCE",
            Self::Attack { .. } => "ATTACK",
            Self::BuildDefense { .. } => "BUILD_DEFENSE",
            Self::Forage => "FORAGE",
            Self::GatherResources { .. } => "GATHER_RESOURCES",
            Self::CraftItem { .. } => "CRAFT_ITEM",
            Self::Trade { .. } => "TRADE",
            Self::Gift { .. } => "GIFT",
            Self::CleanseCorruption { .. } => "CLEANSE_CORRUPTION",
            Self::Rest => "REST",
            Self::UseAbility { .. } => "USE_ABILITY",
            Self::WorldEvent { .. } => "WORLD_EVENT",
            Self::EnvironmentChange { .. } => "ENVIRONMENT_CHANGE",
            Self::Special { .. } => "SPECIAL",
            Self::Unhandled { kind, .. } => kind,
        }
    }

    /// Whether this is a CHAT action.
    pub const fn is_chat(&self) -> bool {
        matches!(self, Self::Chat { .. })
    }

    /// The safe no-op substituted whenever a decision cannot be obtained.
    pub const fn safe_default() -> Self {
        Self::Rest
    }
}

/// Upper-case a kind and turn spaces or dashes into underscores, so
/// `"form-alliance"` and `"Form Alliance"` both read as `FORM_ALLIANCE`.
fn normalize_kind(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            other => other.to_ascii_uppercase(),
        })
        .collect()
}

/// Accept integers, floats, and numeric strings for a `u32` field.
///
/// Negative values become 0 and values past `u32::MAX` saturate.
fn lenient_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let number = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    let number =
        number.ok_or_else(|| serde::de::Error::custom(format!("expected a number, got {value}")))?;
    if !number.is_finite() {
        return Err(serde::de::Error::custom("expected a finite number"));
    }
    let clamped = number.round().clamp(0.0, f64::from(u32::MAX));
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Ok(clamped as u32)
}
