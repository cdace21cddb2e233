//! Lookup-table record types: crafting recipes and townsfolk role
//! profiles. The tables themselves live in `chronicle-world`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::enums::{RecipeCategory, RecipeDifficulty, TownsfolkRole};
use crate::ids::CityId;

/// What a recipe produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeOutput {
    /// Inventory key of the produced item.
    pub item: String,
    /// Units produced per craft.
    pub quantity: u32,
}

/// A crafting recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    /// Display name.
    pub name: String,
    /// Required inventory items and quantities.
    pub materials: BTreeMap<String, u32>,
    /// Produced item.
    pub output: RecipeOutput,
    /// Use of the item.
    pub category: RecipeCategory,
    /// Skill required.
    pub difficulty: RecipeDifficulty,
    /// Days of work, informational only.
    pub crafting_time: u32,
}

/// Starting parameters and flavor for a townsfolk role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleProfile {
    /// The role described.
    pub role: TownsfolkRole,
    /// Display title.
    pub title: String,
    /// Starting and maximum hp.
    pub max_hp: u32,
    /// Base combat strength.
    pub power: u32,
    /// Items a new agent of this role carries.
    pub starting_inventory: BTreeMap<String, u32>,
    /// Cities this role gravitates to, most preferred first.
    pub preferred_locations: Vec<CityId>,
    /// Skills mentioned in prompts.
    pub skills: Vec<String>,
}
