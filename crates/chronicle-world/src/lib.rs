//! Seed world, content tables, and passive evolution for the Chronicle
//! simulation.
//!
//! # Modules
//!
//! - [`starting_world`] -- The default six-city world, status builders for
//!   heroes, guardians, and townsfolk, and reference validation.
//! - [`evolution`] -- End-of-day corruption spread, resource regeneration,
//!   and prosperity drift.
//! - [`recipes`] -- The crafting recipe table and [`get_recipe`].
//! - [`profiles`] -- Townsfolk role profiles and [`role_profile`].
//! - [`error`] -- Errors raised while assembling a world.

pub mod error;
pub mod evolution;
pub mod profiles;
pub mod recipes;
pub mod starting_world;

// Re-export primary types at crate root.
pub use error::WorldError;
pub use evolution::{EvolutionConfig, EvolutionReport, RegenBand, evolve};
pub use profiles::role_profile;
pub use recipes::{all_recipes, available_recipes, get_recipe, recipe_key};
pub use starting_world::{
    add_agent, create_starting_world, guardian_status, hero_status, townsfolk_status,
    validate_world,
};
