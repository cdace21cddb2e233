//! Shared type definitions for the Chronicle simulation.
//!
//! This crate is the single source of truth for the vocabulary shared by
//! the memory subsystem, the resolver, the scheduler, and decision
//! providers.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe identifiers (string slugs and event UUIDs)
//! - [`enums`] -- Enumeration types (importance, archetypes, resources, events)
//! - [`structs`] -- World aggregate and its parts (cities, agents, corruption, log)
//! - [`actions`] -- The closed action vocabulary and its lenient parser
//! - [`messages`] -- Chat messages and delivery channels
//! - [`content`] -- Recipe and role profile records

pub mod actions;
pub mod content;
pub mod enums;
pub mod ids;
pub mod messages;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use actions::Action;
pub use content::{Recipe, RecipeOutput, RoleProfile};
pub use enums::{
    Archetype, CityKind, CityResource, DefenseType, EffectKind, EffectTarget, EventKind,
    EventSeverity, GatherResource, Importance, LogKind, MessageRole, RecipeCategory,
    RecipeDifficulty, TownsfolkRole,
};
pub use ids::{AgentId, AreaId, CityId, EmberId, EventId};
pub use messages::{Channel, ChatMessage, GLOBAL_CHANNEL};
pub use structs::{
    AgentRoster, AgentStatus, ArchetypeProfile, City, CityResources, CorruptedArea, Corruption,
    Defenses, Ember, EmberSystem, EventEffect, LogDraft, LogEntry, WorldEvent, WorldState,
};
