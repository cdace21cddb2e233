//! Action validation, resolution, and agent-to-agent messaging for the
//! Chronicle simulation.
//!
//! This crate is the logic layer between `chronicle-types` (the data) and
//! `chronicle-core` (the orchestration). Everything here is synchronous and
//! performs no I/O.
//!
//! # Modules
//!
//! - [`actions`] -- Validation pipeline ([`Rejection`]) and per-kind execution handlers.
//! - [`resolver`] -- [`Resolver::apply`], the single entry point for agent-driven mutations.
//! - [`communication`] -- [`CommsChannel`], broadcast and direct chat delivery with history.
//! - [`matcher`] -- Fuzzy resolution of agent references ([`find_agent`]).
//! - [`crafting`] -- Material resolution and shortfall computation for crafting.

pub mod actions;
pub mod communication;
pub mod crafting;
pub mod matcher;
pub mod resolver;

pub use actions::handlers::Outcome;
pub use actions::validation::{Rejection, validate_action};
pub use communication::CommsChannel;
pub use matcher::{MatchTier, find_agent, find_agent_with_tier};
pub use resolver::Resolver;
