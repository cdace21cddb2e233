//! Orchestration for the Chronicle simulation.
//!
//! This crate owns the daily cycle that drives the world forward: agent
//! turns under an interaction budget, conversation chains, passive world
//! evolution, the world event generator, and log retention.
//!
//! # Modules
//!
//! - [`config`] -- YAML configuration into strongly-typed structs.
//! - [`decision`] -- The [`DecisionProvider`] trait, [`StubDecisionProvider`],
//!   and [`ScriptedProvider`].
//! - [`context`] -- The enhanced world context shown to providers.
//! - [`scheduler`] -- [`Simulation`] and the daily cycle.
//! - [`conversation`] -- Bounded conversation chains.
//! - [`events`] -- Rule-based world event generator.
//! - [`retention`] -- End-of-day world log trimming.
//! - [`runner`] -- Multi-day runs and the [`UpdateCallback`] hook.
//! - [`error`] -- Set-up errors.

pub mod config;
pub mod context;
pub mod conversation;
pub mod decision;
pub mod error;
pub mod events;
pub mod retention;
pub mod runner;
pub mod scheduler;

pub use config::{ConfigError, SimulationConfig};
pub use context::build_world_context;
pub use conversation::{ChainEnd, ChainReport};
pub use decision::{AiCallRecord, DecisionProvider, ScriptedProvider, StubDecisionProvider};
pub use error::CoreError;
pub use events::{EventCycle, EventGenerator, EventTemplate, GENERATOR_ID, default_templates};
pub use retention::trim_logs;
pub use runner::{NoOpCallback, RunSummary, SimulationUpdate, UpdateCallback};
pub use scheduler::{DaySummary, Simulation};
