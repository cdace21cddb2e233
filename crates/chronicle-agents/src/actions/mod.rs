//! Validation and execution of agent actions.
//!
//! # Submodules
//!
//! - [`validation`] -- The staged validation pipeline and [`Rejection`](validation::Rejection).
//! - [`handlers`] -- Execution logic for each action kind.

pub mod handlers;
pub mod validation;
