//! Error types for the `chronicle-core` crate.
//!
//! Running a day never fails. These errors come only from assembling a
//! [`Simulation`](crate::Simulation): loading configuration, validating the
//! seed world, and registering decision providers.

use chronicle_types::AgentId;

use crate::config::ConfigError;

/// Errors raised while setting up a simulation.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Configuration could not be loaded or is invalid.
    #[error("configuration error: {source}")]
    Config {
        /// The underlying configuration error.
        #[from]
        source: ConfigError,
    },

    /// The seed world is inconsistent.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: chronicle_world::WorldError,
    },

    /// A provider was registered for an agent with no status record.
    #[error("no agent {0} in the world")]
    UnknownAgent(AgentId),

    /// A second provider was registered for the same agent.
    #[error("agent {0} already has a decision provider")]
    DuplicateProvider(AgentId),
}
