//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure mode of start-up. Once the daily
//! cycle is running nothing is fatal.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: chronicle_core::ConfigError,
    },

    /// The simulation refused the world, the config or a provider.
    #[error("simulation error: {source}")]
    Core {
        /// The underlying simulation error.
        #[from]
        source: chronicle_core::CoreError,
    },

    /// The seed world or an agent placement was invalid.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: chronicle_world::WorldError,
    },

    /// The LLM decision runner could not be set up.
    #[error("decision runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: chronicle_runner::RunnerError,
    },

    /// Roster configuration was unreadable or inconsistent.
    #[error("spawner error: {message}")]
    Spawner {
        /// Description of the spawner failure.
        message: String,
    },
}
