//! Error types for the `chronicle-world` crate.
//!
//! These are raised only when a world is assembled or validated. Running a
//! simulation never produces a [`WorldError`].

use chronicle_types::{AgentId, AreaId, CityId, EmberId};

/// Errors that can occur while building or validating a world.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// A city was referenced but does not exist.
    #[error("city not found: {0}")]
    CityNotFound(CityId),

    /// An agent was referenced but has no status record.
    #[error("agent not found: {0}")]
    AgentNotFound(AgentId),

    /// A corrupted area points at a city that does not exist.
    #[error("area {area} affects unknown city {city}")]
    AreaCityNotFound {
        /// The offending area.
        area: AreaId,
        /// The missing city.
        city: CityId,
    },

    /// An ember was referenced but does not exist.
    #[error("ember not found: {0}")]
    EmberNotFound(EmberId),

    /// The same agent id was registered twice.
    #[error("duplicate agent id: {0}")]
    DuplicateAgent(AgentId),
}
