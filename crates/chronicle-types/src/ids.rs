//! Type-safe identifier wrappers.
//!
//! World entities (agents, cities, corrupted areas, embers) are keyed by
//! human-readable string slugs such as `"city-of-dawn"` or `"hero_3"`. The
//! slugs are what decision providers see in their context and echo back in
//! their actions, so they stay strings; the newtypes keep a city id from
//! being passed where an agent id is expected.
//!
//! World events are generated at runtime and use UUID v7 (time-ordered)
//! identifiers instead.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a newtype wrapper around [`String`] with standard derives.
macro_rules! define_slug_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create an identifier from any string-like value.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl core::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

define_slug_id! {
    /// Unique identifier for an agent (hero, guardian, or townsfolk).
    AgentId
}

define_slug_id! {
    /// Unique identifier for a city.
    CityId
}

define_slug_id! {
    /// Unique identifier for a corrupted area.
    AreaId
}

define_slug_id! {
    /// Unique identifier for an ember.
    EmberId
}

/// Unique identifier for a materialized world event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    /// Create a new identifier using UUID v7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for EventId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}
