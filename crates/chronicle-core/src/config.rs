//! Configuration loading and typed config structures for the Chronicle
//! simulation.
//!
//! The configuration is a single YAML document. Every section and every
//! field is optional; missing values take the defaults documented on each
//! field, so an empty file yields [`SimulationConfig::default`].
//!
//! ```yaml
//! scheduler:
//!   interaction_budget: 100
//!   chat_cost: 5
//!   seed: 42
//! retention:
//!   max_logs: 1000
//! simulation:
//!   days: 10
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use chronicle_memory::MemoryConfig;
use chronicle_world::EvolutionConfig;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is unusable.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Daily cycle scheduling.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// World log retention.
    #[serde(default)]
    pub retention: RetentionConfig,

    /// Passive world evolution.
    #[serde(default)]
    pub evolution: EvolutionConfig,

    /// World event generation.
    #[serde(default)]
    pub events: EventsConfig,

    /// Per-agent memory.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Run length.
    #[serde(default)]
    pub simulation: RunConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that parse but cannot drive a simulation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler.max_chain_depth == 0 {
            return Err(ConfigError::Invalid {
                field: "scheduler.max_chain_depth",
                reason: String::from("must be at least 1"),
            });
        }
        if self.retention.recent_fraction_percent > 100 {
            return Err(ConfigError::Invalid {
                field: "retention.recent_fraction_percent",
                reason: format!("{} exceeds 100", self.retention.recent_fraction_percent),
            });
        }
        for (field, chance) in [
            ("events.magic_drift_chance", self.events.magic_drift_chance),
            ("events.stability_drift_chance", self.events.stability_drift_chance),
        ] {
            if !(0.0..=1.0).contains(&chance) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("{chance} is not a probability"),
                });
            }
        }
        Ok(())
    }
}

/// Daily cycle scheduling parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Interaction units available per day (default: 100).
    #[serde(default = "default_interaction_budget")]
    pub interaction_budget: u32,

    /// Units a CHAT action consumes (default: 5).
    #[serde(default = "default_chat_cost")]
    pub chat_cost: u32,

    /// Units any other action consumes (default: 1).
    #[serde(default = "default_action_cost")]
    pub action_cost: u32,

    /// Longest conversation chain, counting the opening line (default: 6).
    #[serde(default = "default_max_chain_depth")]
    pub max_chain_depth: u32,

    /// Milliseconds a decision provider has before the agent rests
    /// instead (default: 7000).
    #[serde(default = "default_decision_timeout_ms")]
    pub decision_timeout_ms: u64,

    /// Seed for turn order and randomized outcomes. Unset means a fresh
    /// seed from the operating system.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interaction_budget: default_interaction_budget(),
            chat_cost: default_chat_cost(),
            action_cost: default_action_cost(),
            max_chain_depth: default_max_chain_depth(),
            decision_timeout_ms: default_decision_timeout_ms(),
            seed: None,
        }
    }
}

/// World log retention parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Entry count above which the log is trimmed (default: 1000).
    #[serde(default = "default_max_logs")]
    pub max_logs: usize,

    /// Share of `max_logs` kept from the most recent entries (default: 70).
    #[serde(default = "default_recent_fraction_percent")]
    pub recent_fraction_percent: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_logs: default_max_logs(),
            recent_fraction_percent: default_recent_fraction_percent(),
        }
    }
}

/// World event generator parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Whether templates fire and scalars drift (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Most events active at once; templates do not fire beyond it
    /// (default: 3).
    #[serde(default = "default_max_active_events")]
    pub max_active_events: usize,

    /// Daily chance the magic level drifts (default: 0.3).
    #[serde(default = "default_magic_drift_chance")]
    pub magic_drift_chance: f64,

    /// Full width of a magic drift; the change falls in
    /// `[-amplitude/2, amplitude/2)` (default: 5.0).
    #[serde(default = "default_magic_drift_amplitude")]
    pub magic_drift_amplitude: f64,

    /// Daily chance world stability drifts (default: 0.2).
    #[serde(default = "default_stability_drift_chance")]
    pub stability_drift_chance: f64,

    /// Full width of a stability drift (default: 3.0).
    #[serde(default = "default_stability_drift_amplitude")]
    pub stability_drift_amplitude: f64,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_active_events: default_max_active_events(),
            magic_drift_chance: default_magic_drift_chance(),
            magic_drift_amplitude: default_magic_drift_amplitude(),
            stability_drift_chance: default_stability_drift_chance(),
            stability_drift_amplitude: default_stability_drift_amplitude(),
        }
    }
}

/// Run length parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Days to simulate (default: 10).
    #[serde(default = "default_days")]
    pub days: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            days: default_days(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

const fn default_interaction_budget() -> u32 {
    100
}

const fn default_chat_cost() -> u32 {
    5
}

const fn default_action_cost() -> u32 {
    1
}

const fn default_max_chain_depth() -> u32 {
    6
}

const fn default_decision_timeout_ms() -> u64 {
    7000
}

const fn default_max_logs() -> usize {
    1000
}

const fn default_recent_fraction_percent() -> u32 {
    70
}

const fn default_true() -> bool {
    true
}

const fn default_max_active_events() -> usize {
    3
}

const fn default_magic_drift_chance() -> f64 {
    0.3
}

const fn default_magic_drift_amplitude() -> f64 {
    5.0
}

const fn default_stability_drift_chance() -> f64 {
    0.2
}

const fn default_stability_drift_amplitude() -> f64 {
    3.0
}

const fn default_days() -> u64 {
    10
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_reference_values() {
        let config = SimulationConfig::default();
        assert_eq!(config.scheduler.interaction_budget, 100);
        assert_eq!(config.scheduler.chat_cost, 5);
        assert_eq!(config.scheduler.max_chain_depth, 6);
        assert_eq!(config.retention.max_logs, 1000);
        assert_eq!(config.retention.recent_fraction_percent, 70);
        assert_eq!(config.memory.stm_max_chars, 8192);
        assert_eq!(config.simulation.days, 10);
        assert!(config.events.enabled);
    }

    #[test]
    fn empty_yaml_is_default() {
        assert_eq!(SimulationConfig::parse("").unwrap(), SimulationConfig::default());
    }

    #[test]
    fn parse_partial_yaml() {
        let yaml = r"
scheduler:
  interaction_budget: 40
  seed: 7
retention:
  max_logs: 200
events:
  enabled: false
memory:
  stm_max_messages: 8
simulation:
  days: 3
";
        let config = SimulationConfig::parse(yaml).unwrap();
        assert_eq!(config.scheduler.interaction_budget, 40);
        assert_eq!(config.scheduler.chat_cost, 5);
        assert_eq!(config.scheduler.seed, Some(7));
        assert_eq!(config.retention.max_logs, 200);
        assert_eq!(config.retention.recent_fraction_percent, 70);
        assert!(!config.events.enabled);
        assert_eq!(config.memory.stm_max_messages, 8);
        assert_eq!(config.memory.ltm_top_k, 5);
        assert_eq!(config.simulation.days, 3);
        assert_eq!(config.evolution, EvolutionConfig::default());
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let err = SimulationConfig::parse("scheduler:\n  max_chain_depth: 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "scheduler.max_chain_depth",
                ..
            }
        ));

        let err = SimulationConfig::parse("events:\n  magic_drift_chance: 1.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let err = SimulationConfig::parse("scheduler: [1, 2").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml { .. }));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = SimulationConfig::from_file(Path::new("/nonexistent/chronicle.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
