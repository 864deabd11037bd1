//! Simulator configuration: history bound, animation timing and defaults.
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigError;
use crate::history::DEFAULT_HISTORY_CAPACITY;
use crate::scenario::DeonVariant;

/// Delays between trolley animation steps, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationTiming {
    #[serde(default = "AnimationTiming::default_split_delay_ms")]
    pub split_delay_ms: u64,
    #[serde(default = "AnimationTiming::default_branch_travel_ms")]
    pub branch_travel_ms: u64,
}

impl AnimationTiming {
    const fn default_split_delay_ms() -> u64 {
        50
    }

    const fn default_branch_travel_ms() -> u64 {
        600
    }

    #[must_use]
    pub const fn split_delay(&self) -> Duration {
        Duration::from_millis(self.split_delay_ms)
    }

    #[must_use]
    pub const fn branch_travel(&self) -> Duration {
        Duration::from_millis(self.branch_travel_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.branch_travel_ms < 1 {
            return Err(ConfigError::MinViolation {
                field: "animation.branch_travel_ms",
                min: 1,
                value: self.branch_travel_ms,
            });
        }
        Ok(())
    }
}

impl Default for AnimationTiming {
    fn default() -> Self {
        Self {
            split_delay_ms: Self::default_split_delay_ms(),
            branch_travel_ms: Self::default_branch_travel_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    #[serde(default = "SimulatorConfig::default_history_capacity")]
    pub history_capacity: usize,
    #[serde(default)]
    pub animation: AnimationTiming,
    #[serde(default)]
    pub default_deon_variant: DeonVariant,
}

impl SimulatorConfig {
    const fn default_history_capacity() -> usize {
        DEFAULT_HISTORY_CAPACITY
    }

    #[must_use]
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Parse a configuration document. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON, or the first bound
    /// violation reported by [`Self::validate`].
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate that configuration values fall within supported bounds.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when any field violates the documented bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_capacity < 1 {
            return Err(ConfigError::MinViolation {
                field: "history_capacity",
                min: 1,
                value: self.history_capacity as u64,
            });
        }
        self.animation.validate()
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            history_capacity: Self::default_history_capacity(),
            animation: AnimationTiming::default(),
            default_deon_variant: DeonVariant::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = SimulatorConfig::default_config();
        assert_eq!(config.history_capacity, 20);
        assert_eq!(config.animation.split_delay(), Duration::from_millis(50));
        assert_eq!(config.animation.branch_travel(), Duration::from_millis(600));
        assert_eq!(config.default_deon_variant, DeonVariant::ProtectChildren);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config =
            SimulatorConfig::from_json(r#"{"history_capacity": 5, "animation": {"split_delay_ms": 0}}"#)
                .unwrap();
        assert_eq!(config.history_capacity, 5);
        assert_eq!(config.animation.split_delay_ms, 0);
        assert_eq!(config.animation.branch_travel_ms, 600);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let err = SimulatorConfig::from_json(r#"{"history_capacity": 0}"#).unwrap_err();
        assert_eq!(
            err,
            ConfigError::MinViolation {
                field: "history_capacity",
                min: 1,
                value: 0,
            }
        );
    }

    #[test]
    fn zero_branch_travel_is_rejected() {
        let mut config = SimulatorConfig::default();
        config.animation.branch_travel_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MinViolation {
                field: "animation.branch_travel_ms",
                ..
            })
        ));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            SimulatorConfig::from_json("{not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
