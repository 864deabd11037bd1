//! Error taxonomy for scenario editing, decision requests and replay.
use thiserror::Error;

use crate::history::EntryId;

/// User input problems caught before anything is sent to the decision service.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("empty-track")]
    EmptyTrack,
    #[error("no-mode-selected")]
    NoModeSelected,
    #[error("incomplete-selection")]
    IncompleteSelection,
}

/// Failure talking to the decision service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("decision service responded with status {0}")]
    Status(u16),
    #[error("decision service unreachable: {0}")]
    Network(String),
    #[error("decision service response could not be decoded: {0}")]
    Decode(String),
}

/// Replay of a history entry that is not (or no longer) in the log.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ReplayError {
    #[error("history entry {0} is not available for replay")]
    MissingEntry(EntryId),
}

/// Errors raised when simulator configuration invariants are violated.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be at least {min} (got {value})")]
    MinViolation {
        field: &'static str,
        min: u64,
        value: u64,
    },
    #[error("configuration could not be parsed: {0}")]
    Parse(String),
}

/// Identifier that is not part of a closed category set.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {category} identifier '{value}'")]
pub struct UnknownIdentifier {
    pub category: &'static str,
    pub value: String,
}

impl UnknownIdentifier {
    #[must_use]
    pub fn new(category: &'static str, value: &str) -> Self {
        Self {
            category,
            value: value.to_string(),
        }
    }
}

/// Everything a simulator command can fail with.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SimulatorError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Replay(#[from] ReplayError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("a decision request is already in flight")]
    RequestInFlight,
    #[error("response does not belong to the outstanding request")]
    StaleRequest,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_use_stable_codes() {
        assert_eq!(ValidationError::EmptyTrack.to_string(), "empty-track");
        assert_eq!(ValidationError::NoModeSelected.to_string(), "no-mode-selected");
    }

    #[test]
    fn simulator_error_is_transparent_over_validation() {
        let err: SimulatorError = ValidationError::NoModeSelected.into();
        assert_eq!(err.to_string(), "no-mode-selected");
    }

    #[test]
    fn simulator_error_wraps_config_errors() {
        let err: SimulatorError = ConfigError::MinViolation {
            field: "history_capacity",
            min: 1,
            value: 0,
        }
        .into();
        assert!(matches!(err, SimulatorError::Config(_)));
        assert_eq!(err.to_string(), "history_capacity must be at least 1 (got 0)");
    }
}
