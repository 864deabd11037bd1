//! Outbound payloads for the decision service.
//!
//! Builders are pure: the same scenario and mode selection always produce the
//! same payload, and serialization order is fixed.
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::mode::{Mode, ModeSet};
use crate::scenario::{DeonVariant, Scenario};
use crate::track::{Group, TrackId};
use crate::weights::WeightConfig;

/// Payload for `POST /decide_v2`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleRequest {
    #[serde(with = "per_person")]
    pub track1: Vec<Group>,
    #[serde(with = "per_person")]
    pub track2: Vec<Group>,
    pub mode: Mode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deon_variant: Option<DeonVariant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_rules: Option<WeightConfig>,
}

/// Payload for `POST /compare`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareRequest {
    #[serde(with = "per_person")]
    pub track1: Vec<Group>,
    #[serde(with = "per_person")]
    pub track2: Vec<Group>,
    /// Always utilitarian; the service fans out to the other modes itself.
    pub mode: Mode,
    pub deon_variant: DeonVariant,
    pub custom_rules: Option<WeightConfig>,
    pub include_ml: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_choice: Option<TrackId>,
}

/// Groups go over the wire as one record per person, in group order. The
/// service counts heads and sums losses per record, so a group of `n` is sent
/// `n` times.
mod per_person {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::person::PersonRecord;
    use crate::track::{Group, aggregate};

    pub fn serialize<S>(groups: &[Group], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(groups.iter().flat_map(|group| {
            std::iter::repeat_n(&group.representative, group.count as usize)
        }))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Group>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let records = Vec::<PersonRecord>::deserialize(deserializer)?;
        Ok(aggregate(&records))
    }
}

fn ensure_populated(scenario: &Scenario) -> Result<(), ValidationError> {
    if scenario.is_populated() {
        Ok(())
    } else {
        Err(ValidationError::EmptyTrack)
    }
}

/// Build the payload for a single-mode decision.
///
/// # Errors
///
/// Returns [`ValidationError::EmptyTrack`] when either track has nobody on it.
pub fn build_single(scenario: &Scenario, mode: Mode) -> Result<SingleRequest, ValidationError> {
    ensure_populated(scenario)?;

    let deon_variant = (mode == Mode::Deontological).then_some(scenario.deon_variant);
    let custom_rules = if mode == Mode::Custom {
        scenario.custom_rules.clone()
    } else {
        None
    };

    Ok(SingleRequest {
        track1: scenario.track1.groups(),
        track2: scenario.track2.groups(),
        mode,
        deon_variant,
        custom_rules,
    })
}

/// Build the payload for a multi-mode comparison.
///
/// # Errors
///
/// Returns [`ValidationError::NoModeSelected`] when `modes` is empty, then
/// [`ValidationError::EmptyTrack`] when either track has nobody on it.
pub fn build_compare(
    scenario: &Scenario,
    modes: ModeSet,
) -> Result<CompareRequest, ValidationError> {
    if modes.is_empty() {
        return Err(ValidationError::NoModeSelected);
    }
    ensure_populated(scenario)?;

    let custom_rules = match &scenario.custom_rules {
        Some(rules) => Some(rules.clone()),
        None if modes.contains(Mode::Custom) => Some(WeightConfig::default_config()),
        None => None,
    };

    Ok(CompareRequest {
        track1: scenario.track1.groups(),
        track2: scenario.track2.groups(),
        mode: Mode::Utilitarian,
        deon_variant: scenario.deon_variant,
        custom_rules,
        include_ml: modes.contains(Mode::Ml),
        manual_choice: scenario.manual_choice,
    })
}
