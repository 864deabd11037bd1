//! Live scenario state and its immutable snapshots.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::UnknownIdentifier;
use crate::person::{GroupKey, PersonRecord};
use crate::track::{Group, Track, TrackId};
use crate::weights::WeightConfig;

/// Rule preset used by the deontological mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeonVariant {
    NonIntervention,
    #[default]
    ProtectChildren,
    ProtectInnocent,
    ProtectVulnerable,
}

impl DeonVariant {
    pub const ALL: [Self; 4] = [
        Self::NonIntervention,
        Self::ProtectChildren,
        Self::ProtectInnocent,
        Self::ProtectVulnerable,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NonIntervention => "non_intervention",
            Self::ProtectChildren => "protect_children",
            Self::ProtectInnocent => "protect_innocent",
            Self::ProtectVulnerable => "protect_vulnerable",
        }
    }
}

impl fmt::Display for DeonVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeonVariant {
    type Err = UnknownIdentifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|variant| variant.as_str() == s.trim())
            .ok_or_else(|| UnknownIdentifier::new("DeonVariant", s))
    }
}

/// Everything the user has configured for the next decision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub track1: Track,
    pub track2: Track,
    #[serde(default)]
    pub deon_variant: DeonVariant,
    #[serde(default)]
    pub manual_choice: Option<TrackId>,
    #[serde(default)]
    pub custom_rules: Option<WeightConfig>,
}

impl Scenario {
    #[must_use]
    pub fn new(deon_variant: DeonVariant) -> Self {
        Self {
            deon_variant,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn track(&self, id: TrackId) -> &Track {
        match id {
            TrackId::One => &self.track1,
            TrackId::Two => &self.track2,
        }
    }

    pub const fn track_mut(&mut self, id: TrackId) -> &mut Track {
        match id {
            TrackId::One => &mut self.track1,
            TrackId::Two => &mut self.track2,
        }
    }

    pub fn add_person(&mut self, id: TrackId, person: PersonRecord) {
        self.track_mut(id).push(person);
    }

    pub fn remove_group(&mut self, id: TrackId, key: &GroupKey) -> usize {
        self.track_mut(id).remove_group(key)
    }

    #[must_use]
    pub fn groups(&self, id: TrackId) -> Vec<Group> {
        self.track(id).groups()
    }

    /// Whether both tracks hold at least one person.
    #[must_use]
    pub fn is_populated(&self) -> bool {
        !self.track1.is_empty() && !self.track2.is_empty()
    }

    /// Deep, independent copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> ScenarioSnapshot {
        ScenarioSnapshot(self.clone())
    }
}

/// Frozen copy of a [`Scenario`]. Read-only once taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenarioSnapshot(Scenario);

impl ScenarioSnapshot {
    /// Borrow the frozen state.
    #[must_use]
    pub const fn scenario(&self) -> &Scenario {
        &self.0
    }

    /// Fresh live scenario built from this snapshot; the snapshot itself
    /// stays untouched and can be restored again.
    #[must_use]
    pub fn restore(&self) -> Scenario {
        self.0.clone()
    }

    #[must_use]
    pub const fn manual_choice(&self) -> Option<TrackId> {
        self.0.manual_choice
    }
}
