//! Tracks of people and the grouping used for display and scoring.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::person::{GroupKey, PersonRecord};

/// One of the two candidate tracks. Travels on the wire as `1` or `2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TrackId {
    One,
    Two,
}

impl TrackId {
    pub const BOTH: [Self; 2] = [Self::One, Self::Two];

    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }

    /// The track that is not `self`.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::One => Self::Two,
            Self::Two => Self::One,
        }
    }
}

impl TryFrom<u8> for TrackId {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            other => Err(format!("track id must be 1 or 2 (got {other})")),
        }
    }
}

impl From<TrackId> for u8 {
    fn from(value: TrackId) -> Self {
        value.number()
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Track {}", self.number())
    }
}

/// Deduplicated display/scoring unit: one representative and how many
/// equivalent records it stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    #[serde(flatten)]
    pub representative: PersonRecord,
    pub count: u32,
}

impl Group {
    #[must_use]
    pub fn key(&self) -> GroupKey {
        self.representative.key()
    }
}

/// Ordered, append-only list of people on one track.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Track {
    records: Vec<PersonRecord>,
}

impl Track {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, person: PersonRecord) {
        self.records.push(person);
    }

    /// Remove every record equivalent to `key`, returning how many went.
    pub fn remove_group(&mut self, key: &GroupKey) -> usize {
        let before = self.records.len();
        self.records.retain(|person| person.key() != *key);
        before - self.records.len()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    #[must_use]
    pub fn records(&self) -> &[PersonRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn groups(&self) -> Vec<Group> {
        aggregate(&self.records)
    }
}

impl FromIterator<PersonRecord> for Track {
    fn from_iter<I: IntoIterator<Item = PersonRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

/// Group records by identity, keeping first-occurrence order.
#[must_use]
pub fn aggregate(records: &[PersonRecord]) -> Vec<Group> {
    let mut slots: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();

    for person in records {
        let key = person.key();
        if let Some(&slot) = slots.get(&key) {
            groups[slot].count += 1;
        } else {
            slots.insert(key, groups.len());
            groups.push(Group {
                representative: person.clone(),
                count: 1,
            });
        }
    }

    groups
}

/// Inverse of [`aggregate`] up to ordering of equivalent records.
#[must_use]
pub fn expand(groups: &[Group]) -> Vec<PersonRecord> {
    groups
        .iter()
        .flat_map(|group| {
            std::iter::repeat_n(&group.representative, group.count as usize).cloned()
        })
        .collect()
}
