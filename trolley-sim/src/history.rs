//! Bounded, newest-first log of past decisions.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque, vec_deque};
use std::fmt;

use crate::error::ReplayError;
use crate::mode::{Mode, ModeSet};
use crate::scenario::ScenarioSnapshot;
use crate::service::{AgreementStats, CompareOutcome, ModeVerdict, SingleDecision, StatsView};
use crate::track::TrackId;

/// Number of entries the log keeps before evicting the oldest.
pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

/// Monotonic identifier assigned when an entry is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What kind of run produced an entry, with its results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HistoryKind {
    Single {
        mode: Mode,
        result: SingleDecision,
    },
    Compare {
        modes: ModeSet,
        results: BTreeMap<String, ModeVerdict>,
        stats: AgreementStats,
    },
}

impl HistoryKind {
    #[must_use]
    pub fn compare(modes: ModeSet, outcome: CompareOutcome) -> Self {
        Self::Compare {
            modes,
            results: outcome.results,
            stats: outcome.stats,
        }
    }

    /// Short label for list rendering: the mode, or the enabled modes.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Single { mode, .. } => mode.to_string(),
            Self::Compare { modes, .. } => modes.to_string(),
        }
    }

    /// Track chosen by each mode in this entry.
    #[must_use]
    pub fn choices(&self) -> Vec<(String, TrackId)> {
        match self {
            Self::Single { mode, result } => vec![(mode.to_string(), result.chosen_track)],
            Self::Compare { results, .. } => results
                .iter()
                .map(|(mode, verdict)| (mode.clone(), verdict.chosen_track))
                .collect(),
        }
    }
}

/// A recorded decision together with the scenario it was made for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    id: EntryId,
    kind: HistoryKind,
    snapshot: ScenarioSnapshot,
    timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    #[must_use]
    pub const fn id(&self) -> EntryId {
        self.id
    }

    #[must_use]
    pub const fn kind(&self) -> &HistoryKind {
        &self.kind
    }

    #[must_use]
    pub const fn snapshot(&self) -> &ScenarioSnapshot {
        &self.snapshot
    }

    /// The human's answer at the time the request was sent.
    #[must_use]
    pub const fn manual_choice(&self) -> Option<TrackId> {
        self.snapshot.manual_choice()
    }

    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Statistics panel state for comparison entries.
    #[must_use]
    pub fn stats_view(&self) -> Option<StatsView> {
        match &self.kind {
            HistoryKind::Compare { stats, .. } => {
                Some(StatsView::from_stats(self.manual_choice(), stats))
            }
            HistoryKind::Single { .. } => None,
        }
    }

    /// For single runs with a manual choice: did the service agree?
    #[must_use]
    pub fn manual_agrees(&self) -> Option<bool> {
        match &self.kind {
            HistoryKind::Single { result, .. } => result.agrees_with(self.manual_choice()),
            HistoryKind::Compare { .. } => None,
        }
    }
}

/// Ring of at most `capacity` entries, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryLog {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
    next_id: u64,
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryLog {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    /// A log holding at most `capacity` entries (at least one).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
            next_id: 1,
        }
    }

    /// Record a finished run, evicting the oldest entry when full.
    pub fn record(
        &mut self,
        kind: HistoryKind,
        snapshot: ScenarioSnapshot,
        timestamp: DateTime<Utc>,
    ) -> EntryId {
        let id = EntryId(self.next_id);
        self.next_id += 1;
        self.entries.push_front(HistoryEntry {
            id,
            kind,
            snapshot,
            timestamp,
        });
        if self.entries.len() > self.capacity
            && let Some(evicted) = self.entries.pop_back()
        {
            log::debug!("history full, evicted entry {}", evicted.id);
        }
        id
    }

    /// Stored snapshot for an entry, unmodified.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::MissingEntry`] when the entry was evicted or never
    /// existed.
    pub fn replay(&self, id: EntryId) -> Result<&ScenarioSnapshot, ReplayError> {
        self.get(id)
            .map(HistoryEntry::snapshot)
            .ok_or(ReplayError::MissingEntry(id))
    }

    #[must_use]
    pub fn get(&self, id: EntryId) -> Option<&HistoryEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Newest-first, read-only view; every call starts a fresh pass.
    pub fn list(&self) -> vec_deque::Iter<'_, HistoryEntry> {
        self.entries.iter()
    }

    /// Display ordinal for an entry: the oldest retained entry is `1`.
    #[must_use]
    pub fn ordinal(&self, index: usize) -> usize {
        self.entries.len().saturating_sub(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<'a> IntoIterator for &'a HistoryLog {
    type Item = &'a HistoryEntry;
    type IntoIter = vec_deque::Iter<'a, HistoryEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.list()
    }
}
