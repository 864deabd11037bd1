//! Boundary with the external decision service.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::TransportError;
use crate::mode::{Mode, ModeSet};
use crate::request::{CompareRequest, SingleRequest};
use crate::track::TrackId;

/// Response of a single-mode decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleDecision {
    pub chosen_track: TrackId,
    #[serde(default)]
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track1_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track2_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track1_loss: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track2_loss: Option<f64>,
}

impl SingleDecision {
    /// Whether the service picked the same track as the human, if they chose.
    #[must_use]
    pub fn agrees_with(&self, manual_choice: Option<TrackId>) -> Option<bool> {
        manual_choice.map(|choice| choice == self.chosen_track)
    }
}

/// One mode's verdict inside a comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeVerdict {
    pub chosen_track: TrackId,
    #[serde(default)]
    pub reason: String,
}

impl ModeVerdict {
    /// First sentence of the reason, with an ellipsis when it was cut.
    #[must_use]
    pub fn short_reason(&self) -> String {
        let first = self.reason.split('.').next().unwrap_or_default();
        if first.is_empty() {
            self.reason.chars().take(100).collect()
        } else if first.len() < self.reason.len() {
            format!("{first}...")
        } else {
            first.to_string()
        }
    }
}

/// Echo of the manual choice as seen by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualEcho {
    #[serde(default)]
    pub manual_choice: Option<TrackId>,
    #[serde(default)]
    pub agreements: BTreeMap<String, bool>,
}

/// Agreement statistics computed by the service and rendered as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgreementStats {
    #[serde(default)]
    pub total_manual_decisions: u32,
    #[serde(default)]
    pub total_ai_agreements: u32,
    #[serde(default)]
    pub agreement_rate: Option<f64>,
}

/// Response of a comparison run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompareOutcome {
    #[serde(default)]
    pub results: BTreeMap<String, ModeVerdict>,
    #[serde(default)]
    pub manual: ManualEcho,
    #[serde(default)]
    pub stats: AgreementStats,
}

impl CompareOutcome {
    /// Results for the enabled modes only, in canonical mode order.
    #[must_use]
    pub fn results_for(&self, modes: ModeSet) -> Vec<(Mode, &ModeVerdict)> {
        modes
            .iter()
            .filter_map(|mode| self.results.get(mode.as_str()).map(|verdict| (mode, verdict)))
            .collect()
    }
}

/// How the statistics panel should present a comparison's stats.
#[derive(Debug, Clone, PartialEq)]
pub enum StatsView {
    /// The user made no manual choice for this run.
    NoManualChoice,
    /// A choice exists but the service has nothing to report yet.
    NotEnoughData,
    Rate {
        total_manual_decisions: u32,
        total_ai_agreements: u32,
        /// Agreement rate as a percentage, one decimal place.
        percent: f64,
    },
}

impl StatsView {
    #[must_use]
    pub fn from_outcome(outcome: &CompareOutcome) -> Self {
        Self::from_stats(outcome.manual.manual_choice, &outcome.stats)
    }

    /// Classify stats for a run whose manual choice is `manual_choice`.
    #[must_use]
    pub fn from_stats(manual_choice: Option<TrackId>, stats: &AgreementStats) -> Self {
        if manual_choice.is_none() {
            return Self::NoManualChoice;
        }
        match stats.agreement_rate {
            Some(rate) if stats.total_manual_decisions > 0 => Self::Rate {
                total_manual_decisions: stats.total_manual_decisions,
                total_ai_agreements: stats.total_ai_agreements,
                percent: (rate * 1000.0).round() / 10.0,
            },
            _ => Self::NotEnoughData,
        }
    }
}

/// Transport to the scoring backend.
///
/// Implementations perform exactly one call per invocation and never retry.
#[async_trait(?Send)]
pub trait DecisionService {
    /// Run a single-mode decision.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] on network failure, a non-success status,
    /// or an undecodable body.
    async fn decide(&self, request: &SingleRequest) -> Result<SingleDecision, TransportError>;

    /// Run every requested mode and return their verdicts side by side.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] on network failure, a non-success status,
    /// or an undecodable body.
    async fn compare(&self, request: &CompareRequest) -> Result<CompareOutcome, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_decision_parses_optional_fields() {
        let decision: SingleDecision = serde_json::from_str(
            r#"{"chosen_track":2,"reason":"fewer lives lost","track1_count":3,"track2_count":1,"track1_loss":9,"track2_loss":2.5,"received":{}}"#,
        )
        .unwrap();
        assert_eq!(decision.chosen_track, TrackId::Two);
        assert_eq!(decision.track1_count, Some(3));
        assert_eq!(decision.track2_loss, Some(2.5));
        assert_eq!(decision.agrees_with(Some(TrackId::Two)), Some(true));
        assert_eq!(decision.agrees_with(None), None);

        let bare: SingleDecision = serde_json::from_str(r#"{"chosen_track":1}"#).unwrap();
        assert!(bare.reason.is_empty());
        assert!(bare.track1_loss.is_none());
    }

    #[test]
    fn compare_outcome_parses_service_shape() {
        let outcome: CompareOutcome = serde_json::from_str(
            r#"{
                "results": {
                    "utilitarian": {"chosen_track": 2, "reason": "Fewer people. Details."},
                    "ml": {"chosen_track": 1, "reason": "model"}
                },
                "manual": {"manual_choice": null, "agreements": {}},
                "stats": {"total_manual_decisions": 0, "total_ai_agreements": 0, "agreement_rate": null}
            }"#,
        )
        .unwrap();
        assert_eq!(outcome.results.len(), 2);
        assert_eq!(StatsView::from_outcome(&outcome), StatsView::NoManualChoice);

        let only_util = outcome.results_for(ModeSet::empty().with(Mode::Utilitarian));
        assert_eq!(only_util.len(), 1);
        assert_eq!(only_util[0].0, Mode::Utilitarian);
        assert_eq!(only_util[0].1.short_reason(), "Fewer people...");
    }

    #[test]
    fn stats_view_reports_rate_when_available() {
        let mut outcome = CompareOutcome::default();
        outcome.manual.manual_choice = Some(TrackId::One);
        assert_eq!(StatsView::from_outcome(&outcome), StatsView::NotEnoughData);

        outcome.stats = AgreementStats {
            total_manual_decisions: 3,
            total_ai_agreements: 2,
            agreement_rate: Some(2.0 / 3.0),
        };
        assert_eq!(
            StatsView::from_outcome(&outcome),
            StatsView::Rate {
                total_manual_decisions: 3,
                total_ai_agreements: 2,
                percent: 66.7,
            }
        );
    }

    #[test]
    fn short_reason_keeps_single_sentence_intact() {
        let verdict = ModeVerdict {
            chosen_track: TrackId::One,
            reason: "No period here".to_string(),
        };
        assert_eq!(verdict.short_reason(), "No period here");
    }
}
