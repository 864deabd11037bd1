//! In-process stand-in for the decision service.
//!
//! Scores tracks the way the scoring backend's weighted utilitarian rule does:
//! each person is worth age + role + flag weights (unknown age or role counts
//! 1, unknown flags 0), the track with the lower total loss is sacrificed, and
//! ties fall back to head count and then to Track 1.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use trolley_sim::{
    AgeCategory, AgreementStats, CompareOutcome, CompareRequest, DecisionService, DeonVariant,
    ManualEcho, Mode, ModeVerdict, PersonRecord, SingleDecision, SingleRequest, TrackId,
    TransportError, WeightConfig,
};

#[derive(Debug, Default)]
pub struct StubDecisionService {
    calls: Cell<u32>,
    failure: RefCell<Option<TransportError>>,
    stats: RefCell<AgreementStats>,
}

struct TrackScore {
    count: u32,
    loss: i64,
}

/// Both tracks as the service reads them off the wire.
#[derive(Deserialize)]
struct WireTracks {
    track1: Vec<PersonRecord>,
    track2: Vec<PersonRecord>,
}

impl WireTracks {
    fn read<R: Serialize>(request: &R) -> Result<Self, TransportError> {
        serde_json::to_value(request)
            .and_then(serde_json::from_value)
            .map_err(|err| TransportError::Decode(err.to_string()))
    }
}

fn score(people: &[PersonRecord], rules: &WeightConfig) -> TrackScore {
    let mut count = 0;
    let mut loss = 0_i64;
    for person in people {
        let age = rules.age_weights.get(person.age.as_str()).copied().unwrap_or(1);
        let role = rules.role_weights.get(person.role.as_str()).copied().unwrap_or(1);
        let flags: i32 = person
            .flags
            .iter()
            .map(|flag| rules.flag_weights.get(flag.as_str()).copied().unwrap_or(0))
            .sum();
        count += 1;
        loss += i64::from(age + role + flags);
    }
    TrackScore { count, loss }
}

fn weighted_choice(
    track1: &[PersonRecord],
    track2: &[PersonRecord],
    rules: &WeightConfig,
) -> (TrackId, TrackScore, TrackScore) {
    let one = score(track1, rules);
    let two = score(track2, rules);
    let chosen = if one.loss != two.loss {
        if one.loss < two.loss { TrackId::One } else { TrackId::Two }
    } else if two.count < one.count {
        TrackId::Two
    } else {
        TrackId::One
    };
    (chosen, one, two)
}

fn has_age(people: &[PersonRecord], age: AgeCategory) -> bool {
    people.iter().any(|person| person.age == age)
}

fn verdict(
    mode: Mode,
    track1: &[PersonRecord],
    track2: &[PersonRecord],
    variant: DeonVariant,
    custom: Option<&WeightConfig>,
) -> (TrackId, String, TrackScore, TrackScore) {
    let defaults = WeightConfig::default_config();
    let rules = match (mode, custom) {
        (Mode::Custom, Some(rules)) => merged(&defaults, rules),
        _ => defaults,
    };
    let (mut chosen, one, two) = weighted_choice(track1, track2, &rules);
    let mut reason = format!(
        "{mode}: {chosen} sacrificed. Losses were {} and {}.",
        one.loss, two.loss
    );
    if mode == Mode::Deontological {
        match variant {
            DeonVariant::NonIntervention => {
                chosen = TrackId::One;
                reason = "Non-intervention: the trolley stays on Track 1.".to_string();
            }
            DeonVariant::ProtectChildren => {
                let kids1 = has_age(track1, AgeCategory::Child);
                let kids2 = has_age(track2, AgeCategory::Child);
                if kids1 != kids2 {
                    chosen = if kids1 { TrackId::Two } else { TrackId::One };
                    reason = format!("Protect children: {chosen} has no children.");
                }
            }
            DeonVariant::ProtectInnocent | DeonVariant::ProtectVulnerable => {}
        }
    }
    (chosen, reason, one, two)
}

fn merged(defaults: &WeightConfig, custom: &WeightConfig) -> WeightConfig {
    let mut rules = defaults.clone();
    rules.age_weights.extend(custom.age_weights.clone());
    rules.role_weights.extend(custom.role_weights.clone());
    rules.flag_weights.extend(custom.flag_weights.clone());
    rules
}

impl StubDecisionService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following call fail with `error` until cleared.
    pub fn fail_with(&self, error: Option<TransportError>) {
        *self.failure.borrow_mut() = error;
    }

    #[must_use]
    pub fn calls(&self) -> u32 {
        self.calls.get()
    }

    fn enter(&self) -> Result<(), TransportError> {
        self.calls.set(self.calls.get() + 1);
        match self.failure.borrow().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Synchronous form of [`DecisionService::decide`].
    ///
    /// # Errors
    ///
    /// Returns the configured failure, if any.
    pub fn answer_single(&self, request: &SingleRequest) -> Result<SingleDecision, TransportError> {
        self.enter()?;
        let tracks = WireTracks::read(request)?;
        let variant = request.deon_variant.unwrap_or_default();
        let (chosen_track, reason, one, two) = verdict(
            request.mode,
            &tracks.track1,
            &tracks.track2,
            variant,
            request.custom_rules.as_ref(),
        );
        #[allow(clippy::cast_precision_loss)]
        let (track1_loss, track2_loss) = (one.loss as f64, two.loss as f64);
        Ok(SingleDecision {
            chosen_track,
            reason,
            track1_count: Some(one.count),
            track2_count: Some(two.count),
            track1_loss: Some(track1_loss),
            track2_loss: Some(track2_loss),
        })
    }

    /// Synchronous form of [`DecisionService::compare`].
    ///
    /// # Errors
    ///
    /// Returns the configured failure, if any.
    pub fn answer_compare(&self, request: &CompareRequest) -> Result<CompareOutcome, TransportError> {
        self.enter()?;
        let tracks = WireTracks::read(request)?;
        let mut modes = vec![Mode::Utilitarian, Mode::Deontological];
        if request.custom_rules.is_some() {
            modes.push(Mode::Custom);
        }
        if request.include_ml {
            modes.push(Mode::Ml);
        }

        let mut results = BTreeMap::new();
        for mode in modes {
            let (chosen_track, reason, _, _) = verdict(
                mode,
                &tracks.track1,
                &tracks.track2,
                request.deon_variant,
                request.custom_rules.as_ref(),
            );
            results.insert(
                mode.to_string(),
                ModeVerdict {
                    chosen_track,
                    reason,
                },
            );
        }

        let mut manual = ManualEcho {
            manual_choice: request.manual_choice,
            agreements: BTreeMap::new(),
        };
        let mut stats = self.stats.borrow_mut();
        if let Some(choice) = request.manual_choice {
            stats.total_manual_decisions += 1;
            for (mode, verdict) in &results {
                manual
                    .agreements
                    .insert(mode.clone(), verdict.chosen_track == choice);
            }
            if manual.agreements.values().any(|agrees| *agrees) {
                stats.total_ai_agreements += 1;
            }
        }
        let (manual_total, agreed) = (stats.total_manual_decisions, stats.total_ai_agreements);
        stats.agreement_rate =
            (manual_total > 0).then(|| f64::from(agreed) / f64::from(manual_total));

        Ok(CompareOutcome {
            results,
            manual,
            stats: stats.clone(),
        })
    }
}

#[async_trait(?Send)]
impl DecisionService for StubDecisionService {
    async fn decide(&self, request: &SingleRequest) -> Result<SingleDecision, TransportError> {
        self.answer_single(request)
    }

    async fn compare(&self, request: &CompareRequest) -> Result<CompareOutcome, TransportError> {
        self.answer_compare(request)
    }
}
