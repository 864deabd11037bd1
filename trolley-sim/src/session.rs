//! Owned simulator context.
//!
//! [`Simulator`] holds the live scenario, per-track selections, the history log
//! and the animator. Decision requests are split into a `begin_*` half that
//! validates and snapshots the scenario, and a `complete_*` half that applies
//! the service's answer, so hosts can await the service however they like.
use chrono::Utc;
use std::rc::{Rc, Weak};

use crate::animation::{TimerRequest, TimerToken, TrolleyAnimator};
use crate::config::SimulatorConfig;
use crate::error::{ConfigError, SimulatorError, TransportError};
use crate::history::{EntryId, HistoryKind, HistoryLog};
use crate::mode::{Mode, ModeSet};
use crate::person::{GroupKey, PersonRecord};
use crate::request::{CompareRequest, SingleRequest, build_compare, build_single};
use crate::scenario::{DeonVariant, Scenario, ScenarioSnapshot};
use crate::selection::{Selection, SelectionField, SelectionState};
use crate::service::{CompareOutcome, DecisionService, SingleDecision};
use crate::track::{Group, TrackId};
use crate::weights::WeightConfig;

/// A request that has been validated and handed out, awaiting its response.
///
/// The simulator counts the request as in flight only while a
/// `PendingRequest` for it is alive; dropping it (or cancelling the future
/// that owns it) releases the slot.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest<P> {
    sequence: u64,
    _lease: Rc<()>,
    modes: ModeSet,
    snapshot: ScenarioSnapshot,
    payload: P,
}

impl<P> PendingRequest<P> {
    /// Payload to send to the decision service.
    #[must_use]
    pub const fn payload(&self) -> &P {
        &self.payload
    }

    /// Scenario as it was when the request was built.
    #[must_use]
    pub const fn snapshot(&self) -> &ScenarioSnapshot {
        &self.snapshot
    }

    #[must_use]
    pub const fn modes(&self) -> ModeSet {
        self.modes
    }
}

/// Result of a completed single decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingleCompletion {
    pub entry: EntryId,
    pub chosen_track: TrackId,
    /// First animation timer for the host to schedule.
    pub timer: TimerRequest,
}

#[derive(Debug, Clone)]
pub struct Simulator {
    config: SimulatorConfig,
    scenario: Scenario,
    selections: SelectionState,
    history: HistoryLog,
    animator: TrolleyAnimator,
    in_flight: Option<InFlight>,
    next_sequence: u64,
}

/// Outstanding request: its sequence and a handle on the pending lease.
#[derive(Debug, Clone)]
struct InFlight {
    sequence: u64,
    lease: Weak<()>,
}

impl InFlight {
    fn is_live(&self) -> bool {
        self.lease.strong_count() > 0
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::from_valid_config(SimulatorConfig::default())
    }
}

impl Simulator {
    /// Create a simulator with an empty scenario.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when `config` fails validation.
    pub fn new(config: SimulatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: SimulatorConfig) -> Self {
        Self {
            scenario: Scenario::new(config.default_deon_variant),
            selections: SelectionState::default(),
            history: HistoryLog::with_capacity(config.history_capacity),
            animator: TrolleyAnimator::new(config.animation),
            in_flight: None,
            next_sequence: 1,
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    #[must_use]
    pub const fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    #[must_use]
    pub fn groups(&self, track: TrackId) -> Vec<Group> {
        self.scenario.groups(track)
    }

    #[must_use]
    pub const fn history(&self) -> &HistoryLog {
        &self.history
    }

    #[must_use]
    pub const fn animator(&self) -> &TrolleyAnimator {
        &self.animator
    }

    #[must_use]
    pub const fn selection(&self, track: TrackId) -> &Selection {
        self.selections.get(track)
    }

    #[must_use]
    pub fn is_request_in_flight(&self) -> bool {
        self.in_flight.as_ref().is_some_and(InFlight::is_live)
    }

    // Editing

    pub fn select(&mut self, track: TrackId, field: SelectionField) -> &Selection {
        self.selections.apply(track, field)
    }

    /// Add the person currently selected for `track`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ValidationError::IncompleteSelection`] when age or
    /// role is not picked; the track is left unchanged. On success the
    /// track's selection starts over.
    pub fn add_selected(&mut self, track: TrackId) -> Result<PersonRecord, SimulatorError> {
        let person = self.selections.commit(track)?;
        self.scenario.add_person(track, person.clone());
        Ok(person)
    }

    pub fn add_person(&mut self, track: TrackId, person: PersonRecord) {
        self.scenario.add_person(track, person);
    }

    /// Remove every record in the group identified by `key`.
    pub fn remove_group(&mut self, track: TrackId, key: &GroupKey) -> usize {
        let removed = self.scenario.remove_group(track, key);
        log::debug!("removed {removed} record(s) of group {key} from {track}");
        removed
    }

    pub fn clear_track(&mut self, track: TrackId) {
        self.scenario.track_mut(track).clear();
    }

    pub fn set_deon_variant(&mut self, variant: DeonVariant) {
        self.scenario.deon_variant = variant;
    }

    pub fn set_manual_choice(&mut self, choice: Option<TrackId>) {
        self.scenario.manual_choice = choice;
    }

    pub fn set_custom_rules(&mut self, rules: Option<WeightConfig>) {
        self.scenario.custom_rules = rules;
    }

    // Requests

    fn ensure_idle(&self) -> Result<(), SimulatorError> {
        if self.is_request_in_flight() {
            log::warn!("decision request rejected: another request is in flight");
            return Err(SimulatorError::RequestInFlight);
        }
        Ok(())
    }

    fn issue<P>(&mut self, modes: ModeSet, payload: P) -> PendingRequest<P> {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let lease = Rc::new(());
        self.in_flight = Some(InFlight {
            sequence,
            lease: Rc::downgrade(&lease),
        });
        PendingRequest {
            sequence,
            _lease: lease,
            modes,
            snapshot: self.scenario.snapshot(),
            payload,
        }
    }

    /// Release the in-flight marker held by `pending`.
    fn settle<P>(&mut self, pending: &PendingRequest<P>) -> Result<(), SimulatorError> {
        if self.in_flight.as_ref().map(|flight| flight.sequence) != Some(pending.sequence) {
            log::warn!("discarding response for stale request {}", pending.sequence);
            return Err(SimulatorError::StaleRequest);
        }
        self.in_flight = None;
        Ok(())
    }

    /// Abandon `pending` without recording anything.
    ///
    /// Dropping the request has the same effect; this only makes it explicit
    /// and logs it.
    pub fn cancel<P>(&mut self, pending: PendingRequest<P>) {
        if self.settle(&pending).is_ok() {
            log::debug!("request {} cancelled", pending.sequence);
        }
    }

    /// Validate and snapshot the scenario for a single-mode decision.
    ///
    /// # Errors
    ///
    /// Returns [`SimulatorError::RequestInFlight`] while another request is
    /// outstanding, or a validation error when a track is empty.
    pub fn begin_single(
        &mut self,
        mode: Mode,
    ) -> Result<PendingRequest<SingleRequest>, SimulatorError> {
        self.ensure_idle()?;
        let payload = build_single(&self.scenario, mode).inspect_err(|err| {
            log::warn!("single {mode} request rejected: {err}");
        })?;
        Ok(self.issue(ModeSet::empty().with(mode), payload))
    }

    /// Validate and snapshot the scenario for a comparison.
    ///
    /// # Errors
    ///
    /// Returns [`SimulatorError::RequestInFlight`] while another request is
    /// outstanding, or a validation error for an empty mode set or track.
    pub fn begin_compare(
        &mut self,
        modes: ModeSet,
    ) -> Result<PendingRequest<CompareRequest>, SimulatorError> {
        self.ensure_idle()?;
        let payload = build_compare(&self.scenario, modes).inspect_err(|err| {
            log::warn!("compare request rejected: {err}");
        })?;
        Ok(self.issue(modes, payload))
    }

    /// Apply the answer to a single-mode request.
    ///
    /// On success the decision is recorded against the send-time snapshot and
    /// the trolley starts towards the chosen track.
    ///
    /// # Errors
    ///
    /// Returns [`SimulatorError::StaleRequest`] when `pending` is not the
    /// outstanding request, or the transport error, in which case nothing is
    /// recorded.
    pub fn complete_single(
        &mut self,
        pending: PendingRequest<SingleRequest>,
        outcome: Result<SingleDecision, TransportError>,
    ) -> Result<SingleCompletion, SimulatorError> {
        self.settle(&pending)?;
        let decision = outcome.inspect_err(|err| {
            log::warn!("single decision failed: {err}");
        })?;
        let mode = pending.payload.mode;
        let chosen_track = decision.chosen_track;
        let entry = self.history.record(
            HistoryKind::Single {
                mode,
                result: decision,
            },
            pending.snapshot,
            Utc::now(),
        );
        log::info!("recorded {mode} decision {entry}: {chosen_track}");
        let timer = self.animator.animate(chosen_track);
        Ok(SingleCompletion {
            entry,
            chosen_track,
            timer,
        })
    }

    /// Apply the answer to a comparison request.
    ///
    /// # Errors
    ///
    /// Returns [`SimulatorError::StaleRequest`] when `pending` is not the
    /// outstanding request, or the transport error, in which case nothing is
    /// recorded.
    pub fn complete_compare(
        &mut self,
        pending: PendingRequest<CompareRequest>,
        outcome: Result<CompareOutcome, TransportError>,
    ) -> Result<EntryId, SimulatorError> {
        self.settle(&pending)?;
        let outcome = outcome.inspect_err(|err| {
            log::warn!("comparison failed: {err}");
        })?;
        let modes = pending.modes;
        let entry = self.history.record(
            HistoryKind::compare(modes, outcome),
            pending.snapshot,
            Utc::now(),
        );
        log::info!("recorded comparison {entry} for {modes}");
        Ok(entry)
    }

    /// Begin, call the service once and complete a single-mode decision.
    ///
    /// # Errors
    ///
    /// Any error from [`Self::begin_single`] or [`Self::complete_single`].
    pub async fn run_single<S>(
        &mut self,
        service: &S,
        mode: Mode,
    ) -> Result<SingleCompletion, SimulatorError>
    where
        S: DecisionService + ?Sized,
    {
        let pending = self.begin_single(mode)?;
        let outcome = service.decide(pending.payload()).await;
        self.complete_single(pending, outcome)
    }

    /// Begin, call the service once and complete a comparison.
    ///
    /// # Errors
    ///
    /// Any error from [`Self::begin_compare`] or [`Self::complete_compare`].
    pub async fn run_compare<S>(
        &mut self,
        service: &S,
        modes: ModeSet,
    ) -> Result<EntryId, SimulatorError>
    where
        S: DecisionService + ?Sized,
    {
        let pending = self.begin_compare(modes)?;
        let outcome = service.compare(pending.payload()).await;
        self.complete_compare(pending, outcome)
    }

    // Animation

    /// Forward an elapsed timer to the animator.
    pub fn fire_animation(&mut self, token: TimerToken) -> Option<TimerRequest> {
        self.animator.fire(token)
    }

    pub fn reset_animation(&mut self) {
        self.animator.reset();
    }

    // History

    /// Install a copy of a recorded scenario as the live scenario.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ReplayError::MissingEntry`] when the entry is not in
    /// the log; the live scenario is left unchanged.
    pub fn replay(&mut self, id: EntryId) -> Result<&Scenario, SimulatorError> {
        let restored = self
            .history
            .replay(id)
            .inspect_err(|err| log::warn!("{err}"))?
            .restore();
        self.scenario = restored;
        self.animator.reset();
        log::debug!("replayed history entry {id}");
        Ok(&self.scenario)
    }
}
