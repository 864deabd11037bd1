//! Trolley animation state machine.
//!
//! The animator owns no timers. Each transition hands back a [`TimerRequest`]
//! that the host schedules however it likes; when the delay elapses the host
//! calls [`TrolleyAnimator::fire`] with the request's token. Every `animate`
//! or `reset` bumps the token generation, so timers left over from an earlier
//! run are ignored instead of stacking transitions.
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::AnimationTiming;
use crate::track::TrackId;

/// Where the trolley is in its run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnimationState {
    #[default]
    Idle,
    EnRouteToSplit,
    EnRouteToBranch(TrackId),
}

/// Visual marking of a track after a decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackHighlight {
    #[default]
    Neutral,
    Chosen,
    Safe,
}

/// Scene coordinates (800×450 viewbox).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrolleyPosition {
    pub x: i32,
    pub y: i32,
}

pub const START_POSITION: TrolleyPosition = TrolleyPosition { x: 100, y: 225 };
pub const SPLIT_POSITION: TrolleyPosition = TrolleyPosition { x: 400, y: 225 };
pub const TRACK1_END_POSITION: TrolleyPosition = TrolleyPosition { x: 750, y: 100 };
pub const TRACK2_END_POSITION: TrolleyPosition = TrolleyPosition { x: 750, y: 350 };

impl TrolleyPosition {
    /// Terminal position at the end of a branch.
    #[must_use]
    pub const fn branch_end(track: TrackId) -> Self {
        match track {
            TrackId::One => TRACK1_END_POSITION,
            TrackId::Two => TRACK2_END_POSITION,
        }
    }
}

/// Opaque handle tying a scheduled callback to one animation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken {
    generation: u64,
}

/// Ask the host to call [`TrolleyAnimator::fire`] with `token` after `after`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerRequest {
    pub token: TimerToken,
    pub after: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrolleyAnimator {
    timing: AnimationTiming,
    state: AnimationState,
    position: TrolleyPosition,
    /// Track the trolley is heading to, or last arrived at.
    chosen: Option<TrackId>,
    generation: u64,
}

impl Default for TrolleyAnimator {
    fn default() -> Self {
        Self::new(AnimationTiming::default())
    }
}

impl TrolleyAnimator {
    #[must_use]
    pub const fn new(timing: AnimationTiming) -> Self {
        Self {
            timing,
            state: AnimationState::Idle,
            position: START_POSITION,
            chosen: None,
            generation: 0,
        }
    }

    #[must_use]
    pub const fn state(&self) -> AnimationState {
        self.state
    }

    /// Where the trolley is drawn (or heading) right now.
    #[must_use]
    pub const fn position(&self) -> TrolleyPosition {
        self.position
    }

    #[must_use]
    pub const fn timing(&self) -> AnimationTiming {
        self.timing
    }

    /// Highlight for one track. Tracks stay neutral until the trolley has
    /// passed the split point.
    #[must_use]
    pub fn highlight(&self, track: TrackId) -> TrackHighlight {
        let marked = match self.state {
            AnimationState::EnRouteToSplit => None,
            AnimationState::Idle | AnimationState::EnRouteToBranch(_) => self.chosen,
        };
        match marked {
            None => TrackHighlight::Neutral,
            Some(chosen) if chosen == track => TrackHighlight::Chosen,
            Some(_) => TrackHighlight::Safe,
        }
    }

    /// Whether a run is underway.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        !matches!(self.state, AnimationState::Idle)
    }

    /// Return to the start, clear highlighting and invalidate pending timers.
    pub fn reset(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.state = AnimationState::Idle;
        self.position = START_POSITION;
        self.chosen = None;
    }

    /// Start a fresh run towards `track`, abandoning any run in progress.
    pub fn animate(&mut self, track: TrackId) -> TimerRequest {
        if self.is_running() {
            log::debug!("animation restarted before completion");
        }
        self.reset();
        self.state = AnimationState::EnRouteToSplit;
        self.position = SPLIT_POSITION;
        self.chosen = Some(track);
        self.request(self.timing.split_delay())
    }

    /// Advance the run the token belongs to. Stale tokens are ignored.
    ///
    /// Returns the next timer to schedule, or `None` when the run finished or
    /// the token was stale.
    pub fn fire(&mut self, token: TimerToken) -> Option<TimerRequest> {
        if token.generation != self.generation {
            log::debug!("ignoring stale animation timer");
            return None;
        }
        match (self.state, self.chosen) {
            (AnimationState::EnRouteToSplit, Some(track)) => {
                self.state = AnimationState::EnRouteToBranch(track);
                self.position = TrolleyPosition::branch_end(track);
                Some(self.request(self.timing.branch_travel()))
            }
            (AnimationState::EnRouteToBranch(track), _) => {
                log::debug!("trolley arrived on {track}");
                // Invalidate the token but keep position and highlighting.
                self.generation = self.generation.wrapping_add(1);
                self.state = AnimationState::Idle;
                None
            }
            _ => None,
        }
    }

    const fn request(&self, after: Duration) -> TimerRequest {
        TimerRequest {
            token: TimerToken {
                generation: self.generation,
            },
            after,
        }
    }
}

/// Run a timer chain to completion on tokio timers.
///
/// `fire` is called with each token once its delay elapses, normally
/// forwarding to [`TrolleyAnimator::fire`] on a shared animator.
#[cfg(feature = "async")]
pub async fn drive<F>(first: TimerRequest, mut fire: F)
where
    F: FnMut(TimerToken) -> Option<TimerRequest>,
{
    let mut next = Some(first);
    while let Some(request) = next {
        tokio::time::sleep(request.after).await;
        next = fire(request.token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_to_end(animator: &mut TrolleyAnimator, first: TimerRequest) {
        let mut next = Some(first);
        while let Some(request) = next {
            next = animator.fire(request.token);
        }
    }

    #[test]
    fn starts_idle_at_start_position() {
        let animator = TrolleyAnimator::default();
        assert_eq!(animator.state(), AnimationState::Idle);
        assert_eq!(animator.position(), START_POSITION);
        assert_eq!(animator.highlight(TrackId::One), TrackHighlight::Neutral);
    }

    #[test]
    fn full_run_passes_through_named_states() {
        let mut animator = TrolleyAnimator::default();
        let first = animator.animate(TrackId::One);
        assert_eq!(first.after, Duration::from_millis(50));
        assert_eq!(animator.state(), AnimationState::EnRouteToSplit);
        assert_eq!(animator.highlight(TrackId::One), TrackHighlight::Neutral);

        let second = animator.fire(first.token).expect("branch leg");
        assert_eq!(second.after, Duration::from_millis(600));
        assert_eq!(animator.state(), AnimationState::EnRouteToBranch(TrackId::One));
        assert_eq!(animator.position(), TRACK1_END_POSITION);
        assert_eq!(animator.highlight(TrackId::One), TrackHighlight::Chosen);
        assert_eq!(animator.highlight(TrackId::Two), TrackHighlight::Safe);

        assert!(animator.fire(second.token).is_none());
        assert_eq!(animator.state(), AnimationState::Idle);
        assert_eq!(animator.position(), TRACK1_END_POSITION);
        assert_eq!(animator.highlight(TrackId::One), TrackHighlight::Chosen);
    }

    #[test]
    fn restart_discards_previous_run() {
        let mut animator = TrolleyAnimator::default();
        let stale = animator.animate(TrackId::One);
        let fresh = animator.animate(TrackId::Two);

        assert!(animator.fire(stale.token).is_none());
        assert_eq!(animator.state(), AnimationState::EnRouteToSplit);

        run_to_end(&mut animator, fresh);
        assert_eq!(animator.highlight(TrackId::Two), TrackHighlight::Chosen);
        assert_eq!(animator.highlight(TrackId::One), TrackHighlight::Safe);
        assert_eq!(animator.position(), TRACK2_END_POSITION);
    }

    #[test]
    fn restart_mid_branch_discards_previous_highlight() {
        let mut animator = TrolleyAnimator::default();
        let first = animator.animate(TrackId::One);
        let branch = animator.fire(first.token).unwrap();
        assert_eq!(animator.highlight(TrackId::One), TrackHighlight::Chosen);

        let fresh = animator.animate(TrackId::Two);
        assert_eq!(animator.highlight(TrackId::One), TrackHighlight::Neutral);
        assert!(animator.fire(branch.token).is_none());
        run_to_end(&mut animator, fresh);
        assert_eq!(animator.highlight(TrackId::One), TrackHighlight::Safe);
    }

    #[test]
    fn reset_from_any_state_clears_marking() {
        let mut animator = TrolleyAnimator::default();
        let first = animator.animate(TrackId::Two);
        run_to_end(&mut animator, first);
        animator.reset();
        assert_eq!(animator.state(), AnimationState::Idle);
        assert_eq!(animator.position(), START_POSITION);
        assert_eq!(animator.highlight(TrackId::Two), TrackHighlight::Neutral);

        let pending = animator.animate(TrackId::One);
        animator.reset();
        assert!(animator.fire(pending.token).is_none());
        assert!(!animator.is_running());
    }

    #[test]
    fn completed_token_cannot_fire_twice() {
        let mut animator = TrolleyAnimator::default();
        let first = animator.animate(TrackId::One);
        let second = animator.fire(first.token).unwrap();
        assert!(animator.fire(second.token).is_none());
        assert!(animator.fire(second.token).is_none());
        assert_eq!(animator.highlight(TrackId::One), TrackHighlight::Chosen);
    }

    #[cfg(feature = "async")]
    #[tokio::test(start_paused = true)]
    async fn drive_runs_chain_on_tokio_timers() {
        use std::cell::RefCell;

        let animator = RefCell::new(TrolleyAnimator::default());
        let first = animator.borrow_mut().animate(TrackId::Two);
        drive(first, |token| animator.borrow_mut().fire(token)).await;
        let animator = animator.into_inner();
        assert_eq!(animator.state(), AnimationState::Idle);
        assert_eq!(animator.highlight(TrackId::Two), TrackHighlight::Chosen);
    }
}
