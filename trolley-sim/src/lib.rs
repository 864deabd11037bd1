//! Trolley Simulator Core
//!
//! Platform-agnostic scenario state for the trolley-problem simulator: the two
//! tracks and their grouped occupants, decision payloads for the scoring
//! service, a bounded history of past decisions with replay, and the trolley
//! animation state machine. Rendering and the scoring service itself live
//! outside this crate.

pub mod animation;
pub mod config;
pub mod error;
pub mod history;
pub mod mode;
pub mod person;
pub mod request;
pub mod scenario;
pub mod selection;
pub mod service;
pub mod session;
pub mod track;
pub mod weights;

// Re-export commonly used types
#[cfg(feature = "async")]
pub use animation::drive;
pub use animation::{
    AnimationState, TimerRequest, TimerToken, TrackHighlight, TrolleyAnimator, TrolleyPosition,
};
pub use config::{AnimationTiming, SimulatorConfig};
pub use error::{
    ConfigError, ReplayError, SimulatorError, TransportError, UnknownIdentifier, ValidationError,
};
pub use history::{DEFAULT_HISTORY_CAPACITY, EntryId, HistoryEntry, HistoryKind, HistoryLog};
pub use mode::{Mode, ModeSet};
pub use person::{AgeCategory, FlagCategory, FlagSet, GroupKey, PersonRecord, RoleCategory};
pub use request::{CompareRequest, SingleRequest, build_compare, build_single};
pub use scenario::{DeonVariant, Scenario, ScenarioSnapshot};
pub use selection::{Selection, SelectionField, SelectionState, apply_selection};
pub use service::{
    AgreementStats, CompareOutcome, DecisionService, ManualEcho, ModeVerdict, SingleDecision,
    StatsView,
};
pub use session::{PendingRequest, Simulator, SingleCompletion};
pub use track::{Group, Track, TrackId, aggregate, expand};
pub use weights::{WeightConfig, WeightTable};
