//! Pending person selection for each track.
//!
//! Selections are edited through pure commands: [`apply_selection`] takes the
//! current selection and a picked field and returns the next one.
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::person::{AgeCategory, FlagCategory, FlagSet, PersonRecord, RoleCategory};
use crate::track::TrackId;

/// One attribute picked in the person builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum SelectionField {
    Age(AgeCategory),
    Role(RoleCategory),
    Flag(FlagCategory),
}

/// Attributes picked so far for the next person on a track.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    #[serde(default)]
    pub age: Option<AgeCategory>,
    #[serde(default)]
    pub role: Option<RoleCategory>,
    #[serde(default)]
    pub flags: FlagSet,
}

impl Selection {
    /// Whether both required attributes are picked.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.age.is_some() && self.role.is_some()
    }

    /// Turn the selection into a person.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::IncompleteSelection`] unless both age and
    /// role are picked.
    pub fn commit(&self) -> Result<PersonRecord, ValidationError> {
        match (self.age, self.role) {
            (Some(age), Some(role)) => {
                Ok(PersonRecord::new(age, role).with_flags(self.flags.iter()))
            }
            _ => Err(ValidationError::IncompleteSelection),
        }
    }
}

/// Next selection after picking `field`.
///
/// Age and role are single-choice: picking the current value clears it,
/// picking another replaces it. Flags toggle membership.
#[must_use]
pub fn apply_selection(selection: &Selection, field: SelectionField) -> Selection {
    let mut next = selection.clone();
    match field {
        SelectionField::Age(age) => {
            next.age = (selection.age != Some(age)).then_some(age);
        }
        SelectionField::Role(role) => {
            next.role = (selection.role != Some(role)).then_some(role);
        }
        SelectionField::Flag(flag) => next.flags.toggle(flag),
    }
    next
}

/// Independent selections for both tracks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    track1: Selection,
    track2: Selection,
}

impl SelectionState {
    #[must_use]
    pub const fn get(&self, track: TrackId) -> &Selection {
        match track {
            TrackId::One => &self.track1,
            TrackId::Two => &self.track2,
        }
    }

    const fn get_mut(&mut self, track: TrackId) -> &mut Selection {
        match track {
            TrackId::One => &mut self.track1,
            TrackId::Two => &mut self.track2,
        }
    }

    /// Apply a pick to one track's selection.
    pub fn apply(&mut self, track: TrackId, field: SelectionField) -> &Selection {
        let slot = self.get_mut(track);
        *slot = apply_selection(slot, field);
        slot
    }

    /// Build the person selected for `track` and reset that selection.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::IncompleteSelection`] when age or role is
    /// missing; the selection is left as it was.
    pub fn commit(&mut self, track: TrackId) -> Result<PersonRecord, ValidationError> {
        let person = self.get(track).commit()?;
        self.clear(track);
        Ok(person)
    }

    pub fn clear(&mut self, track: TrackId) {
        *self.get_mut(track) = Selection::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picking_same_age_twice_clears_it() {
        let picked = apply_selection(&Selection::default(), SelectionField::Age(AgeCategory::Teen));
        assert_eq!(picked.age, Some(AgeCategory::Teen));
        let cleared = apply_selection(&picked, SelectionField::Age(AgeCategory::Teen));
        assert_eq!(cleared.age, None);
        let replaced = apply_selection(&picked, SelectionField::Age(AgeCategory::Elder));
        assert_eq!(replaced.age, Some(AgeCategory::Elder));
    }

    #[test]
    fn flags_toggle_independently() {
        let sel = apply_selection(&Selection::default(), SelectionField::Flag(FlagCategory::Friend));
        let sel = apply_selection(&sel, SelectionField::Flag(FlagCategory::Innocent));
        assert_eq!(sel.flags.len(), 2);
        let sel = apply_selection(&sel, SelectionField::Flag(FlagCategory::Friend));
        assert!(!sel.flags.contains(FlagCategory::Friend));
        assert!(sel.flags.contains(FlagCategory::Innocent));
    }

    #[test]
    fn apply_leaves_input_untouched() {
        let original = Selection::default();
        let _ = apply_selection(&original, SelectionField::Role(RoleCategory::Nurse));
        assert_eq!(original, Selection::default());
    }

    #[test]
    fn commit_requires_age_and_role() {
        let mut state = SelectionState::default();
        state.apply(TrackId::One, SelectionField::Age(AgeCategory::Adult));
        assert_eq!(
            state.commit(TrackId::One),
            Err(ValidationError::IncompleteSelection)
        );
        state.apply(TrackId::One, SelectionField::Role(RoleCategory::Doctor));
        state.apply(TrackId::One, SelectionField::Flag(FlagCategory::SavesLives));
        let person = state.commit(TrackId::One).unwrap();
        assert_eq!(
            person,
            PersonRecord::new(AgeCategory::Adult, RoleCategory::Doctor)
                .with_flags([FlagCategory::SavesLives])
        );
        assert!(state.get(TrackId::Two).age.is_none());
    }

    #[test]
    fn commit_resets_only_the_committed_track() {
        let mut state = SelectionState::default();
        for track in TrackId::BOTH {
            state.apply(track, SelectionField::Age(AgeCategory::Teen));
            state.apply(track, SelectionField::Role(RoleCategory::Student));
            state.apply(track, SelectionField::Flag(FlagCategory::Friend));
        }
        state.commit(TrackId::One).unwrap();
        assert_eq!(state.get(TrackId::One), &Selection::default());
        assert!(state.get(TrackId::Two).is_complete());
        assert_eq!(
            state.commit(TrackId::One),
            Err(ValidationError::IncompleteSelection)
        );
    }
}
