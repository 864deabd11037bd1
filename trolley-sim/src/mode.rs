//! Scoring modes offered by the decision service.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::UnknownIdentifier;

/// Named ethical-scoring framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Utilitarian,
    Deontological,
    Custom,
    Ml,
}

impl Mode {
    pub const ALL: [Self; 4] = [
        Self::Utilitarian,
        Self::Deontological,
        Self::Custom,
        Self::Ml,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Utilitarian => "utilitarian",
            Self::Deontological => "deontological",
            Self::Custom => "custom",
            Self::Ml => "ml",
        }
    }

    const fn bit(self) -> u8 {
        match self {
            Self::Utilitarian => 0b0001,
            Self::Deontological => 0b0010,
            Self::Custom => 0b0100,
            Self::Ml => 0b1000,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = UnknownIdentifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownIdentifier::new("Mode", s))
    }
}

/// Modes enabled for a comparison run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ModeSet(u8);

impl ModeSet {
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn all() -> Self {
        Self(0b1111)
    }

    #[must_use]
    pub const fn with(self, mode: Mode) -> Self {
        Self(self.0 | mode.bit())
    }

    pub fn set(&mut self, mode: Mode, enabled: bool) {
        if enabled {
            self.0 |= mode.bit();
        } else {
            self.0 &= !mode.bit();
        }
    }

    #[must_use]
    pub const fn contains(self, mode: Mode) -> bool {
        self.0 & mode.bit() != 0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Enabled modes in canonical order.
    pub fn iter(self) -> impl Iterator<Item = Mode> {
        Mode::ALL.into_iter().filter(move |mode| self.contains(*mode))
    }
}

impl FromIterator<Mode> for ModeSet {
    fn from_iter<I: IntoIterator<Item = Mode>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

impl Serialize for ModeSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for ModeSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let modes = Vec::<Mode>::deserialize(deserializer)?;
        Ok(modes.into_iter().collect())
    }
}

impl fmt::Display for ModeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<&str> = self.iter().map(Mode::as_str).collect();
        f.write_str(&labels.join(" · "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_set_tracks_membership() {
        let mut set = ModeSet::empty().with(Mode::Ml).with(Mode::Utilitarian);
        assert!(set.contains(Mode::Ml));
        assert!(!set.contains(Mode::Custom));
        set.set(Mode::Ml, false);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Mode::Utilitarian]);
        assert!(ModeSet::empty().is_empty());
        assert_eq!(ModeSet::all().iter().count(), 4);
    }

    #[test]
    fn mode_set_serializes_in_canonical_order() {
        let set: ModeSet = [Mode::Ml, Mode::Deontological].into_iter().collect();
        assert_eq!(serde_json::to_string(&set).unwrap(), r#"["deontological","ml"]"#);
        assert_eq!(set.to_string(), "deontological · ml");
    }

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("Custom".parse::<Mode>(), Ok(Mode::Custom));
        assert!("virtue".parse::<Mode>().is_err());
    }
}
