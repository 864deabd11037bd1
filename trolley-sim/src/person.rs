//! Person records and their attribute categories.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

use crate::error::UnknownIdentifier;

macro_rules! category {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $id:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every value in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Stable wire identifier.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $id),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownIdentifier;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($id => Ok(Self::$variant),)+
                    other => Err(UnknownIdentifier::new(stringify!($name), other)),
                }
            }
        }
    };
}

category! {
    /// Age bracket of a person on a track.
    AgeCategory {
        Child => "child",
        Teen => "teen",
        Young => "young",
        Adult => "adult",
        Elder => "elder",
    }
}

category! {
    /// Occupation or social role of a person.
    RoleCategory {
        Doctor => "doctor",
        Nurse => "nurse",
        Teacher => "teacher",
        Engineer => "engineer",
        Student => "student",
        Unemployed => "unemployed",
        Retired => "retired",
        Pregnant => "pregnant",
        Criminal => "criminal",
        Thief => "thief",
        Other => "other",
    }
}

category! {
    /// Optional attribute attached to a person.
    FlagCategory {
        Disabled => "disabled",
        Innocent => "innocent",
        Guilty => "guilty",
        LawBreaker => "law_breaker",
        Relative => "relative",
        Friend => "friend",
        Stranger => "stranger",
        SavesLives => "saves_lives",
        Vulnerable => "vulnerable",
    }
}

/// Set of flags kept sorted by wire identifier and free of duplicates.
///
/// Equality and hashing therefore behave like set equality, and iteration
/// order is the deterministic rendering order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct FlagSet(SmallVec<[FlagCategory; 4]>);

impl FlagSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a flag, returning false when it was already present.
    pub fn insert(&mut self, flag: FlagCategory) -> bool {
        match self.position(flag) {
            Ok(_) => false,
            Err(idx) => {
                self.0.insert(idx, flag);
                true
            }
        }
    }

    /// Remove a flag, returning true when it was present.
    pub fn remove(&mut self, flag: FlagCategory) -> bool {
        match self.position(flag) {
            Ok(idx) => {
                self.0.remove(idx);
                true
            }
            Err(_) => false,
        }
    }

    /// Insert the flag when absent, remove it when present.
    pub fn toggle(&mut self, flag: FlagCategory) {
        if !self.remove(flag) {
            self.insert(flag);
        }
    }

    #[must_use]
    pub fn contains(&self, flag: FlagCategory) -> bool {
        self.position(flag).is_ok()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = FlagCategory> + '_ {
        self.0.iter().copied()
    }

    fn position(&self, flag: FlagCategory) -> Result<usize, usize> {
        self.0.binary_search_by(|probe| probe.as_str().cmp(flag.as_str()))
    }
}

impl FromIterator<FlagCategory> for FlagSet {
    fn from_iter<I: IntoIterator<Item = FlagCategory>>(iter: I) -> Self {
        let mut set = Self::new();
        for flag in iter {
            set.insert(flag);
        }
        set
    }
}

impl<'de> Deserialize<'de> for FlagSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = Vec::<FlagCategory>::deserialize(deserializer)?;
        Ok(raw.into_iter().collect())
    }
}

/// A single person placed on a track.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PersonRecord {
    pub age: AgeCategory,
    pub role: RoleCategory,
    #[serde(default)]
    pub flags: FlagSet,
}

impl PersonRecord {
    #[must_use]
    pub fn new(age: AgeCategory, role: RoleCategory) -> Self {
        Self {
            age,
            role,
            flags: FlagSet::new(),
        }
    }

    #[must_use]
    pub fn with_flags(mut self, flags: impl IntoIterator<Item = FlagCategory>) -> Self {
        for flag in flags {
            self.flags.insert(flag);
        }
        self
    }

    /// Identity used for grouping equivalent records.
    #[must_use]
    pub fn key(&self) -> GroupKey {
        GroupKey {
            age: self.age,
            role: self.role,
            flags: self.flags.clone(),
        }
    }
}

impl fmt::Display for PersonRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.age, self.role)?;
        if !self.flags.is_empty() {
            let flags: Vec<&str> = self.flags.iter().map(FlagCategory::as_str).collect();
            write!(f, " · {}", flags.join(" · "))?;
        }
        Ok(())
    }
}

/// Composite grouping key: age, role and the sorted flag set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    age: AgeCategory,
    role: RoleCategory,
    flags: FlagSet,
}

impl GroupKey {
    #[must_use]
    pub const fn age(&self) -> AgeCategory {
        self.age
    }

    #[must_use]
    pub const fn role(&self) -> RoleCategory {
        self.role
    }

    #[must_use]
    pub const fn flags(&self) -> &FlagSet {
        &self.flags
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags: Vec<&str> = self.flags.iter().map(FlagCategory::as_str).collect();
        write!(f, "{}__{}__{}", self.age, self.role, flags.join("|"))
    }
}
