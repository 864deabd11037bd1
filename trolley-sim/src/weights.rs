//! Weight tables for the custom scoring mode.
//!
//! The simulator never interprets these values; it forwards them to the
//! decision service. Tables are sorted maps so payloads serialize
//! deterministically.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifier → integer weight.
pub type WeightTable = BTreeMap<String, i32>;

pub const DEFAULT_AGE_WEIGHTS: &[(&str, i32)] = &[
    ("child", 4),
    ("teen", 3),
    ("young", 3),
    ("adult", 2),
    ("elder", 1),
];

pub const DEFAULT_ROLE_WEIGHTS: &[(&str, i32)] = &[
    ("doctor", 4),
    ("nurse", 3),
    ("teacher", 3),
    ("engineer", 2),
    ("student", 2),
    ("unemployed", 1),
    ("retired", 1),
    ("pregnant", 3),
    ("criminal", -1),
    ("thief", 0),
    ("other", 1),
];

// `pregnant` is kept here even though it is a role, not a flag; the service
// still reads it from this table.
pub const DEFAULT_FLAG_WEIGHTS: &[(&str, i32)] = &[
    ("pregnant", 3),
    ("disabled", 2),
    ("innocent", 1),
    ("guilty", -2),
    ("law_breaker", -1),
    ("relative", 2),
    ("friend", 1),
    ("stranger", 0),
    ("saves_lives", 2),
    ("vulnerable", 2),
];

/// Custom-mode rules: one table per attribute family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightConfig {
    #[serde(default)]
    pub age_weights: WeightTable,
    #[serde(default)]
    pub role_weights: WeightTable,
    #[serde(default)]
    pub flag_weights: WeightTable,
}

fn table(entries: &[(&str, i32)]) -> WeightTable {
    entries
        .iter()
        .map(|(id, weight)| ((*id).to_string(), *weight))
        .collect()
}

impl WeightConfig {
    /// The documented default tables.
    #[must_use]
    pub fn default_config() -> Self {
        Self {
            age_weights: table(DEFAULT_AGE_WEIGHTS),
            role_weights: table(DEFAULT_ROLE_WEIGHTS),
            flag_weights: table(DEFAULT_FLAG_WEIGHTS),
        }
    }

    /// Tables with no entries at all.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            age_weights: BTreeMap::new(),
            role_weights: BTreeMap::new(),
            flag_weights: BTreeMap::new(),
        }
    }
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_constants() {
        let cfg = WeightConfig::default_config();
        assert_eq!(cfg.age_weights["child"], 4);
        assert_eq!(cfg.age_weights["elder"], 1);
        assert_eq!(cfg.role_weights["criminal"], -1);
        assert_eq!(cfg.role_weights["thief"], 0);
        assert_eq!(cfg.flag_weights["guilty"], -2);
        assert_eq!(cfg.flag_weights["pregnant"], 3);
        assert_eq!(cfg.age_weights.len(), 5);
        assert_eq!(cfg.role_weights.len(), 11);
        assert_eq!(cfg.flag_weights.len(), 10);
    }

    #[test]
    fn partial_json_fills_missing_tables() {
        let cfg: WeightConfig = serde_json::from_str(r#"{"age_weights":{"child":9}}"#).unwrap();
        assert_eq!(cfg.age_weights["child"], 9);
        assert!(cfg.role_weights.is_empty());
        assert!(cfg.flag_weights.is_empty());
    }
}
