use anyhow::{Context, Result};
use std::path::Path;

use trolley_sim::SimulatorConfig;

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

/// Read and validate a simulator configuration file.
pub fn load_config(path: &Path) -> Result<SimulatorConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    SimulatorConfig::from_json(&raw)
        .with_context(|| format!("invalid simulator configuration in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(label: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "trolley-config-{label}-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ));
        std::fs::write(&path, contents).expect("write config");
        path
    }

    #[test]
    fn split_csv_trims_and_filters() {
        let parts = split_csv(" alpha, ,beta,  gamma ");
        assert_eq!(parts, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn load_config_reads_partial_file() {
        let path = temp_file("ok", r#"{"history_capacity": 7}"#);
        let config = load_config(&path).unwrap();
        assert_eq!(config.history_capacity, 7);
        assert_eq!(config.animation.branch_travel_ms, 600);
    }

    #[test]
    fn load_config_reports_path_on_error() {
        let path = temp_file("bad", r#"{"history_capacity": 0}"#);
        let err = load_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("history_capacity must be at least 1"));
        assert!(load_config(Path::new("/nonexistent/trolley.json")).is_err());
    }
}
