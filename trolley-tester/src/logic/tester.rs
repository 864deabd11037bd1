use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::common::scenario::{ScenarioCtx, ScenarioPlan, TestScenario};
use trolley_sim::SimulatorConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
    #[serde(with = "duration_vec_serde")]
    pub performance_data: Vec<Duration>,
}

impl ScenarioResult {
    /// Summarise per-iteration outcomes for one scenario.
    #[must_use]
    pub fn from_runs(
        scenario_name: impl Into<String>,
        iterations: usize,
        failures: Vec<String>,
        performance_data: Vec<Duration>,
    ) -> Self {
        let average_duration = if performance_data.is_empty() {
            Duration::ZERO
        } else {
            performance_data.iter().sum::<Duration>()
                / u32::try_from(performance_data.len()).unwrap_or(1)
        };
        Self {
            scenario_name: scenario_name.into(),
            passed: failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: performance_data.len(),
            failures,
            average_duration,
            performance_data,
        }
    }
}

pub struct LogicTester {
    plan_override: Option<SimulatorConfig>,
    verbose: bool,
}

impl LogicTester {
    pub const fn new(verbose: bool) -> Self {
        Self {
            plan_override: None,
            verbose,
        }
    }

    /// Run every plan with `config` instead of its own.
    #[must_use]
    pub fn with_config(mut self, config: Option<SimulatorConfig>) -> Self {
        self.plan_override = config;
        self
    }

    pub fn run_scenario(&self, scenario: &TestScenario, iterations: usize) -> ScenarioResult {
        if self.verbose {
            println!(
                "🧪 Testing scenario: {} ({})",
                scenario.name.bright_white(),
                scenario.key
            );
        }

        let plan = match &self.plan_override {
            Some(config) => scenario.plan.clone().with_config(config.clone()),
            None => scenario.plan.clone(),
        };
        let (failures, performance_data) = self.run_iterations(&plan, iterations);
        ScenarioResult::from_runs(scenario.name, iterations, failures, performance_data)
    }

    fn run_iterations(
        &self,
        plan: &ScenarioPlan,
        iterations: usize,
    ) -> (Vec<String>, Vec<Duration>) {
        let mut failures = Vec::new();
        let mut performance_data = Vec::new();

        for i in 0..iterations {
            let start_time = Instant::now();
            match run_plan(plan, i) {
                Ok(history_len) => {
                    let duration = start_time.elapsed();
                    performance_data.push(duration);
                    if self.verbose {
                        println!(
                            "  ✅ Iteration {}/{} passed ({duration:?}) history:{history_len}",
                            i + 1,
                            iterations
                        );
                    }
                }
                Err(err) => {
                    let message = format!("{err:#}");
                    log::warn!("iteration {} failed: {message}", i + 1);
                    if self.verbose {
                        println!(
                            "  ❌ Iteration {}/{} failed: {}",
                            i + 1,
                            iterations,
                            message.clone().red()
                        );
                    }
                    failures.push(format!("Iteration {}: {message}", i + 1));
                }
            }
        }

        (failures, performance_data)
    }
}

/// Run every check of `plan` on a fresh context; returns the final history length.
fn run_plan(plan: &ScenarioPlan, iteration: usize) -> anyhow::Result<usize> {
    let mut ctx = ScenarioCtx::new(plan, iteration)?;
    for check in &plan.checks {
        check(&mut ctx)?;
    }
    Ok(ctx.simulator.history().len())
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}

mod duration_vec_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis: Vec<u128> = durations.iter().map(Duration::as_millis).collect();
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis_vec = Vec::<u128>::deserialize(deserializer)?;
        Ok(millis_vec
            .into_iter()
            .map(|m| Duration::from_millis(u64::try_from(m).unwrap_or(0)))
            .collect())
    }
}
