use anyhow::{Context, Result};

use crate::logic::StubDecisionService;
use trolley_sim::{
    EntryId, Mode, ModeSet, Simulator, SimulatorConfig, SingleCompletion, TimerRequest,
};

pub mod catalog;

use catalog::{catalog_scenarios, find_catalog_scenario};

/// State handed to every check of one iteration.
pub struct ScenarioCtx {
    pub simulator: Simulator,
    pub service: StubDecisionService,
    pub iteration: usize,
}

impl ScenarioCtx {
    /// Fresh simulator and stub for one iteration of `plan`.
    ///
    /// # Errors
    ///
    /// Returns an error when the plan's configuration is invalid.
    pub fn new(plan: &ScenarioPlan, iteration: usize) -> Result<Self> {
        let mut simulator =
            Simulator::new(plan.config.clone()).context("invalid simulator configuration")?;
        if let Some(setup) = plan.setup {
            setup(&mut simulator);
        }
        Ok(Self {
            simulator,
            service: StubDecisionService::new(),
            iteration,
        })
    }

    /// Run a single decision through the begin/complete cycle against the stub.
    pub fn decide(&mut self, mode: Mode) -> Result<SingleCompletion> {
        let pending = self.simulator.begin_single(mode)?;
        let outcome = self.service.answer_single(pending.payload());
        Ok(self.simulator.complete_single(pending, outcome)?)
    }

    /// Run a comparison through the begin/complete cycle against the stub.
    pub fn compare(&mut self, modes: ModeSet) -> Result<EntryId> {
        let pending = self.simulator.begin_compare(modes)?;
        let outcome = self.service.answer_compare(pending.payload());
        Ok(self.simulator.complete_compare(pending, outcome)?)
    }

    /// Fire timers in order until the animation settles.
    pub fn finish_animation(&mut self, first: TimerRequest) {
        let mut next = Some(first);
        while let Some(timer) = next {
            next = self.simulator.fire_animation(timer.token);
        }
    }
}

/// Assertion run against a scenario context.
pub type ScenarioCheck = fn(&mut ScenarioCtx) -> Result<()>;

#[derive(Clone)]
pub struct ScenarioPlan {
    pub config: SimulatorConfig,
    pub setup: Option<fn(&mut Simulator)>,
    pub checks: Vec<ScenarioCheck>,
}

impl Default for ScenarioPlan {
    fn default() -> Self {
        Self::new()
    }
}

impl ScenarioPlan {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: SimulatorConfig::default(),
            setup: None,
            checks: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: SimulatorConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_setup(mut self, setup: fn(&mut Simulator)) -> Self {
        self.setup = Some(setup);
        self
    }

    #[must_use]
    pub fn with_check(mut self, check: ScenarioCheck) -> Self {
        self.checks.push(check);
        self
    }
}

#[derive(Clone)]
pub struct TestScenario {
    pub key: &'static str,
    pub name: &'static str,
    pub plan: ScenarioPlan,
}

impl TestScenario {
    #[must_use]
    pub const fn new(key: &'static str, name: &'static str, plan: ScenarioPlan) -> Self {
        Self { key, name, plan }
    }
}

pub fn get_scenario(name: &str) -> Option<TestScenario> {
    let key = match name.to_lowercase().as_str() {
        "grouping" | "dedup" => "grouping",
        "group-removal" | "removal" => "group-removal",
        "history-eviction" | "eviction" => "history-eviction",
        "replay-idempotence" | "replay" => "replay-idempotence",
        "snapshot-independence" | "snapshot" => "snapshot-independence",
        "animation-restart" | "animation" => "animation-restart",
        "transport-failure" | "failure" => "transport-failure",
        other => return find_catalog_scenario(other),
    };
    find_catalog_scenario(key)
}

pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    catalog_scenarios()
        .into_iter()
        .map(|scenario| (scenario.key, scenario.name))
        .collect()
}
