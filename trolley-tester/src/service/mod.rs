pub mod client;

use anyhow::{Context, Result, ensure};
use colored::Colorize;
use std::time::{Duration, Instant};

pub use client::HttpDecisionService;

use crate::logic::ScenarioResult;
use trolley_sim::{
    AgeCategory, DecisionService, FlagCategory, Mode, ModeSet, PersonRecord, RoleCategory,
    Simulator, SimulatorConfig, StatsView, TrackId,
};

/// Smoke plan against a live service: every single mode, then one comparison.
pub async fn run_service_smoke<S>(
    service: &S,
    config: &SimulatorConfig,
    iterations: usize,
    verbose: bool,
) -> ScenarioResult
where
    S: DecisionService + ?Sized,
{
    let mut failures = Vec::new();
    let mut performance_data: Vec<Duration> = Vec::new();

    for i in 0..iterations {
        let start_time = Instant::now();
        match smoke_iteration(service, config).await {
            Ok(stats) => {
                let duration = start_time.elapsed();
                performance_data.push(duration);
                if verbose {
                    println!(
                        "  ✅ Iteration {}/{} passed ({duration:?}) stats:{stats:?}",
                        i + 1,
                        iterations
                    );
                }
            }
            Err(err) => {
                let message = format!("{err:#}");
                log::warn!("service iteration {} failed: {message}", i + 1);
                if verbose {
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

    ScenarioResult::from_runs("Service Smoke Test", iterations, failures, performance_data)
}

async fn smoke_iteration<S>(service: &S, config: &SimulatorConfig) -> Result<StatsView>
where
    S: DecisionService + ?Sized,
{
    let mut simulator =
        Simulator::new(config.clone()).context("invalid simulator configuration")?;
    simulator.add_person(
        TrackId::One,
        PersonRecord::new(AgeCategory::Child, RoleCategory::Student)
            .with_flags([FlagCategory::Innocent]),
    );
    simulator.add_person(
        TrackId::Two,
        PersonRecord::new(AgeCategory::Adult, RoleCategory::Doctor),
    );
    simulator.add_person(
        TrackId::Two,
        PersonRecord::new(AgeCategory::Adult, RoleCategory::Doctor),
    );

    for mode in Mode::ALL {
        let done = simulator
            .run_single(service, mode)
            .await
            .with_context(|| format!("{mode} decision failed"))?;
        log::info!("{mode}: service chose {}", done.chosen_track);
    }

    simulator.set_manual_choice(Some(TrackId::Two));
    let entry = simulator
        .run_compare(service, ModeSet::all())
        .await
        .context("comparison failed")?;
    ensure!(
        simulator.history().len() == Mode::ALL.len() + 1,
        "every run should be recorded"
    );
    let recorded = simulator
        .history()
        .get(entry)
        .context("comparison should be in history")?;
    ensure!(
        !recorded.kind().choices().is_empty(),
        "comparison returned no verdicts"
    );
    recorded
        .stats_view()
        .context("comparison entry should carry stats")
}
