use anyhow::{Context, Result, anyhow, ensure};

use super::{ScenarioCtx, ScenarioPlan, TestScenario};
use trolley_sim::{
    AgeCategory, AnimationState, FlagCategory, Mode, ModeSet, PersonRecord, RoleCategory,
    SimulatorError, Simulator, TrackHighlight, TrackId, TransportError, ValidationError,
    WeightConfig,
};

pub fn catalog_scenarios() -> Vec<TestScenario> {
    vec![
        TestScenario::new(
            "smoke",
            "Smoke Test",
            populated_plan().with_check(smoke_expectation),
        ),
        TestScenario::new(
            "grouping",
            "Identical Records Group Together",
            ScenarioPlan::new().with_check(grouping_expectation),
        ),
        TestScenario::new(
            "group-removal",
            "Group Removal Is Exhaustive",
            ScenarioPlan::new().with_check(group_removal_expectation),
        ),
        TestScenario::new(
            "history-eviction",
            "History Keeps The Newest Entries",
            populated_plan().with_check(history_eviction_expectation),
        ),
        TestScenario::new(
            "replay-idempotence",
            "Replay Is Idempotent",
            populated_plan().with_check(replay_expectation),
        ),
        TestScenario::new(
            "snapshot-independence",
            "Snapshots Ignore Later Edits",
            populated_plan().with_check(snapshot_expectation),
        ),
        TestScenario::new(
            "compare-defaults",
            "Comparison Payload Defaults",
            populated_plan().with_check(compare_defaults_expectation),
        ),
        TestScenario::new(
            "single-custom-omits-rules",
            "Custom Decision Without Rules",
            populated_plan().with_check(single_custom_expectation),
        ),
        TestScenario::new(
            "no-mode-selected",
            "Comparison Without Modes",
            populated_plan().with_check(no_mode_expectation),
        ),
        TestScenario::new(
            "animation-restart",
            "Animation Restart",
            populated_plan().with_check(animation_restart_expectation),
        ),
        TestScenario::new(
            "transport-failure",
            "Transport Failure Leaves State Alone",
            populated_plan().with_check(transport_failure_expectation),
        ),
    ]
}

pub fn find_catalog_scenario(key: &str) -> Option<TestScenario> {
    catalog_scenarios()
        .into_iter()
        .find(|scenario| scenario.key == key)
}

fn populated_plan() -> ScenarioPlan {
    ScenarioPlan::new().with_setup(populate)
}

fn populate(simulator: &mut Simulator) {
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
        PersonRecord::new(AgeCategory::Elder, RoleCategory::Retired),
    );
}

fn adult_doctor() -> PersonRecord {
    PersonRecord::new(AgeCategory::Adult, RoleCategory::Doctor)
}

fn smoke_expectation(ctx: &mut ScenarioCtx) -> Result<()> {
    for _ in 0..ctx.iteration % 3 {
        ctx.simulator.add_person(TrackId::One, adult_doctor());
    }
    let done = ctx.decide(Mode::Utilitarian)?;
    ensure!(ctx.simulator.history().len() == 1, "single run should be recorded");
    ensure!(
        ctx.simulator.animator().state() == AnimationState::EnRouteToSplit,
        "single run should start the trolley"
    );
    ctx.finish_animation(done.timer);
    ensure!(
        ctx.simulator.animator().highlight(done.chosen_track) == TrackHighlight::Chosen,
        "chosen track should be highlighted"
    );

    ctx.compare(ModeSet::all())?;
    ensure!(ctx.simulator.history().len() == 2, "comparison should be recorded");
    ensure!(ctx.service.calls() == 2, "each run should call the service once");
    Ok(())
}

fn grouping_expectation(ctx: &mut ScenarioCtx) -> Result<()> {
    ctx.simulator.add_person(TrackId::Two, adult_doctor());
    ctx.simulator.add_person(TrackId::Two, adult_doctor());
    ctx.simulator.add_person(
        TrackId::Two,
        adult_doctor().with_flags([FlagCategory::Friend, FlagCategory::Relative]),
    );
    ctx.simulator.add_person(
        TrackId::Two,
        adult_doctor().with_flags([FlagCategory::Relative, FlagCategory::Friend]),
    );
    let groups = ctx.simulator.groups(TrackId::Two);
    ensure!(groups.len() == 2, "expected 2 groups, got {}", groups.len());
    ensure!(
        groups.iter().all(|group| group.count == 2),
        "every group should count 2 records"
    );
    Ok(())
}

fn group_removal_expectation(ctx: &mut ScenarioCtx) -> Result<()> {
    let elder = PersonRecord::new(AgeCategory::Elder, RoleCategory::Retired);
    for _ in 0..3 {
        ctx.simulator.add_person(TrackId::One, adult_doctor());
    }
    ctx.simulator.add_person(TrackId::One, elder.clone());
    ctx.simulator.add_person(TrackId::Two, adult_doctor());

    let removed = ctx.simulator.remove_group(TrackId::One, &adult_doctor().key());
    ensure!(removed == 3, "expected 3 records removed, got {removed}");
    let groups = ctx.simulator.groups(TrackId::One);
    ensure!(
        groups.len() == 1 && groups[0].key() == elder.key() && groups[0].count == 1,
        "only the elder group should remain"
    );
    ensure!(
        ctx.simulator.scenario().track2.len() == 1,
        "other track must be untouched"
    );
    Ok(())
}

fn history_eviction_expectation(ctx: &mut ScenarioCtx) -> Result<()> {
    let capacity = ctx.simulator.history().capacity();
    let mut ids = Vec::with_capacity(capacity + 1);
    for _ in 0..=capacity {
        ids.push(ctx.decide(Mode::Deontological)?.entry);
        ensure!(
            ctx.simulator.history().len() <= capacity,
            "history grew past {capacity}"
        );
    }
    let oldest = ids.first().copied().ok_or_else(|| anyhow!("no entries recorded"))?;
    ensure!(
        ctx.simulator.history().get(oldest).is_none(),
        "oldest entry should be evicted"
    );
    ensure!(
        ctx.simulator.history().list().next().map(|entry| entry.id()) == ids.last().copied(),
        "newest entry should be listed first"
    );
    Ok(())
}

fn replay_expectation(ctx: &mut ScenarioCtx) -> Result<()> {
    ctx.simulator.set_manual_choice(Some(TrackId::Two));
    let done = ctx.decide(Mode::Utilitarian)?;
    let stored = ctx
        .simulator
        .history()
        .replay(done.entry)?
        .scenario()
        .clone();

    ctx.simulator.clear_track(TrackId::Two);
    let first = ctx.simulator.replay(done.entry)?.clone();
    ctx.simulator.add_person(TrackId::One, adult_doctor());
    let second = ctx.simulator.replay(done.entry)?.clone();

    ensure!(first == second, "replaying twice should give equal scenarios");
    ensure!(first == stored, "replay should match the stored snapshot");
    ensure!(
        !ctx.simulator.animator().is_running(),
        "replay should reset the trolley"
    );
    Ok(())
}

fn snapshot_expectation(ctx: &mut ScenarioCtx) -> Result<()> {
    let before = ctx.simulator.scenario().clone();
    let pending = ctx.simulator.begin_single(Mode::Ml)?;
    ctx.simulator.clear_track(TrackId::One);
    ctx.simulator.set_manual_choice(Some(TrackId::One));
    let outcome = ctx.service.answer_single(pending.payload());
    let done = ctx.simulator.complete_single(pending, outcome)?;

    let entry = ctx
        .simulator
        .history()
        .get(done.entry)
        .context("entry should be recorded")?;
    ensure!(
        entry.snapshot().scenario() == &before,
        "snapshot should reflect the scenario at send time"
    );
    Ok(())
}

fn compare_defaults_expectation(ctx: &mut ScenarioCtx) -> Result<()> {
    let custom_only = ModeSet::empty().with(Mode::Custom);
    let pending = ctx.simulator.begin_compare(custom_only)?;
    ensure!(
        pending.payload().custom_rules == Some(WeightConfig::default_config()),
        "enabled custom mode without rules should send the default tables"
    );
    ensure!(!pending.payload().include_ml, "ml should be excluded");
    let outcome = ctx.service.answer_compare(pending.payload());
    ctx.simulator.complete_compare(pending, outcome)?;

    let no_custom = ModeSet::empty().with(Mode::Utilitarian).with(Mode::Ml);
    let pending = ctx.simulator.begin_compare(no_custom)?;
    let json = serde_json::to_value(pending.payload())?;
    ensure!(json["custom_rules"].is_null(), "custom_rules should be null");
    ensure!(json["include_ml"] == true, "ml should be included");
    let outcome = ctx.service.answer_compare(pending.payload());
    ctx.simulator.complete_compare(pending, outcome)?;
    Ok(())
}

fn single_custom_expectation(ctx: &mut ScenarioCtx) -> Result<()> {
    let pending = ctx.simulator.begin_single(Mode::Custom)?;
    let json = serde_json::to_value(pending.payload())?;
    ensure!(
        json.get("custom_rules").is_none(),
        "custom_rules should be omitted when none are configured"
    );
    let outcome = ctx.service.answer_single(pending.payload());
    ctx.simulator.complete_single(pending, outcome)?;
    Ok(())
}

fn no_mode_expectation(ctx: &mut ScenarioCtx) -> Result<()> {
    match ctx.simulator.begin_compare(ModeSet::empty()) {
        Err(SimulatorError::Validation(ValidationError::NoModeSelected)) => {}
        Err(other) => return Err(anyhow!("expected no-mode-selected, got {other}")),
        Ok(_) => return Err(anyhow!("comparison without modes should be rejected")),
    }
    ensure!(ctx.service.calls() == 0, "no service call should be made");
    ensure!(
        !ctx.simulator.is_request_in_flight(),
        "rejected request must not stay in flight"
    );
    Ok(())
}

fn animation_restart_expectation(ctx: &mut ScenarioCtx) -> Result<()> {
    // Utilitarian sacrifices track 1 (loss 7 against 8); protecting children
    // sends the trolley down track 2 instead.
    let first = ctx.decide(Mode::Utilitarian)?;
    let second = ctx.decide(Mode::Deontological)?;
    ensure!(
        first.chosen_track != second.chosen_track,
        "runs should pick different tracks"
    );
    let final_track = second.chosen_track;

    let mut timers = vec![first.timer, second.timer];
    while let Some(timer) = timers.pop() {
        if let Some(next) = ctx.simulator.fire_animation(timer.token) {
            timers.push(next);
        }
    }

    let animator = ctx.simulator.animator();
    ensure!(
        animator.state() == AnimationState::Idle,
        "animation should settle"
    );
    ensure!(
        animator.highlight(final_track) == TrackHighlight::Chosen,
        "latest decision's track should be chosen"
    );
    ensure!(
        animator.highlight(final_track.other()) == TrackHighlight::Safe,
        "other track should be safe"
    );
    Ok(())
}

fn transport_failure_expectation(ctx: &mut ScenarioCtx) -> Result<()> {
    let before = ctx.simulator.scenario().clone();
    ctx.service
        .fail_with(Some(TransportError::Network("connection refused".to_string())));
    match ctx.decide(Mode::Utilitarian) {
        Ok(_) => return Err(anyhow!("failed call should not succeed")),
        Err(err) => ensure!(
            matches!(
                err.downcast_ref::<SimulatorError>(),
                Some(SimulatorError::Transport(_))
            ),
            "expected a transport error, got {err}"
        ),
    }
    ensure!(ctx.simulator.history().is_empty(), "nothing should be recorded");
    ensure!(
        ctx.simulator.scenario() == &before,
        "scenario should be unchanged"
    );
    ensure!(
        !ctx.simulator.is_request_in_flight(),
        "in-flight marker should clear"
    );
    ctx.service.fail_with(None);
    ctx.decide(Mode::Utilitarian)?;
    ensure!(ctx.simulator.history().len() == 1, "retry should be recorded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_catalog_scenario_passes_against_stub() {
        for scenario in catalog_scenarios() {
            for iteration in 0..3 {
                let mut ctx = ScenarioCtx::new(&scenario.plan, iteration).unwrap();
                for check in &scenario.plan.checks {
                    check(&mut ctx).unwrap_or_else(|err| {
                        panic!("{} failed on iteration {iteration}: {err:#}", scenario.key)
                    });
                }
            }
        }
    }

    #[test]
    fn keys_are_unique() {
        let mut keys: Vec<_> = catalog_scenarios().iter().map(|s| s.key).collect();
        let total = keys.len();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), total);
    }
}
