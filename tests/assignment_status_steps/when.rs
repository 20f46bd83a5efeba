//! When steps for assignment status BDD scenarios.

use super::world::{AssignmentWorld, run_async};
use chrono::Duration;
use eyre::WrapErr;
use rstest_bdd_macros::when;
use taskflow::assignment::services::ManualChangeRequest;

fn submit_manual_change(
    world: &mut AssignmentWorld,
    code: u64,
    keep_changes: bool,
) -> Result<(), eyre::Report> {
    let assignment_id = world.assignment()?.id();
    let code = i64::try_from(code)?;
    let result = run_async(world.service.apply_manual_change(ManualChangeRequest::new(
        assignment_id,
        code,
        keep_changes,
    )));
    if let Ok(ref updated) = result {
        world.assignment = Some(updated.clone());
    }
    world.last_change_result = Some(result);
    Ok(())
}

#[when("an operator sets the status to {code:u64} without keeping changes")]
fn operator_sets_status(world: &mut AssignmentWorld, code: u64) -> Result<(), eyre::Report> {
    submit_manual_change(world, code, false)
}

#[when("an operator sets the status to {code:u64} keeping changes")]
fn operator_sets_kept_status(world: &mut AssignmentWorld, code: u64) -> Result<(), eyre::Report> {
    submit_manual_change(world, code, true)
}

#[when("{minutes:u64} minutes pass")]
fn minutes_pass(world: &mut AssignmentWorld, minutes: u64) -> Result<(), eyre::Report> {
    world.clock.advance(Duration::minutes(i64::try_from(minutes)?));
    Ok(())
}

#[when("a reconciliation cycle runs")]
fn reconciliation_cycle_runs(world: &mut AssignmentWorld) -> Result<(), eyre::Report> {
    world.run_cycle().wrap_err("run reconciliation cycle")
}
