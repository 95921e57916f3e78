//! Then steps for changeset flow BDD scenarios.

use super::world::{FlowWorld, run_async};
use changeyard::changeset::domain::{ChangesetState, ReviewState};
use changeyard::task::{
    domain::{Merge, TaskRecord, TaskState},
    ports::{OperationKind, PlanStore},
};
use changeyard::versioning::{domain::BranchName, ports::VersionedStore};
use eyre::WrapErr;
use rstest_bdd_macros::then;

fn expect_task_state(found: TaskState, expected: &str, what: &str) -> Result<(), eyre::Report> {
    let expected_state = TaskState::try_from(expected)
        .map_err(|err| eyre::eyre!("invalid expected state in scenario: {err}"))?;
    if found != expected_state {
        return Err(eyre::eyre!("expected {what} to be {expected_state}, found {found}"));
    }
    Ok(())
}

fn merge_state(merge: Option<&Merge>, expected: &str, what: &str) -> Result<(), eyre::Report> {
    let found = merge.ok_or_else(|| eyre::eyre!("no {what} recorded"))?;
    expect_task_state(found.state(), expected, what)
}

#[then(r#"the latest plan is "{state}""#)]
fn latest_plan_is(world: &FlowWorld, state: String) -> Result<(), eyre::Report> {
    let plan = world
        .plans
        .last()
        .ok_or_else(|| eyre::eyre!("no plan recorded"))?;
    expect_task_state(plan.state(), &state, "the latest plan")
}

#[then(r#"the first merge of changeset "{changeset}" is "{state}""#)]
fn first_merge_is(world: &FlowWorld, changeset: String, state: String) -> Result<(), eyre::Report> {
    merge_state(world.merges_of(&changeset).next(), &state, "the first merge")
}

#[then(r#"the latest merge of changeset "{changeset}" is "{state}""#)]
fn latest_merge_is(world: &FlowWorld, changeset: String, state: String) -> Result<(), eyre::Report> {
    merge_state(world.merges_of(&changeset).last(), &state, "the latest merge")
}

#[then(r#"changeset "{changeset}" has state "{state}""#)]
fn changeset_state_is(world: &FlowWorld, changeset: String, state: String) -> Result<(), eyre::Report> {
    let expected = ChangesetState::try_from(state.as_str())
        .map_err(|err| eyre::eyre!("invalid expected state in scenario: {err}"))?;
    let found = run_async(world.facade.get_changeset(&changeset)).wrap_err("read changeset")?;
    if found.state() != expected {
        return Err(eyre::eyre!("expected {changeset} to be {expected}, found {}", found.state()));
    }
    Ok(())
}

#[then(r#"the review of changeset "{changeset}" is "{state}""#)]
fn changeset_review_is(world: &FlowWorld, changeset: String, state: String) -> Result<(), eyre::Report> {
    let expected = ReviewState::try_from(state.as_str())
        .map_err(|err| eyre::eyre!("invalid expected review state in scenario: {err}"))?;
    let found = run_async(world.facade.get_changeset(&changeset)).wrap_err("read changeset")?;
    if found.review_state() != expected {
        return Err(eyre::eyre!(
            "expected {changeset} review to be {expected}, found {}",
            found.review_state()
        ));
    }
    Ok(())
}

#[then(r#"no plan artifacts or logs remain for changeset "{changeset}""#)]
fn no_outputs_remain(world: &FlowWorld, changeset: String) -> Result<(), eyre::Report> {
    let summary = world
        .removal
        .ok_or_else(|| eyre::eyre!("{changeset} was not deleted"))?;
    if summary.plans != world.plans.len() || summary.applies != world.applies.len() {
        return Err(eyre::eyre!("unexpected removal summary {summary:?}"));
    }
    for plan in &world.plans {
        if run_async(world.plan_store.has_plan(plan.id())).wrap_err("query plan store")? {
            return Err(eyre::eyre!("plan artifact {} still stored", plan.id()));
        }
        if world
            .log_store
            .contains(OperationKind::Plan, plan.id().into_inner())
            .wrap_err("query log store")?
        {
            return Err(eyre::eyre!("plan log {} still stored", plan.id()));
        }
    }
    for apply in &world.applies {
        if world
            .log_store
            .contains(OperationKind::Apply, apply.into_inner())
            .wrap_err("query log store")?
        {
            return Err(eyre::eyre!("apply log {apply} still stored"));
        }
    }
    Ok(())
}

#[then(r#"branch "{branch}" no longer exists"#)]
fn branch_is_gone(world: &FlowWorld, branch: String) -> Result<(), eyre::Report> {
    let name = BranchName::new(branch).wrap_err("branch name")?;
    if run_async(world.store.branch_exists(&name)).wrap_err("query store")? {
        return Err(eyre::eyre!("branch {name} still exists"));
    }
    Ok(())
}
