//! When steps for changeset flow BDD scenarios.

use super::world::{FlowWorld, run_async};
use changeyard::task::domain::TaskRecord;
use eyre::WrapErr;
use rstest_bdd_macros::when;

#[when(r#"component "{component}" is planned in changeset "{changeset}""#)]
fn plan_component(
    world: &mut FlowWorld,
    component: String,
    changeset: String,
) -> Result<(), eyre::Report> {
    let target = world.component()?;
    if target.name().as_str() != component {
        return Err(eyre::eyre!("scenario only tracks component {}", target.name()));
    }
    world.plan(&changeset)?;
    Ok(())
}

#[when(r#"changeset "{changeset}" is merged"#)]
fn merge_changeset(world: &mut FlowWorld, changeset: String) -> Result<(), eyre::Report> {
    world.merge(&changeset)?;
    Ok(())
}

#[when(r#"changeset "{changeset}" is rebased onto main"#)]
fn rebase_changeset(world: &mut FlowWorld, changeset: String) -> Result<(), eyre::Report> {
    let queued = run_async(world.facade.create_rebase(&changeset)).wrap_err("create rebase")?;
    run_async(world.facade.run_rebase(queued.id())).wrap_err("run rebase")?;
    Ok(())
}

#[when(r#"changeset "{changeset}" is deleted"#)]
fn delete_changeset(world: &mut FlowWorld, changeset: String) -> Result<(), eyre::Report> {
    let summary =
        run_async(world.facade.delete_changeset(&changeset)).wrap_err("delete changeset")?;
    world.removal = Some(summary);
    Ok(())
}
