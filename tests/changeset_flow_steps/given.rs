//! Given steps for changeset flow BDD scenarios.

use super::world::{FlowWorld, run_async};
use changeyard::changeset::{domain::Variables, services::CreateComponentRequest};
use changeyard::task::domain::TaskRecord;
use eyre::WrapErr;
use rstest_bdd_macros::given;
use serde_json::json;

fn create_with_component(
    world: &mut FlowWorld,
    changeset: &str,
    component: String,
    module: String,
) -> Result<(), eyre::Report> {
    run_async(world.facade.create_changeset(changeset)).wrap_err("create changeset")?;
    let created = run_async(world.facade.create_component(
        changeset,
        CreateComponentRequest::new(component, module).with_variable("size", json!(1)),
    ))
    .wrap_err("create component")?;
    world.component = Some(created);
    Ok(())
}

fn merge_cleanly(world: &mut FlowWorld, changeset: &str) -> Result<(), eyre::Report> {
    let merge = world.merge(changeset)?;
    if merge.rejection().is_some() {
        return Err(eyre::eyre!("setup merge of {changeset} was rejected: {merge:?}"));
    }
    Ok(())
}

#[given(r#"changeset "{changeset}" has component "{component}" from module "{module}""#)]
fn changeset_with_component(
    world: &mut FlowWorld,
    changeset: String,
    component: String,
    module: String,
) -> Result<(), eyre::Report> {
    create_with_component(world, &changeset, component, module)
}

#[given(r#"changeset "{changeset}" has been merged with a planned component "{component}""#)]
fn merged_changeset_with_component(
    world: &mut FlowWorld,
    changeset: String,
    component: String,
) -> Result<(), eyre::Report> {
    create_with_component(world, &changeset, component, "modules/web".to_owned())?;
    world.plan(&changeset)?;
    merge_cleanly(world, &changeset)
}

#[given(r#"changeset "{changeset}" is open"#)]
fn open_changeset(world: &mut FlowWorld, changeset: String) -> Result<(), eyre::Report> {
    run_async(world.facade.create_changeset(&changeset)).wrap_err("create changeset")?;
    Ok(())
}

#[given(r#"changeset "{changeset}" sets "{key}" on component "{component}" and plans it"#)]
fn changeset_updates_and_plans(
    world: &mut FlowWorld,
    changeset: String,
    key: String,
    component: String,
) -> Result<(), eyre::Report> {
    let target = world.component()?;
    if target.name().as_str() != component {
        return Err(eyre::eyre!("scenario only tracks component {}", target.name()));
    }
    let mut variables = Variables::new();
    variables.insert(key, json!(5));
    run_async(world.facade.update_component(&changeset, target.id(), variables))
        .wrap_err("update component")?;
    world.plan(&changeset)?;
    Ok(())
}

#[given(r#"changeset "{changeset}" has been merged"#)]
fn merged_changeset(world: &mut FlowWorld, changeset: String) -> Result<(), eyre::Report> {
    merge_cleanly(world, &changeset)
}

#[given(r#"changeset "{changeset}" holds two plans and one apply for component "{component}""#)]
fn two_plans_one_apply(
    world: &mut FlowWorld,
    changeset: String,
    component: String,
) -> Result<(), eyre::Report> {
    let target = world.component()?;
    if target.name().as_str() != component {
        return Err(eyre::eyre!("scenario only tracks component {}", target.name()));
    }
    world.plan(&changeset)?;
    let waiting = run_async(world.facade.create_plan(&changeset, target.id()))
        .wrap_err("queue second plan")?;
    world.plans.push(waiting);

    let applies = run_async(world.facade.list_applies(&changeset)).wrap_err("list applies")?;
    if applies.len() != 1 {
        return Err(eyre::eyre!("expected one apply, found {}", applies.len()));
    }
    world.applies = applies.iter().map(TaskRecord::id).collect();
    Ok(())
}
