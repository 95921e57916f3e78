//! Unit tests for component diffing.

use crate::changeset::{
    domain::{ChangeKind, Component, ComponentName, ModuleSource, Variables, diff_components},
    ports::{ComponentRepository, ComponentRepositoryMut},
};
use crate::versioning::domain::Dataset;
use mockable::DefaultClock;
use rstest::rstest;
use serde_json::json;

fn component(name: &str, size: i64) -> Component {
    let mut variables = Variables::new();
    variables.insert("size".to_owned(), json!(size));
    Component::new(
        ComponentName::new(name).expect("valid component name"),
        ModuleSource::new("modules/app").expect("valid module source"),
        variables,
        &DefaultClock,
    )
}

#[rstest]
fn diff_reports_added_and_modified_components() {
    let unchanged = component("db", 1);
    let edited = component("web", 1);
    let mut base = Dataset::new();
    base.store_component(&unchanged).expect("store");
    base.store_component(&edited).expect("store");

    let mut head = base.clone();
    let mut updated = head
        .find_component(edited.id())
        .expect("read")
        .expect("component exists");
    let mut updates = Variables::new();
    updates.insert("size".to_owned(), json!(2));
    updated.set_variables(updates);
    head.update_component(&updated).expect("update");
    let added = component("api", 1);
    head.store_component(&added).expect("store");

    let changes = diff_components(&base, &head).expect("diff");

    let summary: Vec<(&str, ChangeKind)> = changes
        .iter()
        .map(|change| (change.component.name().as_str(), change.kind))
        .collect();
    assert_eq!(
        summary,
        vec![("api", ChangeKind::Added), ("web", ChangeKind::Modified)]
    );
}

#[rstest]
fn identical_datasets_have_no_changes() {
    let mut base = Dataset::new();
    base.store_component(&component("web", 1)).expect("store");

    let changes = diff_components(&base, &base.clone()).expect("diff");

    assert!(changes.is_empty());
}
