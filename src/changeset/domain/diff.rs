//! Component-level diff between two dataset snapshots.

use super::{Component, ComponentId};
use crate::versioning::domain::{Dataset, RecordResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a component differs from the base snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// The component does not exist in the base snapshot.
    Added,
    /// The component exists in both snapshots with different definitions.
    Modified,
}

/// One changed component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentChange {
    /// Component definition at the head snapshot.
    pub component: Component,
    /// Kind of change.
    pub kind: ChangeKind,
}

impl ComponentChange {
    /// Returns the identifier of the changed component.
    #[must_use]
    pub const fn component_id(&self) -> ComponentId {
        self.component.id()
    }
}

/// Lists components added or modified in `head` relative to `base`, ordered
/// by component name.
///
/// # Errors
///
/// Returns [`crate::versioning::domain::RecordError`] when a component row
/// does not decode.
pub fn diff_components(base: &Dataset, head: &Dataset) -> RecordResult<Vec<ComponentChange>> {
    let before: BTreeMap<ComponentId, Component> = base
        .all::<Component>()?
        .into_iter()
        .map(|component| (component.id(), component))
        .collect();

    let mut changes: Vec<ComponentChange> = head
        .all::<Component>()?
        .into_iter()
        .filter_map(|component| match before.get(&component.id()) {
            None => Some(ComponentChange {
                component,
                kind: ChangeKind::Added,
            }),
            Some(previous) if previous != &component => Some(ComponentChange {
                component,
                kind: ChangeKind::Modified,
            }),
            Some(_) => None,
        })
        .collect();
    changes.sort_by(|left, right| left.component.name().cmp(right.component.name()));
    Ok(changes)
}
