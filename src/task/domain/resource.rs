//! Provisioned resources and component state recorded by applies.

use super::{ApplyId, ResourceId};
use crate::changeset::domain::ComponentId;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One resource discovered by an apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    id: ResourceId,
    component_id: ComponentId,
    apply_id: ApplyId,
    address: String,
    resource_type: String,
    attributes: Value,
}

impl ResourceRecord {
    /// Creates a resource record.
    #[must_use]
    pub fn new(
        component_id: ComponentId,
        apply_id: ApplyId,
        address: impl Into<String>,
        resource_type: impl Into<String>,
        attributes: Value,
    ) -> Self {
        Self {
            id: ResourceId::new(),
            component_id,
            apply_id,
            address: address.into(),
            resource_type: resource_type.into(),
            attributes,
        }
    }

    /// Returns the resource identifier.
    #[must_use]
    pub const fn id(&self) -> ResourceId {
        self.id
    }

    /// Returns the owning component.
    #[must_use]
    pub const fn component_id(&self) -> ComponentId {
        self.component_id
    }

    /// Returns the apply that discovered the resource.
    #[must_use]
    pub const fn apply_id(&self) -> ApplyId {
        self.apply_id
    }

    /// Returns the provisioning address, e.g. `aws_instance.web`.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns the provider resource type.
    #[must_use]
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Returns provider attributes.
    #[must_use]
    pub const fn attributes(&self) -> &Value {
        &self.attributes
    }
}

/// Latest provisioning state of a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRecord {
    component_id: ComponentId,
    apply_id: ApplyId,
    state: Value,
    outputs: Value,
    updated_at: DateTime<Utc>,
}

impl StateRecord {
    /// Creates a state record.
    #[must_use]
    pub fn new(
        component_id: ComponentId,
        apply_id: ApplyId,
        state: Value,
        outputs: Value,
        clock: &impl Clock,
    ) -> Self {
        Self {
            component_id,
            apply_id,
            state,
            outputs,
            updated_at: clock.utc(),
        }
    }

    /// Returns the component.
    #[must_use]
    pub const fn component_id(&self) -> ComponentId {
        self.component_id
    }

    /// Returns the apply that produced the state.
    #[must_use]
    pub const fn apply_id(&self) -> ApplyId {
        self.apply_id
    }

    /// Returns the opaque provisioning state.
    #[must_use]
    pub const fn state(&self) -> &Value {
        &self.state
    }

    /// Returns module outputs.
    #[must_use]
    pub const fn outputs(&self) -> &Value {
        &self.outputs
    }

    /// Returns when the state was recorded.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
