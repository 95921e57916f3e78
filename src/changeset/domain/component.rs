//! Component definitions versioned on changeset branches.

use super::{ChangesetDomainError, ComponentId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Input variables passed to a component's provisioning module.
pub type Variables = BTreeMap<String, serde_json::Value>;

/// Validated component name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentName(String);

impl ComponentName {
    const MAX_LENGTH: usize = 64;

    /// Creates a validated component name.
    ///
    /// # Errors
    ///
    /// Returns [`ChangesetDomainError::EmptyComponentName`] for blank input
    /// and [`ChangesetDomainError::InvalidComponentName`] when the name is
    /// too long or carries characters outside `[a-z0-9_-]`.
    pub fn new(value: impl Into<String>) -> Result<Self, ChangesetDomainError> {
        let raw = value.into();
        let normalized = raw.trim();
        if normalized.is_empty() {
            return Err(ChangesetDomainError::EmptyComponentName);
        }

        let is_valid = normalized.chars().count() <= Self::MAX_LENGTH
            && normalized
                .chars()
                .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '-' | '_'));
        if !is_valid {
            return Err(ChangesetDomainError::InvalidComponentName(raw));
        }
        Ok(Self(normalized.to_owned()))
    }

    /// Returns the name as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Location of the provisioning module a component instantiates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleSource(String);

impl ModuleSource {
    /// Creates a module source reference.
    ///
    /// # Errors
    ///
    /// Returns [`ChangesetDomainError::EmptyModuleSource`] for blank input.
    pub fn new(value: impl Into<String>) -> Result<Self, ChangesetDomainError> {
        let raw = value.into();
        let normalized = raw.trim();
        if normalized.is_empty() {
            return Err(ChangesetDomainError::EmptyModuleSource);
        }
        Ok(Self(normalized.to_owned()))
    }

    /// Returns the source as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named instantiation of a provisioning module.
///
/// Components carry no modification timestamp: two changesets editing
/// different variables of the same component merge cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    id: ComponentId,
    name: ComponentName,
    module_source: ModuleSource,
    variables: Variables,
    created_at: DateTime<Utc>,
}

impl Component {
    /// Creates a component definition.
    #[must_use]
    pub fn new(
        name: ComponentName,
        module_source: ModuleSource,
        variables: Variables,
        clock: &impl Clock,
    ) -> Self {
        Self {
            id: ComponentId::new(),
            name,
            module_source,
            variables,
            created_at: clock.utc(),
        }
    }

    /// Returns the component identifier.
    #[must_use]
    pub const fn id(&self) -> ComponentId {
        self.id
    }

    /// Returns the component name.
    #[must_use]
    pub const fn name(&self) -> &ComponentName {
        &self.name
    }

    /// Returns the module source.
    #[must_use]
    pub const fn module_source(&self) -> &ModuleSource {
        &self.module_source
    }

    /// Returns the module variables.
    #[must_use]
    pub const fn variables(&self) -> &Variables {
        &self.variables
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Merges `updates` into the variables; a `null` value removes the key.
    pub fn set_variables(&mut self, updates: Variables) {
        for (key, value) in updates {
            if value.is_null() {
                self.variables.remove(&key);
            } else {
                self.variables.insert(key, value);
            }
        }
    }
}
