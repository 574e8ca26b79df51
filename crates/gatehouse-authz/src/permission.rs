//! Permissions and privilege bundles.
//!
//! # Purpose
//! Defines the `(resource, action)` permission value and the named
//! [`Privilege`] bundle used by privilege requirements.
//!
//! # How it fits
//! Requirement lists reference privileges; the gate checks a privilege by
//! trying its three alternatives (roles, permissions, ownership).
//!
//! # Key invariants
//! - Permission equality and hashing use `(resource, action)`; `context`
//!   never participates.
//! - An empty alternative inside a privilege is never satisfied.
//!
//! # Examples
//! ```rust
//! use gatehouse_authz::{Permission, Privilege};
//!
//! let moderate = Privilege::new("moderate")
//!     .with_role("moderator")
//!     .with_permission(Permission::new("comment", "delete"));
//! assert!(moderate.roles.contains("moderator"));
//! assert_eq!(moderate.permissions.len(), 1);
//! ```
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::hash::{Hash, Hasher};

/// An action on a resource type or object pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permission {
    pub resource: String,
    pub action: String,
    #[serde(default)]
    pub context: BTreeMap<String, Value>,
}

impl Permission {
    pub fn new(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            action: action.into(),
            context: BTreeMap::new(),
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    /// Render as `action:resource`.
    pub fn as_string(&self) -> String {
        format!("{}:{}", self.action, self.resource)
    }
}

impl PartialEq for Permission {
    fn eq(&self, other: &Self) -> bool {
        self.resource == other.resource && self.action == other.action
    }
}

impl Eq for Permission {}

impl Hash for Permission {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.resource.hash(state);
        self.action.hash(state);
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_string())
    }
}

/// Named, reusable bundle of alternative grant conditions.
///
/// # Summary
/// Satisfied when the principal holds any listed role, or every listed
/// permission, or ownership of the target for every listed resource type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Privilege {
    pub name: String,
    #[serde(default)]
    pub roles: BTreeSet<String>,
    #[serde(default)]
    pub permissions: HashSet<Permission>,
    #[serde(default)]
    pub ownership_required: BTreeSet<String>,
    #[serde(default)]
    pub conditions: BTreeMap<String, Value>,
}

impl Privilege {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permissions.insert(permission);
        self
    }

    pub fn with_ownership(mut self, resource_type: impl Into<String>) -> Self {
        self.ownership_required.insert(resource_type.into());
        self
    }

    pub fn with_condition(mut self, key: impl Into<String>, value: Value) -> Self {
        self.conditions.insert(key.into(), value);
        self
    }
}
