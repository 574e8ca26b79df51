//! Declared authorization requirements for one operation.
//!
//! # Purpose
//! Requirement lists are plain data built by the caller (typically next to
//! route registration) and handed to the [`RequirementGate`](crate::RequirementGate)
//! before the operation runs.
use crate::{Params, Privilege, ResourceId};
use std::sync::Arc;

/// Pulls the target resource id out of an operation's parameters.
pub type ResourceIdExtractor = Arc<dyn Fn(&Params) -> Option<ResourceId> + Send + Sync>;

/// Extractor reading the parameter called `name`.
pub fn param_extractor(name: impl Into<String>) -> ResourceIdExtractor {
    let name = name.into();
    Arc::new(move |params: &Params| params.get(&name).map(|value| ResourceId::new(value.as_str())))
}

#[derive(Clone)]
pub enum Requirement {
    /// `(resource_type, action)` checked against the policy evaluator.
    Permission {
        resource_type: String,
        action: String,
    },
    /// Ownership of the instance whose id the extractor yields.
    Ownership {
        resource_type: String,
        extractor: ResourceIdExtractor,
    },
    /// A named privilege bundle.
    Privilege(Arc<Privilege>),
}

impl Requirement {
    pub fn permission(resource_type: impl Into<String>, action: impl Into<String>) -> Self {
        Requirement::Permission {
            resource_type: resource_type.into(),
            action: action.into(),
        }
    }

    pub fn ownership(resource_type: impl Into<String>, extractor: ResourceIdExtractor) -> Self {
        Requirement::Ownership {
            resource_type: resource_type.into(),
            extractor,
        }
    }

    /// Ownership requirement reading the id from parameter `param`.
    pub fn ownership_of(resource_type: impl Into<String>, param: impl Into<String>) -> Self {
        Self::ownership(resource_type, param_extractor(param))
    }

    pub fn privilege(privilege: impl Into<Arc<Privilege>>) -> Self {
        Requirement::Privilege(privilege.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Requirement::Permission { .. } => "permission",
            Requirement::Ownership { .. } => "ownership",
            Requirement::Privilege(_) => "privilege",
        }
    }
}

impl std::fmt::Debug for Requirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Requirement::Permission {
                resource_type,
                action,
            } => f
                .debug_struct("Permission")
                .field("resource_type", resource_type)
                .field("action", action)
                .finish(),
            Requirement::Ownership { resource_type, .. } => f
                .debug_struct("Ownership")
                .field("resource_type", resource_type)
                .finish_non_exhaustive(),
            Requirement::Privilege(privilege) => {
                f.debug_tuple("Privilege").field(&privilege.name).finish()
            }
        }
    }
}
