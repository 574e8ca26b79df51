//! Permission and grouping policy records.
//!
//! # Purpose
//! Defines the policy and grouping row shapes held by the policy store and
//! replayed into every evaluator.
use crate::{AuthzError, AuthzResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    #[default]
    Allow,
    Deny,
}

impl Effect {
    pub fn as_str(self) -> &'static str {
        match self {
            Effect::Allow => "allow",
            Effect::Deny => "deny",
        }
    }
}

impl std::fmt::Display for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Effect {
    type Err = AuthzError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "allow" => Ok(Effect::Allow),
            "deny" => Ok(Effect::Deny),
            other => Err(AuthzError::InvalidEffect(other.to_string())),
        }
    }
}

/// An allow/deny rule over `(subject, object, action)`.
///
/// `domain` is only meaningful for domain-scoped models.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    pub object: String,
    pub action: String,
    #[serde(default)]
    pub effect: Effect,
}

impl Policy {
    pub fn allow(
        subject: impl Into<String>,
        object: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            domain: None,
            object: object.into(),
            action: action.into(),
            effect: Effect::Allow,
        }
    }

    pub fn deny(
        subject: impl Into<String>,
        object: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            effect: Effect::Deny,
            ..Self::allow(subject, object, action)
        }
    }

    pub fn in_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Domain placeholder for rows that apply in every domain.
    pub const ANY_DOMAIN: &str = "*";

    // Row layout follows the policy definition: sub, [dom,] obj, act, [eft].
    pub(crate) fn to_row(&self, with_effect: bool, with_domain: bool) -> Vec<String> {
        let mut row = vec![self.subject.clone()];
        if with_domain {
            row.push(
                self.domain
                    .clone()
                    .unwrap_or_else(|| Self::ANY_DOMAIN.to_string()),
            );
        }
        row.push(self.object.clone());
        row.push(self.action.clone());
        if with_effect {
            row.push(self.effect.as_str().to_string());
        }
        row
    }
}

/// Role inheritance edge: `child` inherits every permission of `parent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupingPolicy {
    pub child: String,
    pub parent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

impl GroupingPolicy {
    /// # Errors
    /// - [`AuthzError::SelfGrouping`] when `child == parent`.
    pub fn new(child: impl Into<String>, parent: impl Into<String>) -> AuthzResult<Self> {
        let grouping = Self {
            child: child.into(),
            parent: parent.into(),
            domain: None,
        };
        grouping.validate()?;
        Ok(grouping)
    }

    pub fn in_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn validate(&self) -> AuthzResult<()> {
        if self.child == self.parent {
            return Err(AuthzError::SelfGrouping(self.child.clone()));
        }
        Ok(())
    }

    /// Whether this edge may be followed while resolving roles in `domain`.
    ///
    /// Domain-less edges are global; scoped edges only apply to their domain.
    pub fn applies_in(&self, domain: Option<&str>) -> bool {
        match &self.domain {
            None => true,
            Some(scope) => domain == Some(scope.as_str()),
        }
    }

}
