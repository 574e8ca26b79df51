//! Requirement gate: one grant/deny decision per access attempt.
//!
//! # Purpose and responsibility
//! Evaluates an ordered list of declared requirements (permission, ownership,
//! privilege) for a single operation and returns one [`Decision`].
//!
//! # Where it fits
//! Callers build requirement lists as plain data and run the gate before
//! dispatching to the operation. Permission requirements go to the policy
//! [`Evaluator`]; ownership requirements go to the [`OwnershipRegistry`].
//!
//! # Key invariants and assumptions
//! - Requirements combine with OR in declaration order and evaluation stops
//!   at the first satisfied one. Failures never short-circuit.
//! - An empty requirement list denies.
//! - Inactive principals are denied before any requirement runs.
//! - Every requirement in one attempt sees the same evaluator snapshot.
//! - No lock is held while an ownership check is pending.
//!
//! # Security considerations
//! - A cancelled or timed-out attempt is a denial; partial evaluation never
//!   grants.
use crate::cache::DecisionCache;
use crate::evaluator::Evaluator;
use crate::ownership::OwnershipRegistry;
use crate::{Params, Principal, Privilege, Requirement, ResourceId, RoleProvider, SubjectProvider};
use std::sync::Arc;
use std::time::Duration;

pub const REASON_NO_REQUIREMENTS: &str = "no requirements declared";
pub const REASON_INACTIVE: &str = "principal is inactive";
pub const REASON_UNSATISFIED: &str = "no requirement satisfied";
pub const REASON_CANCELLED: &str = "cancelled";

/// Outcome of one access attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub granted: bool,
    /// Human-readable reason, set on denials.
    pub reason: Option<String>,
}

impl Decision {
    pub fn grant() -> Self {
        Self {
            granted: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            granted: false,
            reason: Some(reason.into()),
        }
    }

    pub fn is_granted(&self) -> bool {
        self.granted
    }
}

/// Who is asking, for what, with which operation parameters.
#[derive(Clone, Copy)]
pub struct AccessAttempt<'a> {
    pub principal: &'a dyn Principal,
    pub resource_type: &'a str,
    pub resource_id: Option<&'a ResourceId>,
    pub params: &'a Params,
}

impl<'a> AccessAttempt<'a> {
    pub fn new(principal: &'a dyn Principal, resource_type: &'a str, params: &'a Params) -> Self {
        Self {
            principal,
            resource_type,
            resource_id: None,
            params,
        }
    }

    pub fn with_resource_id(mut self, resource_id: &'a ResourceId) -> Self {
        self.resource_id = Some(resource_id);
        self
    }
}

#[derive(Clone)]
pub struct RequirementGate {
    subjects: Arc<dyn SubjectProvider>,
    roles: Arc<dyn RoleProvider>,
    ownership: Arc<OwnershipRegistry>,
    cache: Option<Arc<DecisionCache>>,
}

impl RequirementGate {
    pub fn new(
        subjects: Arc<dyn SubjectProvider>,
        roles: Arc<dyn RoleProvider>,
        ownership: Arc<OwnershipRegistry>,
    ) -> Self {
        Self {
            subjects,
            roles,
            ownership,
            cache: None,
        }
    }

    /// Memoize permission decisions in `cache`.
    pub fn with_cache(mut self, cache: Arc<DecisionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn roles(&self) -> &dyn RoleProvider {
        self.roles.as_ref()
    }

    pub fn ownership(&self) -> &OwnershipRegistry {
        &self.ownership
    }

    /// Evaluate `requirements` for `attempt` against one evaluator snapshot.
    pub async fn check(
        &self,
        evaluator: &Evaluator,
        attempt: AccessAttempt<'_>,
        requirements: &[Requirement],
    ) -> Decision {
        if requirements.is_empty() {
            return Decision::deny(REASON_NO_REQUIREMENTS);
        }
        if !attempt.principal.is_active() {
            return Decision::deny(REASON_INACTIVE);
        }

        for (index, requirement) in requirements.iter().enumerate() {
            let satisfied = self.evaluate(evaluator, attempt, requirement).await;
            tracing::debug!(
                index,
                kind = requirement.kind(),
                resource_type = attempt.resource_type,
                satisfied,
                "requirement evaluated"
            );
            if satisfied {
                return Decision::grant();
            }
        }
        Decision::deny(REASON_UNSATISFIED)
    }

    /// Like [`RequirementGate::check`], denying if `timeout` elapses first.
    pub async fn check_within(
        &self,
        timeout: Duration,
        evaluator: &Evaluator,
        attempt: AccessAttempt<'_>,
        requirements: &[Requirement],
    ) -> Decision {
        match tokio::time::timeout(timeout, self.check(evaluator, attempt, requirements)).await {
            Ok(decision) => decision,
            Err(_) => {
                tracing::warn!(
                    resource_type = attempt.resource_type,
                    timeout_ms = timeout.as_millis() as u64,
                    "access attempt timed out"
                );
                Decision::deny(REASON_CANCELLED)
            }
        }
    }

    async fn evaluate(
        &self,
        evaluator: &Evaluator,
        attempt: AccessAttempt<'_>,
        requirement: &Requirement,
    ) -> bool {
        match requirement {
            Requirement::Permission {
                resource_type,
                action,
            } => {
                let subject = self.subjects.subject(attempt.principal);
                self.permitted(evaluator, &subject, resource_type, action)
                    .await
            }
            Requirement::Ownership {
                resource_type,
                extractor,
            } => match extractor(attempt.params) {
                Some(resource_id) => {
                    self.ownership
                        .check(attempt.principal, resource_type, &resource_id)
                        .await
                }
                None => {
                    tracing::debug!(%resource_type, "resource id absent; ownership unmet");
                    false
                }
            },
            Requirement::Privilege(privilege) => {
                self.privilege_satisfied(evaluator, attempt, privilege)
                    .await
            }
        }
    }

    // Any role, else all permissions, else ownership of every listed type.
    // An empty alternative never counts as satisfied.
    async fn privilege_satisfied(
        &self,
        evaluator: &Evaluator,
        attempt: AccessAttempt<'_>,
        privilege: &Privilege,
    ) -> bool {
        if privilege
            .roles
            .iter()
            .any(|role| self.roles.has_role(attempt.principal, role))
        {
            return true;
        }

        if !privilege.permissions.is_empty() {
            let subject = self.subjects.subject(attempt.principal);
            let mut all = true;
            for permission in &privilege.permissions {
                if !self
                    .permitted(evaluator, &subject, &permission.resource, &permission.action)
                    .await
                {
                    all = false;
                    break;
                }
            }
            if all {
                return true;
            }
        }

        if privilege.ownership_required.is_empty() {
            return false;
        }
        let Some(resource_id) = attempt.resource_id else {
            tracing::debug!(privilege = %privilege.name, "resource id absent; ownership unmet");
            return false;
        };
        for resource_type in &privilege.ownership_required {
            if !self
                .ownership
                .check(attempt.principal, resource_type, resource_id)
                .await
            {
                return false;
            }
        }
        true
    }

    async fn permitted(
        &self,
        evaluator: &Evaluator,
        subject: &str,
        object: &str,
        action: &str,
    ) -> bool {
        let Some(cache) = &self.cache else {
            return evaluator.allowed(subject, object, action);
        };
        let snapshot = evaluator.snapshot_id();
        if let Some(allowed) = cache.get(snapshot, subject, object, action).await {
            return allowed;
        }
        let allowed = evaluator.allowed(subject, object, action);
        cache.put(snapshot, subject, object, action, allowed).await;
        allowed
    }
}
