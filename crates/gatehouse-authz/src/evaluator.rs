//! Permission evaluator compiled from a model and a policy snapshot.
//!
//! # Purpose and responsibility
//! Answers `allowed(subject, object, action)` using the model's matcher and
//! effect rule, with role inheritance resolved transitively.
//!
//! # Key invariants and assumptions
//! - An evaluator is immutable once built; concurrent readers need no lock.
//! - Deny wins under the default effect; no matching policy means deny.
//! - Engine failures at decision time are logged and reported as deny.
use crate::policy::{Effect, GroupingPolicy, Policy};
use crate::{AuthzResult, Model};
use casbin::{CoreApi, Enforcer};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SNAPSHOT_ID: AtomicU64 = AtomicU64::new(1);

pub struct Evaluator {
    enforcer: Enforcer,
    model: Model,
    policies: Vec<Policy>,
    groupings: Vec<GroupingPolicy>,
    generation: u64,
    snapshot_id: u64,
}

impl std::fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evaluator")
            .field("generation", &self.generation)
            .field("snapshot_id", &self.snapshot_id)
            .field("policies", &self.policies.len())
            .field("groupings", &self.groupings.len())
            .finish_non_exhaustive()
    }
}

impl Evaluator {
    pub(crate) fn new(
        enforcer: Enforcer,
        model: Model,
        policies: Vec<Policy>,
        groupings: Vec<GroupingPolicy>,
        generation: u64,
    ) -> Self {
        Self {
            enforcer,
            model,
            policies,
            groupings,
            generation,
            snapshot_id: NEXT_SNAPSHOT_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Decide whether `subject` may perform `action` on `object`.
    pub fn allowed(&self, subject: &str, object: &str, action: &str) -> bool {
        self.try_allowed(subject, object, action)
            .unwrap_or_else(|err| {
                tracing::warn!(
                    error = %err,
                    subject,
                    object,
                    action,
                    "policy evaluation failed; denying"
                );
                false
            })
    }

    /// Like [`Evaluator::allowed`], surfacing engine errors instead of denying.
    pub fn try_allowed(&self, subject: &str, object: &str, action: &str) -> AuthzResult<bool> {
        Ok(self.enforcer.enforce((subject, object, action))?)
    }

    /// Domain-scoped decision for models whose request carries `dom`.
    pub fn allowed_in(&self, subject: &str, domain: &str, object: &str, action: &str) -> bool {
        self.enforcer
            .enforce((subject, domain, object, action))
            .unwrap_or_else(|err| {
                tracing::warn!(
                    error = %err,
                    subject,
                    domain,
                    object,
                    action,
                    "policy evaluation failed; denying"
                );
                false
            })
    }

    /// Every role reachable from `subject` through grouping edges.
    ///
    /// Domain-less edges are always followed; scoped edges only inside
    /// `domain`. Cycles are cut by tracking visited nodes.
    pub fn implicit_roles(&self, subject: &str, domain: Option<&str>) -> Vec<String> {
        reachable_roles(&self.groupings, subject, domain)
    }

    /// `(object, action)` pairs granted to `subject` directly or through its
    /// roles, as stored (patterns are not expanded). Pairs that also carry a
    /// deny row for the same subject set are dropped.
    pub fn implicit_permissions(
        &self,
        subject: &str,
        domain: Option<&str>,
    ) -> Vec<(String, String)> {
        let mut subjects: HashSet<String> =
            self.implicit_roles(subject, domain).into_iter().collect();
        subjects.insert(subject.to_string());

        let relevant = |policy: &&Policy| {
            subjects.contains(&policy.subject)
                && (policy.domain.is_none() || policy.domain.as_deref() == domain)
        };
        let denied: HashSet<(&str, &str)> = self
            .policies
            .iter()
            .filter(relevant)
            .filter(|policy| policy.effect == Effect::Deny)
            .map(|policy| (policy.object.as_str(), policy.action.as_str()))
            .collect();

        let mut seen = HashSet::new();
        self.policies
            .iter()
            .filter(relevant)
            .filter(|policy| policy.effect == Effect::Allow)
            .map(|policy| (policy.object.as_str(), policy.action.as_str()))
            .filter(|pair| !denied.contains(pair) && seen.insert(*pair))
            .map(|(object, action)| (object.to_string(), action.to_string()))
            .collect()
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn policies(&self) -> &[Policy] {
        &self.policies
    }

    pub fn groupings(&self) -> &[GroupingPolicy] {
        &self.groupings
    }

    /// Store revision this evaluator was built from.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Process-unique id of this build; increases with every build.
    ///
    /// Unlike [`Evaluator::generation`], two stores at the same revision
    /// never share an id.
    pub fn snapshot_id(&self) -> u64 {
        self.snapshot_id
    }
}

/// Breadth-first walk over the grouping edges that apply in `domain`.
///
/// Returns roles in discovery order, without `subject` itself.
pub(crate) fn reachable_roles(
    groupings: &[GroupingPolicy],
    subject: &str,
    domain: Option<&str>,
) -> Vec<String> {
    let mut visited: HashSet<&str> = HashSet::from([subject]);
    let mut queue = VecDeque::from([subject]);
    let mut roles = Vec::new();

    while let Some(current) = queue.pop_front() {
        for edge in groupings {
            if edge.child != current || !edge.applies_in(domain) {
                continue;
            }
            if visited.insert(edge.parent.as_str()) {
                roles.push(edge.parent.clone());
                queue.push_back(edge.parent.as_str());
            }
        }
    }
    roles
}
