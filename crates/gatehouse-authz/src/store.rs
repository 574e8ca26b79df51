//! Authoritative in-memory policy store and evaluator construction.
//!
//! # Purpose and responsibility
//! Holds the ordered permission and grouping rows and compiles them, together
//! with a [`Model`], into a fresh Casbin-backed [`Evaluator`].
//!
//! # Key invariants and assumptions
//! - Rows are append-only and keep insertion order; duplicates are kept.
//! - Building an evaluator replays every row and never touches evaluators
//!   returned earlier.
//! - The model is validated before any row is replayed, so a model without
//!   effect or matcher definitions never serves a decision.
use crate::evaluator::{Evaluator, reachable_roles};
use crate::policy::{Effect, GroupingPolicy, Policy};
use crate::{AuthzError, AuthzResult, Model};
use casbin::{CoreApi, DefaultModel, Enforcer, MemoryAdapter, MgmtApi};
use serde::Deserialize;

#[derive(Debug, Clone, Default)]
pub struct PolicyStore {
    policies: Vec<Policy>,
    groupings: Vec<GroupingPolicy>,
    revision: u64,
}

#[derive(Debug, Default, Deserialize)]
struct PolicyDocument {
    #[serde(default)]
    policies: Vec<Policy>,
    #[serde(default)]
    groupings: Vec<GroupingPolicy>,
}

impl PolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_policy(
        &mut self,
        subject: impl Into<String>,
        object: impl Into<String>,
        action: impl Into<String>,
        effect: Effect,
    ) {
        self.insert_policy(Policy {
            subject: subject.into(),
            domain: None,
            object: object.into(),
            action: action.into(),
            effect,
        });
    }

    pub fn insert_policy(&mut self, policy: Policy) {
        self.policies.push(policy);
        self.revision += 1;
    }

    /// Append a role inheritance edge.
    ///
    /// # Errors
    /// - [`AuthzError::SelfGrouping`](crate::AuthzError::SelfGrouping) when
    ///   `child == parent`.
    pub fn add_grouping(
        &mut self,
        child: impl Into<String>,
        parent: impl Into<String>,
        domain: Option<&str>,
    ) -> AuthzResult<()> {
        let mut grouping = GroupingPolicy::new(child, parent)?;
        if let Some(domain) = domain {
            grouping = grouping.in_domain(domain);
        }
        self.groupings.push(grouping);
        self.revision += 1;
        Ok(())
    }

    pub fn insert_grouping(&mut self, grouping: GroupingPolicy) -> AuthzResult<()> {
        grouping.validate()?;
        self.groupings.push(grouping);
        self.revision += 1;
        Ok(())
    }

    /// Append every row of a YAML `{policies, groupings}` document.
    ///
    /// Nothing is appended when any grouping row is invalid.
    pub fn load_yaml(&mut self, document: &str) -> AuthzResult<()> {
        let document: PolicyDocument = serde_yaml::from_str(document)?;
        for grouping in &document.groupings {
            grouping.validate()?;
        }
        for policy in document.policies {
            self.insert_policy(policy);
        }
        for grouping in document.groupings {
            self.insert_grouping(grouping)?;
        }
        Ok(())
    }

    pub fn policies(&self) -> &[Policy] {
        &self.policies
    }

    pub fn groupings(&self) -> &[GroupingPolicy] {
        &self.groupings
    }

    /// Number of appends so far; identifies the snapshot an evaluator was
    /// built from.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Build a new evaluator from `model` and every stored row.
    ///
    /// Role inheritance is resolved here: every subject is linked directly
    /// to each role it reaches, so the engine never walks a chain. On
    /// domain models, domain-less rows are replayed under
    /// [`Policy::ANY_DOMAIN`]. On models without a domain, scoped rows can
    /// never match and are skipped.
    ///
    /// # Errors
    /// - [`AuthzError::MissingDefinition`] if the model lacks an effect or
    ///   matcher definition.
    /// - [`AuthzError::DenyWithoutEffect`] if a deny row is stored but the
    ///   policy definition has no `eft` column.
    /// - [`AuthzError::Engine`] if Casbin rejects the model or a row.
    pub async fn build_evaluator(&self, model: &Model) -> AuthzResult<Evaluator> {
        // Step 1: Refuse models that cannot produce a decision.
        model.validate()?;
        let with_effect = model.policy_has_effect();
        if !with_effect
            && let Some(policy) = self.policies.iter().find(|p| p.effect == Effect::Deny)
        {
            return Err(AuthzError::DenyWithoutEffect {
                subject: policy.subject.clone(),
                object: policy.object.clone(),
                action: policy.action.clone(),
            });
        }

        // Step 2: Compile the model text and back it with an in-memory adapter.
        let compiled = DefaultModel::from_str(&model.to_text()).await?;
        let adapter = MemoryAdapter::default();
        let mut enforcer = Enforcer::new(compiled, adapter).await?;

        // Step 3: Replay permission rows in insertion order.
        let with_domain = model.request_has_domain();
        let mut skipped = 0usize;
        for policy in &self.policies {
            if !with_domain && policy.domain.is_some() {
                skipped += 1;
                continue;
            }
            enforcer
                .add_policy(policy.to_row(with_effect, with_domain))
                .await?;
        }

        // Step 4: Replay resolved role sets, one scope at a time.
        for row in self.role_rows(with_domain) {
            enforcer.add_grouping_policy(row).await?;
        }
        if !with_domain {
            skipped += self.groupings.iter().filter(|g| g.domain.is_some()).count();
        }
        if skipped > 0 {
            tracing::warn!(skipped, "model has no domain; skipped domain-scoped rows");
        }

        // Step 5: Build role links after all rules are loaded.
        enforcer.build_role_links()?;
        tracing::debug!(
            revision = self.revision,
            policies = self.policies.len(),
            groupings = self.groupings.len(),
            "built policy evaluator"
        );
        Ok(Evaluator::new(
            enforcer,
            model.clone(),
            self.policies.clone(),
            self.groupings.clone(),
            self.revision,
        ))
    }

    // `[child, role]` rows, or `[child, role, scope]` on domain models where
    // the global scope is written as `Policy::ANY_DOMAIN`.
    fn role_rows(&self, with_domain: bool) -> Vec<Vec<String>> {
        let mut scopes: Vec<Option<&str>> = vec![None];
        if with_domain {
            for grouping in &self.groupings {
                if let Some(domain) = grouping.domain.as_deref()
                    && !scopes.contains(&Some(domain))
                {
                    scopes.push(Some(domain));
                }
            }
        }

        let mut children: Vec<&str> = Vec::new();
        for grouping in &self.groupings {
            if !children.contains(&grouping.child.as_str()) {
                children.push(grouping.child.as_str());
            }
        }

        let mut rows = Vec::new();
        for scope in scopes {
            for child in &children {
                for role in reachable_roles(&self.groupings, child, scope) {
                    let mut row = vec![child.to_string(), role];
                    if with_domain {
                        row.push(scope.unwrap_or(Policy::ANY_DOMAIN).to_string());
                    }
                    rows.push(row);
                }
            }
        }
        rows
    }
}
