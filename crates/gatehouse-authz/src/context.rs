//! Explicitly constructed authorization context.
//!
//! # Purpose
//! Owns everything a decision needs (policy snapshots, providers, ownership
//! registry, optional decision cache). It is built once at process start and
//! passed to every call site; there is no global instance.
//!
//! # Lifecycle
//! - Init: [`AuthzContextBuilder::build`] validates configuration, loads the
//!   model and compiles the first policy snapshot.
//! - Runtime: [`AuthzContext::authorize`] evaluates one access attempt
//!   against one snapshot; [`AuthzContext::commit_policies`] publishes
//!   appended rows.
//! - Shutdown: [`AuthzContext::shutdown`] drops cached decisions.
use crate::cache::DecisionCache;
use crate::gate::{AccessAttempt, Decision, RequirementGate};
use crate::ownership::OwnershipRegistry;
use crate::snapshot::PolicyHandle;
use crate::{
    AuthzConfig, AuthzResult, IdSubjectProvider, Model, PolicyStore, PrimaryRoleProvider,
    Privilege, Requirement, RoleCatalog, SubjectProvider,
};
use std::sync::Arc;
use std::time::Duration;

pub struct AuthzContext {
    catalog: RoleCatalog,
    superadmin_role: String,
    policies: PolicyHandle,
    gate: RequirementGate,
    cache: Option<Arc<DecisionCache>>,
}

pub struct AuthzContextBuilder {
    config: AuthzConfig,
    model: Option<Model>,
    store: PolicyStore,
    ownership: OwnershipRegistry,
    subjects: Arc<dyn SubjectProvider>,
}

impl AuthzContextBuilder {
    /// Use `model` instead of the one named by the configuration.
    pub fn model(mut self, model: Model) -> Self {
        self.model = Some(model);
        self
    }

    pub fn policies(mut self, store: PolicyStore) -> Self {
        self.store = store;
        self
    }

    pub fn ownership(mut self, registry: OwnershipRegistry) -> Self {
        self.ownership = registry;
        self
    }

    pub fn subjects(mut self, subjects: Arc<dyn SubjectProvider>) -> Self {
        self.subjects = subjects;
        self
    }

    /// # Errors
    /// - Configuration errors (superadmin outside the role catalog).
    /// - Model load errors and evaluator build errors.
    pub async fn build(self) -> AuthzResult<AuthzContext> {
        self.config.validate()?;
        let model = match self.model {
            Some(model) => model,
            None => self.config.load_model()?,
        };
        let policies = PolicyHandle::new(model, self.store).await?;

        let roles = Arc::new(PrimaryRoleProvider::new(Some(
            self.config.superadmin_role.clone(),
        )));
        let mut gate = RequirementGate::new(self.subjects, roles, Arc::new(self.ownership));
        let cache = self
            .config
            .decision_cache_ttl
            .map(|ttl| Arc::new(DecisionCache::new(ttl)));
        if let Some(cache) = &cache {
            gate = gate.with_cache(cache.clone());
        }

        tracing::info!(
            superadmin_role = %self.config.superadmin_role,
            generation = policies.snapshot().generation(),
            cached = cache.is_some(),
            "authorization context ready"
        );
        Ok(AuthzContext {
            catalog: self.config.roles,
            superadmin_role: self.config.superadmin_role,
            policies,
            gate,
            cache,
        })
    }
}

impl AuthzContext {
    pub fn builder(config: AuthzConfig) -> AuthzContextBuilder {
        AuthzContextBuilder {
            config,
            model: None,
            store: PolicyStore::new(),
            ownership: OwnershipRegistry::new(),
            subjects: Arc::new(IdSubjectProvider),
        }
    }

    pub fn catalog(&self) -> &RoleCatalog {
        &self.catalog
    }

    pub fn superadmin_role(&self) -> &str {
        &self.superadmin_role
    }

    pub fn policies(&self) -> &PolicyHandle {
        &self.policies
    }

    pub fn gate(&self) -> &RequirementGate {
        &self.gate
    }

    /// Wrap `privilege` as a requirement once its roles are known to the
    /// catalog.
    ///
    /// # Errors
    /// - [`AuthzError::UnknownRole`](crate::AuthzError::UnknownRole) for a
    ///   role outside the configured catalog.
    pub fn privilege(&self, privilege: Privilege) -> AuthzResult<Requirement> {
        self.catalog.validate_privilege(&privilege)?;
        Ok(Requirement::privilege(privilege))
    }

    /// Evaluate one access attempt against the current policy snapshot.
    pub async fn authorize(
        &self,
        attempt: AccessAttempt<'_>,
        requirements: &[Requirement],
    ) -> Decision {
        let snapshot = self.policies.snapshot();
        self.gate.check(&snapshot, attempt, requirements).await
    }

    /// Like [`AuthzContext::authorize`], denying once `timeout` elapses.
    pub async fn authorize_within(
        &self,
        timeout: Duration,
        attempt: AccessAttempt<'_>,
        requirements: &[Requirement],
    ) -> Decision {
        let snapshot = self.policies.snapshot();
        self.gate
            .check_within(timeout, &snapshot, attempt, requirements)
            .await
    }

    /// Rebuild and publish the policy snapshot, then drop cached decisions.
    pub async fn commit_policies(&self) -> AuthzResult<u64> {
        let generation = self.policies.commit().await?;
        if let Some(cache) = &self.cache {
            cache.clear().await;
        }
        Ok(generation)
    }

    pub async fn shutdown(self) {
        if let Some(cache) = &self.cache {
            cache.clear().await;
        }
        tracing::info!("authorization context shut down");
    }
}
