//! Runtime policy mutation with rebuild-then-swap snapshots.
//!
//! # Purpose and responsibility
//! Lets callers append policy rows while requests keep evaluating against a
//! frozen [`Evaluator`]. A commit rebuilds a fresh evaluator from the full
//! row set and swaps the shared pointer in one step.
//!
//! # Key invariants and assumptions
//! - Readers never observe a partially applied change.
//! - Appends are serialized by a mutex that is never held across `.await`.
//! - Commits are serialized so a slower rebuild cannot replace a newer one.
use crate::evaluator::Evaluator;
use crate::policy::{GroupingPolicy, Policy};
use crate::{AuthzResult, Model, PolicyStore};
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::sync::Arc;

pub struct PolicyHandle {
    model: Model,
    store: Mutex<PolicyStore>,
    commit_lock: tokio::sync::Mutex<()>,
    current: ArcSwap<Evaluator>,
}

impl PolicyHandle {
    /// Build the first snapshot from `store` and take ownership of it.
    pub async fn new(model: Model, store: PolicyStore) -> AuthzResult<Self> {
        let evaluator = store.build_evaluator(&model).await?;
        Ok(Self {
            model,
            store: Mutex::new(store),
            commit_lock: tokio::sync::Mutex::new(()),
            current: ArcSwap::from_pointee(evaluator),
        })
    }

    /// The evaluator every decision should use until the next commit.
    pub fn snapshot(&self) -> Arc<Evaluator> {
        self.current.load_full()
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn add_policy(&self, policy: Policy) {
        self.store.lock().insert_policy(policy);
    }

    pub fn add_grouping(&self, grouping: GroupingPolicy) -> AuthzResult<()> {
        self.store.lock().insert_grouping(grouping)
    }

    /// Rows appended since the current snapshot was built.
    pub fn pending(&self) -> u64 {
        let revision = self.store.lock().revision();
        revision.saturating_sub(self.current.load().generation())
    }

    /// Rebuild from every stored row and publish the result.
    ///
    /// On error the current snapshot stays in place.
    pub async fn commit(&self) -> AuthzResult<u64> {
        let _commit = self.commit_lock.lock().await;
        let store = self.store.lock().clone();
        let evaluator = store.build_evaluator(&self.model).await?;
        let generation = evaluator.generation();
        self.current.store(Arc::new(evaluator));
        tracing::info!(generation, "policy snapshot swapped");
        Ok(generation)
    }
}
