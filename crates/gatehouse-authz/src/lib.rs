//! Resource-agnostic authorization decisions.
//!
//! # Purpose
//! Combines role-based permission evaluation (Casbin), per-instance ownership
//! checks, and declared requirement lists into one grant/deny decision that
//! any resource kind can use.
//!
//! # How it fits
//! Setup code loads an [`AuthzConfig`], builds a [`Model`] and a
//! [`PolicyStore`], registers [`OwnershipProvider`]s per resource type, and
//! constructs one [`AuthzContext`]. Request handlers build a requirement list
//! and call [`AuthzContext::authorize`] before running the operation.
//!
//! # Key invariants
//! - Deny wins over allow; no matching policy means deny.
//! - Requirements combine with OR and stop at the first satisfied one; an
//!   empty list denies.
//! - The superadmin role bypasses role checks and wrapped ownership checks.
//! - Evaluators are immutable snapshots; policy changes publish a new one.
//!
//! # Examples
//! ```rust
//! use gatehouse_authz::{Effect, Model, PolicyStore};
//!
//! # async fn demo() -> gatehouse_authz::AuthzResult<()> {
//! let mut store = PolicyStore::new();
//! store.add_policy("editor", "doc", "read", Effect::Allow);
//! store.add_grouping("alice", "editor", None)?;
//! let evaluator = store.build_evaluator(&Model::default_rbac()).await?;
//! assert!(evaluator.allowed("alice", "doc", "read"));
//! assert!(!evaluator.allowed("alice", "doc", "write"));
//! # Ok(())
//! # }
//! ```
//!
//! # Common pitfalls
//! - Declaring no requirements denies every attempt; there is no default
//!   allow.
//! - Put cheap requirements first: ownership checks may perform I/O and only
//!   run when earlier requirements fail.

mod cache;
mod config;
mod context;
mod errors;
mod evaluator;
mod gate;
mod model;
pub mod observability;
pub mod ownership;
mod permission;
mod policy;
mod principal;
mod requirement;
mod snapshot;
mod store;
mod types;

pub use cache::DecisionCache;
pub use config::{AuthzConfig, DEFAULT_ROLES, DEFAULT_SUPERADMIN_ROLE, RoleCatalog};
pub use context::{AuthzContext, AuthzContextBuilder};
pub use errors::{AuthzError, AuthzResult};
pub use evaluator::Evaluator;
pub use gate::{
    AccessAttempt, Decision, REASON_CANCELLED, REASON_INACTIVE, REASON_NO_REQUIREMENTS,
    REASON_UNSATISFIED, RequirementGate,
};
pub use model::{
    Model, ModelBuilder, Section, default_domain_model_string, default_model_string, section_tag,
};
pub use ownership::{
    CompositeMode, CompositeOwnershipProvider, OwnerLookupProvider, OwnershipProvider,
    OwnershipRegistry, SuperadminOwnershipProvider,
};
pub use permission::{Permission, Privilege};
pub use policy::{Effect, GroupingPolicy, Policy};
pub use principal::{
    BasicPrincipal, IdSubjectProvider, PrimaryRoleProvider, Principal, RoleProvider,
    SubjectProvider,
};
pub use requirement::{Requirement, ResourceIdExtractor, param_extractor};
pub use snapshot::PolicyHandle;
pub use store::PolicyStore;
pub use types::{Params, ResourceId, ResourceRef};
