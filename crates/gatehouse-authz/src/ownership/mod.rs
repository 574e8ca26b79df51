//! Ownership checks for individual resource instances.
//!
//! # Purpose
//! Defines the async [`OwnershipProvider`] capability plus the registry and
//! combinators that compose providers per resource type.
//!
//! # Key invariants
//! - A provider answers only `true`/`false`; lookup failures are denials.
//! - Providers are registered once per resource type during setup and are
//!   stateless from the engine's point of view.
use crate::{Principal, ResourceId};
use async_trait::async_trait;
use futures::future::BoxFuture;

mod composite;
mod registry;
mod superadmin;

pub use composite::{CompositeMode, CompositeOwnershipProvider};
pub use registry::OwnershipRegistry;
pub use superadmin::SuperadminOwnershipProvider;

#[async_trait]
pub trait OwnershipProvider: Send + Sync {
    async fn check(
        &self,
        principal: &dyn Principal,
        resource_type: &str,
        resource_id: &ResourceId,
    ) -> bool;
}

/// Looks up the owner id of a resource and compares it with the principal id.
///
/// The lookup is supplied by the caller and may perform I/O; `None` (no
/// such resource, or no owner) is a denial.
pub struct OwnerLookupProvider<F> {
    lookup: F,
}

impl<F> OwnerLookupProvider<F>
where
    F: Fn(ResourceId) -> BoxFuture<'static, Option<String>> + Send + Sync,
{
    pub fn new(lookup: F) -> Self {
        Self { lookup }
    }
}

#[async_trait]
impl<F> OwnershipProvider for OwnerLookupProvider<F>
where
    F: Fn(ResourceId) -> BoxFuture<'static, Option<String>> + Send + Sync,
{
    async fn check(
        &self,
        principal: &dyn Principal,
        resource_type: &str,
        resource_id: &ResourceId,
    ) -> bool {
        let owner = (self.lookup)(resource_id.clone()).await;
        let owned = owner.as_deref() == Some(principal.id());
        tracing::debug!(resource_type, %resource_id, owned, "ownership lookup");
        owned
    }
}
