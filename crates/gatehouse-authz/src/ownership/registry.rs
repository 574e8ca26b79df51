use super::OwnershipProvider;
use crate::{Principal, ResourceId};
use std::collections::HashMap;
use std::sync::Arc;

/// Resource type to ownership provider bindings.
///
/// The registry may be partial: checking an unregistered type denies.
#[derive(Clone, Default)]
pub struct OwnershipRegistry {
    providers: HashMap<String, Arc<dyn OwnershipProvider>>,
}

impl OwnershipRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `provider` to `resource_type`, replacing any earlier binding.
    pub fn register(
        &mut self,
        resource_type: impl Into<String>,
        provider: Arc<dyn OwnershipProvider>,
    ) -> &mut Self {
        let resource_type = resource_type.into();
        if self
            .providers
            .insert(resource_type.clone(), provider)
            .is_some()
        {
            tracing::debug!(%resource_type, "replaced ownership provider");
        }
        self
    }

    pub fn provider(&self, resource_type: &str) -> Option<Arc<dyn OwnershipProvider>> {
        self.providers.get(resource_type).cloned()
    }

    pub fn is_registered(&self, resource_type: &str) -> bool {
        self.providers.contains_key(resource_type)
    }

    pub fn resource_types(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    pub async fn check(
        &self,
        principal: &dyn Principal,
        resource_type: &str,
        resource_id: &ResourceId,
    ) -> bool {
        let Some(provider) = self.providers.get(resource_type) else {
            tracing::debug!(resource_type, "no ownership provider registered; denying");
            return false;
        };
        provider.check(principal, resource_type, resource_id).await
    }
}
