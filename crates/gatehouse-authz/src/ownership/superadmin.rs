use super::OwnershipProvider;
use crate::{Principal, ResourceId};
use async_trait::async_trait;
use std::sync::Arc;

/// Grants ownership to superadmins without consulting the wrapped provider.
#[derive(Clone)]
pub struct SuperadminOwnershipProvider {
    inner: Arc<dyn OwnershipProvider>,
    superadmin_role: String,
}

impl SuperadminOwnershipProvider {
    pub fn new(inner: Arc<dyn OwnershipProvider>, superadmin_role: impl Into<String>) -> Self {
        Self {
            inner,
            superadmin_role: superadmin_role.into(),
        }
    }

    pub fn superadmin_role(&self) -> &str {
        &self.superadmin_role
    }
}

#[async_trait]
impl OwnershipProvider for SuperadminOwnershipProvider {
    async fn check(
        &self,
        principal: &dyn Principal,
        resource_type: &str,
        resource_id: &ResourceId,
    ) -> bool {
        if principal.role() == self.superadmin_role {
            return true;
        }
        self.inner
            .check(principal, resource_type, resource_id)
            .await
    }
}
